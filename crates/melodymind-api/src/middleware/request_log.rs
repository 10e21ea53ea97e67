// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info};

/// Logs method, path, status and latency for every request.
pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    debug!(target: "api", %method, %path, "request received");

    let response = next.run(request).await;

    info!(
        target: "api",
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}
