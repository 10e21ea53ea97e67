// SPDX-License-Identifier: GPL-3.0-or-later
pub mod catalog;
pub mod insights;
pub mod recommendations;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use melodymind_application::PipelineError;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler failures mapped onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    Unavailable(PipelineError),
    BadRequest(String),
    NotFound(String),
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        Self::Unavailable(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Unavailable(error) => {
                warn!(target: "api", %error, "pipeline unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, error.to_string())
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
