// SPDX-License-Identifier: GPL-3.0-or-later
pub mod handlers;
pub mod middleware;

use axum::{extract::State, middleware as axum_middleware, routing::get, Json, Router};
use handlers::catalog::{
    list_user_tracks, list_users, TracksResponse, UsersResponse, __path_list_user_tracks,
    __path_list_users,
};
use handlers::insights::{get_insights, InsightsResponse, __path_get_insights};
use handlers::recommendations::{
    discover_recommendations, hybrid_recommendations, BasisResponse, RecommendationResponse,
    RecommendationsResponse, __path_discover_recommendations, __path_hybrid_recommendations,
};
use handlers::ErrorResponse;
use melodymind_application::AppState;
use middleware::request_log::request_log_middleware;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Serialize, utoipa::ToSchema)]
struct HealthResponse {
    status: &'static str,
    hybrid: bool,
    discovery: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        hybrid: state.hybrid().is_ok(),
        discovery: state.discovery().is_ok(),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        hybrid_recommendations,
        discover_recommendations,
        get_insights,
        list_users,
        list_user_tracks,
    ),
    components(
        schemas(
            HealthResponse,
            BasisResponse,
            RecommendationResponse,
            RecommendationsResponse,
            InsightsResponse,
            UsersResponse,
            TracksResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "recommendations", description = "Hybrid and discovery recommendations"),
        (name = "insights", description = "Artist and track summaries"),
        (name = "catalog", description = "Listeners and seed tracks of the trained model")
    ),
    info(
        title = "MelodyMind API",
        version = "0.1.0",
        description = "Hybrid music recommendations served from Rust",
    )
)]
struct ApiDoc;

pub fn router(state: AppState) -> Router {
    info!(target: "api", "building router");

    let api_v1 = Router::new()
        .route("/recommendations/hybrid", get(hybrid_recommendations))
        .route("/recommendations/discover", get(discover_recommendations))
        .route("/insights", get(get_insights))
        .route("/catalog/users", get(list_users))
        .route("/catalog/users/:name/tracks", get(list_user_tracks));

    let openapi = ApiDoc::openapi();

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", openapi))
        .layer(axum_middleware::from_fn(request_log_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
