// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, State},
    Json,
};
use melodymind_application::AppState;
use melodymind_domain::normalize_name;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use super::{ApiError, ErrorResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TracksResponse {
    pub user: String,
    pub tracks: Vec<String>,
}

/// List listeners known to the trained model
#[utoipa::path(
    get,
    path = "/api/v1/catalog/users",
    responses(
        (status = 200, description = "Known listeners, sorted", body = UsersResponse),
        (status = 503, description = "No model artifact loaded", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let recommender = state.hybrid()?;
    Ok(Json(UsersResponse {
        users: recommender.known_users(),
    }))
}

/// Seed tracks offered for a listener
#[utoipa::path(
    get,
    path = "/api/v1/catalog/users/{name}/tracks",
    params(
        ("name" = String, Path, description = "Listener display name")
    ),
    responses(
        (status = 200, description = "Track names, sorted", body = TracksResponse),
        (status = 404, description = "Unknown listener", body = ErrorResponse),
        (status = 503, description = "No model artifact loaded", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn list_user_tracks(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TracksResponse>, ApiError> {
    debug!(target: "api", user = %name, "listing user tracks");
    let recommender = state.hybrid()?;

    let wanted = normalize_name(&name);
    if !recommender
        .known_users()
        .iter()
        .any(|user| normalize_name(user) == wanted)
    {
        return Err(ApiError::NotFound(format!("Unknown listener '{name}'")));
    }

    Ok(Json(TracksResponse {
        tracks: recommender.tracks_for_user(&name),
        user: name,
    }))
}
