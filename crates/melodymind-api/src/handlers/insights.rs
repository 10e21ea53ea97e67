// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Query, State},
    Json,
};
use melodymind_application::{AppState, Insights};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use super::{ApiError, ErrorResponse};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InsightsQuery {
    pub artist: Option<String>,
    pub track: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InsightsResponse {
    pub name: String,
    pub artist: Option<String>,
    pub tags: Vec<String>,
    pub art_url: String,
    pub summary: String,
}

impl From<Insights> for InsightsResponse {
    fn from(insights: Insights) -> Self {
        Self {
            name: insights.name,
            artist: insights.artist,
            tags: insights.tags,
            art_url: insights.art_url,
            summary: insights.summary,
        }
    }
}

/// Tags, artwork and a short summary for an artist or track
#[utoipa::path(
    get,
    path = "/api/v1/insights",
    params(InsightsQuery),
    responses(
        (status = 200, description = "Insights for the basis", body = InsightsResponse),
        (status = 400, description = "Neither artist nor track given", body = ErrorResponse),
        (status = 404, description = "Basis not found upstream", body = ErrorResponse),
        (status = 503, description = "Last.fm API key not configured", body = ErrorResponse)
    ),
    tag = "insights"
)]
pub async fn get_insights(
    State(state): State<AppState>,
    Query(query): Query<InsightsQuery>,
) -> Result<Json<InsightsResponse>, ApiError> {
    debug!(target: "api", ?query, "insights");
    let service = state.discovery()?;

    let blank = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());
    if blank(&query.artist) && blank(&query.track) {
        return Err(ApiError::BadRequest(
            "Please enter at least an artist or a track name.".to_string(),
        ));
    }

    let basis = service
        .resolve_basis(query.artist.as_deref(), query.track.as_deref())
        .await
        .ok_or_else(|| ApiError::NotFound("No matching artist or track found.".to_string()))?;

    let insights = service
        .get_insights(&basis)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No details available for {basis}.")))?;

    Ok(Json(insights.into()))
}
