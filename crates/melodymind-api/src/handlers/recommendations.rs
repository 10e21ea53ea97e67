// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Query, State},
    Json,
};
use melodymind_application::{AppState, Recommendations};
use melodymind_domain::{Basis, Candidate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use super::{ApiError, ErrorResponse};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HybridQuery {
    /// Listener display name (an artist standing in for a user).
    pub user: String,
    /// Seed track name from the catalog.
    pub track: String,
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DiscoverQuery {
    pub artist: Option<String>,
    pub track: Option<String>,
    pub count: Option<usize>,
    /// Comma-separated language tags, e.g. `nepali,hindi`.
    pub languages: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BasisResponse {
    /// `track` or `artist`
    pub kind: String,
    pub artist_name: String,
    pub track_name: Option<String>,
}

impl From<Basis> for BasisResponse {
    fn from(basis: Basis) -> Self {
        Self {
            kind: basis.kind().as_str().to_string(),
            artist_name: basis.artist_name().to_string(),
            track_name: basis.track_name().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendationResponse {
    pub track_name: String,
    pub artist_name: String,
    /// Candidate list the item came from.
    pub source: String,
    pub rank: usize,
    pub art_url: Option<String>,
    pub listen_url: Option<String>,
    pub youtube_url: String,
}

impl From<Candidate> for RecommendationResponse {
    fn from(candidate: Candidate) -> Self {
        Self {
            youtube_url: candidate.youtube_search_url(),
            source: candidate.source.to_string(),
            track_name: candidate.track_name,
            artist_name: candidate.artist_name,
            rank: candidate.rank,
            art_url: candidate.art_url,
            listen_url: candidate.listen_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendationsResponse {
    pub basis: Option<BasisResponse>,
    pub requested: usize,
    pub exhausted: bool,
    pub message: Option<String>,
    pub items: Vec<RecommendationResponse>,
}

impl From<Recommendations> for RecommendationsResponse {
    fn from(recommendations: Recommendations) -> Self {
        Self {
            basis: recommendations.basis.map(BasisResponse::from),
            requested: recommendations.requested,
            exhausted: recommendations.exhausted,
            message: recommendations.message,
            items: recommendations
                .items
                .into_iter()
                .map(RecommendationResponse::from)
                .collect(),
        }
    }
}

fn parse_languages(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

// ============================================================================
// Handlers
// ============================================================================

/// Blend content similarity and listener affinity from the trained model
#[utoipa::path(
    get,
    path = "/api/v1/recommendations/hybrid",
    params(HybridQuery),
    responses(
        (status = 200, description = "Ranked recommendations", body = RecommendationsResponse),
        (status = 503, description = "No model artifact loaded", body = ErrorResponse)
    ),
    tag = "recommendations"
)]
pub async fn hybrid_recommendations(
    State(state): State<AppState>,
    Query(query): Query<HybridQuery>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    debug!(target: "api", ?query, "hybrid recommendations");
    let recommender = state.hybrid()?;
    let count = state.clamp_count(query.count);
    let recommendations = recommender.recommend(&query.user, &query.track, count);
    Ok(Json(recommendations.into()))
}

/// Discover tracks around an artist and/or track using live metadata
#[utoipa::path(
    get,
    path = "/api/v1/recommendations/discover",
    params(DiscoverQuery),
    responses(
        (status = 200, description = "Ranked recommendations", body = RecommendationsResponse),
        (status = 503, description = "Last.fm API key not configured", body = ErrorResponse)
    ),
    tag = "recommendations"
)]
pub async fn discover_recommendations(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    debug!(target: "api", ?query, "discover recommendations");
    let service = state.discovery()?;
    let count = state.clamp_count(query.count);

    let Some(basis) = service
        .resolve_basis(query.artist.as_deref(), query.track.as_deref())
        .await
    else {
        let message = match query.track.as_deref().map(str::trim) {
            Some(track) if !track.is_empty() => {
                format!("No match for '{track}'. Try also entering the artist name.")
            }
            _ => "Please enter at least an artist or a track name.".to_string(),
        };
        return Ok(Json(RecommendationsResponse {
            basis: None,
            requested: count,
            exhausted: count > 0,
            message: Some(message),
            items: Vec::new(),
        }));
    };

    let languages = parse_languages(query.languages.as_deref());
    let recommendations = service.recommend(&basis, count, languages.as_slice()).await;
    Ok(Json(recommendations.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_are_split_and_trimmed() {
        assert_eq!(
            parse_languages(Some(" Nepali, hindi ,,")),
            vec!["Nepali".to_string(), "hindi".to_string()]
        );
        assert!(parse_languages(None).is_empty());
    }
}
