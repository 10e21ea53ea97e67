// SPDX-License-Identifier: GPL-3.0-or-later

//! Recommendation pipelines.
//!
//! [`HybridRecommender`] blends the content and collaborative scorers over the
//! trained model. [`DiscoveryService`] builds recommendations from live
//! metadata lookups, expands sparse results, applies the optional language
//! filter and enriches the final items with artwork. Both run each request
//! sequentially and never fail on partial data: an unusable request yields an
//! empty [`Recommendations`] with an explanatory message.

use melodymind_config::RecommenderConfig;
use melodymind_domain::{
    normalize_name, pick_image, Basis, Candidate, CandidateSource, CatalogIndex, EntityKind,
    RecommendationSet,
};
use melodymind_metadata::{placeholder_for_tags, ArtworkResolver, MetadataProvider};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::expander::{candidate_from_summary, CandidateExpander, ExpansionPolicy};
use crate::merger::{HybridMerger, SourcePriority};
use crate::model::TrainedModelArtifact;
use crate::scoring::{CollaborativeScorer, ContentSimilarityScorer, ScoringError};
use crate::tag_filter::LanguageTagFilter;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Last.fm API key is not configured; live discovery is unavailable")]
    ConfigurationMissing,

    #[error("No model artifact is loaded; hybrid recommendations are unavailable")]
    ModelUnavailable,
}

/// Outcome of one recommendation request.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub basis: Option<Basis>,
    pub requested: usize,
    pub items: RecommendationSet,
    /// Fewer than `requested` distinct candidates were available.
    pub exhausted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Recommendations {
    fn new(basis: Option<Basis>, requested: usize, items: RecommendationSet) -> Self {
        let exhausted = items.len() < requested;
        Self {
            basis,
            requested,
            items,
            exhausted,
            message: None,
        }
    }

    fn empty(basis: Option<Basis>, requested: usize, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(basis, requested, RecommendationSet::new())
        }
    }

    fn with_message_if_empty(mut self, message: impl FnOnce() -> String) -> Self {
        if self.items.is_empty() && self.requested > 0 {
            self.message = Some(message());
        }
        self
    }
}

/// Per-request state threaded through the discovery steps.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub basis: Basis,
    pub count: usize,
    pub language_filter: LanguageTagFilter,
    pub primary: Vec<Candidate>,
    pub expansion: Vec<Candidate>,
}

impl RequestContext {
    pub fn new<S: AsRef<str>>(basis: Basis, count: usize, language_labels: &[S]) -> Self {
        Self {
            basis,
            count,
            language_filter: LanguageTagFilter::new(language_labels),
            primary: Vec::new(),
            expansion: Vec::new(),
        }
    }

    /// Requested count minus the distinct primary candidates.
    pub fn shortfall(&self) -> usize {
        let distinct: RecommendationSet = self.primary.iter().cloned().collect();
        self.count.saturating_sub(distinct.len())
    }
}

// ============================================================================
// Model-based pipeline
// ============================================================================

pub struct HybridRecommender {
    model: Arc<dyn TrainedModelArtifact>,
    content: ContentSimilarityScorer,
    collaborative: CollaborativeScorer,
    merger: HybridMerger,
    oversample_factor: usize,
}

impl HybridRecommender {
    pub fn new(model: Arc<dyn TrainedModelArtifact>, config: &RecommenderConfig) -> Self {
        Self {
            collaborative: CollaborativeScorer::new(Arc::clone(&model)),
            model,
            content: ContentSimilarityScorer,
            merger: HybridMerger::new(SourcePriority::from_labels(
                config.source_priority.as_slice(),
            )),
            oversample_factor: config.oversample_factor.max(1),
        }
    }

    fn find_track(&self, track_name: &str) -> Option<CatalogIndex> {
        let wanted = normalize_name(track_name);
        self.model
            .catalog()
            .iter()
            .position(|item| normalize_name(&item.track_name) == wanted)
            .map(CatalogIndex)
    }

    fn to_candidates(
        &self,
        ranked: Vec<(CatalogIndex, f32)>,
        source: CandidateSource,
    ) -> Vec<Candidate> {
        let catalog = self.model.catalog();
        ranked
            .into_iter()
            .filter_map(|(index, _)| catalog.get(index.get()))
            .enumerate()
            .map(|(rank, item)| {
                Candidate::new(item.track_name.clone(), item.primary_artist.clone(), source, rank)
            })
            .collect()
    }

    /// Recommends `n` tracks for a listener and a seed track from the catalog.
    pub fn recommend(
        &self,
        user_display_name: &str,
        seed_track_name: &str,
        n: usize,
    ) -> Recommendations {
        if n == 0 {
            return Recommendations::new(None, 0, RecommendationSet::new());
        }

        let Some(user) = self.model.encode_user(user_display_name.trim()) else {
            info!(target: "pipeline", user = user_display_name, "unknown listener");
            return Recommendations::empty(
                None,
                n,
                format!("Listener '{}' is not in the model.", user_display_name.trim()),
            );
        };
        let Some(seed) = self.find_track(seed_track_name) else {
            info!(target: "pipeline", track = seed_track_name, "seed track not in catalog");
            return Recommendations::empty(
                None,
                n,
                format!("Track '{}' is not in the catalog.", seed_track_name.trim()),
            );
        };

        let catalog = self.model.catalog();
        let seed_item = &catalog[seed.get()];
        let basis = Basis::track(seed_item.track_name.clone(), seed_item.primary_artist.clone());
        let k = self.oversample_factor.saturating_mul(n);

        let content = self.content.rank_by_similarity(seed, catalog, k);
        let collaborative = match self.collaborative.rank_for_user(user, catalog.len(), k) {
            Ok(ranked) => ranked,
            Err(ScoringError::UnknownUser(user)) => {
                warn!(
                    target: "pipeline",
                    user = %user,
                    "listener has no affinity entry; using content candidates only"
                );
                Vec::new()
            }
            Err(error) => {
                warn!(
                    target: "pipeline",
                    error = %error,
                    "collaborative scoring failed; using content candidates only"
                );
                Vec::new()
            }
        };
        debug!(
            target: "pipeline",
            content = content.len(),
            collaborative = collaborative.len(),
            k,
            "scored candidates"
        );

        let merged = self.merger.merge(
            vec![
                (CandidateSource::Content, self.to_candidates(content, CandidateSource::Content)),
                (
                    CandidateSource::Collab,
                    self.to_candidates(collaborative, CandidateSource::Collab),
                ),
            ],
            n,
        );

        Recommendations::new(Some(basis), n, merged)
            .with_message_if_empty(|| "No recommendations could be generated.".to_string())
    }

    pub fn known_users(&self) -> Vec<String> {
        self.model.known_users()
    }

    /// Distinct track names by the listener's artist, or by every artist when
    /// the listener has no tracks of their own.
    pub fn tracks_for_user(&self, display_name: &str) -> Vec<String> {
        let wanted = normalize_name(display_name);
        let catalog = self.model.catalog();

        let own: BTreeSet<&str> = catalog
            .iter()
            .filter(|item| normalize_name(&item.primary_artist) == wanted)
            .map(|item| item.track_name.as_str())
            .collect();
        let names = if own.is_empty() {
            catalog.iter().map(|item| item.track_name.as_str()).collect()
        } else {
            own
        };
        names.into_iter().map(str::to_string).collect()
    }
}

// ============================================================================
// API-based pipeline
// ============================================================================

/// Summary shown next to a recommendation basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insights {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub tags: Vec<String>,
    pub art_url: String,
    pub summary: String,
}

/// Reduces a Last.fm wiki/bio summary to its first sentence.
pub fn summarize(raw: Option<&str>, name: &str) -> String {
    let text = raw.unwrap_or_default();
    let text = text.split("<a ").next().unwrap_or_default().trim();
    let sentence = match text.split_once(". ") {
        Some((first, _)) => format!("{first}."),
        None => text.to_string(),
    };
    if sentence.is_empty() || sentence.to_lowercase().contains("biography is not available") {
        format!("No detailed summary available for {name}.")
    } else {
        sentence
    }
}

pub struct DiscoveryService {
    provider: Arc<dyn MetadataProvider>,
    artwork: Option<Arc<ArtworkResolver>>,
    expander: CandidateExpander,
    merger: HybridMerger,
    image_size_preference: Vec<String>,
}

impl DiscoveryService {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        artwork: Option<Arc<ArtworkResolver>>,
        config: &RecommenderConfig,
        image_size_preference: Vec<String>,
    ) -> Self {
        Self {
            provider,
            artwork,
            expander: CandidateExpander::new(
                ExpansionPolicy::from(&config.expansion),
                image_size_preference.clone(),
            ),
            merger: HybridMerger::new(SourcePriority::from_labels(
                config.source_priority.as_slice(),
            )),
            image_size_preference,
        }
    }

    /// Turns free-text inputs into a basis. A lone track name is resolved
    /// through search; blank inputs count as absent.
    pub async fn resolve_basis(&self, artist: Option<&str>, track: Option<&str>) -> Option<Basis> {
        let artist = artist.map(str::trim).filter(|value| !value.is_empty());
        let track = track.map(str::trim).filter(|value| !value.is_empty());

        match (artist, track) {
            (Some(artist), Some(track)) => Some(Basis::track(track, artist)),
            (Some(artist), None) => Some(Basis::artist(artist)),
            (None, Some(track)) => {
                let found = self.provider.search_track(track).await;
                match found {
                    Some(summary) => {
                        info!(
                            target: "pipeline",
                            query = track,
                            track = %summary.name,
                            artist = %summary.artist,
                            "resolved track query"
                        );
                        Some(Basis::track(summary.name, summary.artist))
                    }
                    None => {
                        info!(target: "pipeline", query = track, "no match for track query");
                        None
                    }
                }
            }
            (None, None) => None,
        }
    }

    /// Recommends `n` tracks around `basis`, optionally restricted to tracks
    /// tagged with one of `language_labels`.
    pub async fn recommend<S: AsRef<str>>(
        &self,
        basis: &Basis,
        n: usize,
        language_labels: &[S],
    ) -> Recommendations {
        let mut ctx = RequestContext::new(basis.clone(), n, language_labels);
        if n == 0 {
            return Recommendations::new(Some(ctx.basis), 0, RecommendationSet::new());
        }

        self.collect_primary(&mut ctx).await;
        let shortfall = ctx.shortfall();
        ctx.expansion = self
            .expander
            .expand(&ctx.basis, &ctx.primary, shortfall, self.provider.as_ref())
            .await;

        let lists = vec![
            (CandidateSource::Primary, std::mem::take(&mut ctx.primary)),
            (CandidateSource::Expansion, std::mem::take(&mut ctx.expansion)),
        ];
        let mut items = if ctx.language_filter.is_empty() {
            self.merger.merge(lists, ctx.count)
        } else {
            let pool_size = lists.iter().map(|(_, list)| list.len()).sum();
            let pool = self.merger.merge(lists, pool_size);
            let mut filtered = ctx
                .language_filter
                .filter(pool, self.provider.as_ref())
                .await;
            filtered.truncate(ctx.count);
            filtered
        };

        self.attach_artwork(&mut items).await;
        info!(
            target: "pipeline",
            basis = %ctx.basis,
            requested = ctx.count,
            returned = items.len(),
            "discovery finished"
        );

        let filtered = !ctx.language_filter.is_empty();
        let basis_label = ctx.basis.to_string();
        Recommendations::new(Some(ctx.basis), ctx.count, items).with_message_if_empty(|| {
            if filtered {
                "No tracks matched the selected language tags. Try removing the filter or another artist."
                    .to_string()
            } else {
                format!("No recommendations found for {basis_label}.")
            }
        })
    }

    async fn collect_primary(&self, ctx: &mut RequestContext) {
        let summaries = match &ctx.basis {
            Basis::Track {
                track_name,
                artist_name,
            } => {
                self.provider
                    .get_similar_tracks(track_name, artist_name, ctx.count)
                    .await
            }
            Basis::Artist { artist_name } => {
                self.provider
                    .get_top_tracks_for_artist(artist_name, ctx.count)
                    .await
            }
        };

        ctx.primary = summaries
            .into_iter()
            .enumerate()
            .map(|(rank, summary)| {
                candidate_from_summary(
                    summary,
                    CandidateSource::Primary,
                    rank,
                    &self.image_size_preference,
                )
            })
            .collect();
        debug!(target: "pipeline", primary = ctx.primary.len(), "primary candidates collected");
    }

    /// Fills missing artwork from the resolver, then from genre placeholders.
    async fn attach_artwork(&self, items: &mut RecommendationSet) {
        for candidate in items.iter_mut() {
            if candidate.art_url.is_some() {
                continue;
            }
            if let Some(resolver) = &self.artwork {
                match resolver
                    .resolve(&candidate.artist_name, Some(&candidate.track_name))
                    .await
                {
                    Ok(found) => {
                        candidate.art_url = Some(found.image_url);
                        continue;
                    }
                    Err(error) => {
                        debug!(
                            target: "pipeline",
                            track = %candidate.track_name,
                            error = %error,
                            "no artwork found; using genre placeholder"
                        );
                    }
                }
            }
            let tags = self
                .provider
                .get_top_tags(
                    EntityKind::Track,
                    &candidate.track_name,
                    Some(&candidate.artist_name),
                )
                .await;
            candidate.art_url = Some(placeholder_for_tags(tags.as_slice()).to_string());
        }
    }

    /// Name, tags, artwork and a one-sentence summary for the basis.
    pub async fn get_insights(&self, basis: &Basis) -> Option<Insights> {
        let insights = match basis {
            Basis::Artist { artist_name } => {
                let info = self.provider.get_artist_info(artist_name).await?;
                let art_url = pick_image(&info.images, &self.image_size_preference)
                    .map(str::to_string)
                    .unwrap_or_else(|| placeholder_for_tags(info.tags.as_slice()).to_string());
                Insights {
                    summary: summarize(info.summary.as_deref(), &info.name),
                    name: info.name,
                    artist: None,
                    tags: info.tags,
                    art_url,
                }
            }
            Basis::Track {
                track_name,
                artist_name,
            } => {
                let info = self.provider.get_track_info(track_name, artist_name).await?;
                let art_url = pick_image(&info.images, &self.image_size_preference)
                    .map(str::to_string)
                    .unwrap_or_else(|| placeholder_for_tags(info.tags.as_slice()).to_string());
                Insights {
                    summary: summarize(info.summary.as_deref(), &info.name),
                    name: info.name,
                    artist: Some(info.artist),
                    tags: info.tags,
                    art_url,
                }
            }
        };
        Some(insights)
    }
}
