// SPDX-License-Identifier: GPL-3.0-or-later
use melodymind_config::AppConfig;
pub mod expander;
pub mod merger;
pub mod model;
pub mod pipeline;
pub mod scoring;
pub mod tag_filter;

#[cfg(test)]
pub(crate) mod test_support;

pub use expander::{CandidateExpander, ExpansionPolicy};
pub use merger::{HybridMerger, SourcePriority};
pub use model::{FactorModelArtifact, ModelError, TrainedModelArtifact};
pub use pipeline::{
    DiscoveryService, HybridRecommender, Insights, PipelineError, Recommendations, RequestContext,
};
pub use scoring::{CollaborativeScorer, ContentSimilarityScorer, ScoringError};
pub use tag_filter::LanguageTagFilter;

use anyhow::Context;
use melodymind_metadata::{ArtworkResolver, LastFmClient, LastFmError};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    hybrid: Option<Arc<HybridRecommender>>,
    discovery: Option<Arc<DiscoveryService>>,
}

impl AppState {
    /// State with no pipelines attached.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            hybrid: None,
            discovery: None,
        }
    }

    /// Builds every pipeline the configuration allows.
    ///
    /// A configured model artifact that cannot be loaded is an error. A missing
    /// artifact path or Last.fm key only disables the corresponding pipeline.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let mut state = Self::new(config);

        if let Some(path) = state.config.model.artifact_path.clone() {
            let model = FactorModelArtifact::load(&path)
                .with_context(|| format!("loading model artifact {}", path.display()))?;
            state = state.with_model(Arc::new(model));
        } else {
            warn!(
                target: "pipeline",
                "no model artifact configured; hybrid recommendations disabled"
            );
        }

        match LastFmClient::from_config(&state.config.metadata.lastfm) {
            Ok(client) => {
                let client = Arc::new(client);
                let artwork = ArtworkResolver::from_config(
                    &state.config.metadata.artwork,
                    Some(Arc::clone(&client)),
                );
                state = state.with_provider(client, Some(Arc::new(artwork)));
            }
            Err(LastFmError::ConfigurationMissing) => {
                warn!(target: "pipeline", "Last.fm API key missing; discovery disabled");
            }
            Err(error) => return Err(error.into()),
        }

        Ok(state)
    }

    pub fn with_model(mut self, model: Arc<dyn TrainedModelArtifact>) -> Self {
        self.hybrid = Some(Arc::new(HybridRecommender::new(
            model,
            &self.config.recommender,
        )));
        self
    }

    pub fn with_provider(
        mut self,
        provider: Arc<dyn melodymind_metadata::MetadataProvider>,
        artwork: Option<Arc<ArtworkResolver>>,
    ) -> Self {
        self.discovery = Some(Arc::new(DiscoveryService::new(
            provider,
            artwork,
            &self.config.recommender,
            self.config.metadata.artwork.image_size_preference.clone(),
        )));
        self
    }

    pub fn hybrid(&self) -> Result<&HybridRecommender, PipelineError> {
        self.hybrid.as_deref().ok_or(PipelineError::ModelUnavailable)
    }

    pub fn discovery(&self) -> Result<&DiscoveryService, PipelineError> {
        self.discovery
            .as_deref()
            .ok_or(PipelineError::ConfigurationMissing)
    }

    /// Applies the default count and the configured ceiling.
    pub fn clamp_count(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.recommender.default_count)
            .min(self.config.recommender.max_count)
    }

    pub fn on_start(&self) {
        info!(
            target: "application",
            hybrid = self.hybrid.is_some(),
            discovery = self.discovery.is_some(),
            "application state initialized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_defaults_and_clamps() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(state.clamp_count(None), 10);
        assert_eq!(state.clamp_count(Some(4)), 4);
        assert_eq!(state.clamp_count(Some(500)), 25);
    }

    #[test]
    fn missing_pipelines_report_why() {
        let state = AppState::from_config(AppConfig::default()).unwrap();
        assert!(matches!(state.hybrid(), Err(PipelineError::ModelUnavailable)));
        assert!(matches!(
            state.discovery(),
            Err(PipelineError::ConfigurationMissing)
        ));
    }
}
