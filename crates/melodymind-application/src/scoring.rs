// SPDX-License-Identifier: GPL-3.0-or-later

//! Candidate scorers for the model-based pipeline.

use melodymind_domain::{CatalogIndex, CatalogItem, UserId};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::model::{ModelError, TrainedModelArtifact};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("User {0} is unknown to the affinity model")]
    UnknownUser(UserId),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Cosine similarity; zero-norm inputs and non-finite results score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Score descending, then index ascending.
fn by_score_then_index(a: &(CatalogIndex, f32), b: &(CatalogIndex, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Ranks catalog items by cosine similarity to a seed item.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentSimilarityScorer;

impl ContentSimilarityScorer {
    pub fn rank_by_similarity(
        &self,
        seed: CatalogIndex,
        catalog: &[CatalogItem],
        k: usize,
    ) -> Vec<(CatalogIndex, f32)> {
        let Some(seed_item) = catalog.get(seed.get()) else {
            debug!(target: "scoring", seed = %seed, "seed index not in catalog");
            return Vec::new();
        };

        let mut scored: Vec<(CatalogIndex, f32)> = catalog
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != seed.get())
            .map(|(index, item)| {
                (
                    CatalogIndex(index),
                    cosine_similarity(&seed_item.feature_vector, &item.feature_vector),
                )
            })
            .collect();

        scored.sort_by(by_score_then_index);
        scored.truncate(k);
        scored
    }
}

/// Ranks catalog items by predicted affinity for one listener.
pub struct CollaborativeScorer {
    model: Arc<dyn TrainedModelArtifact>,
}

impl CollaborativeScorer {
    pub fn new(model: Arc<dyn TrainedModelArtifact>) -> Self {
        Self { model }
    }

    pub fn rank_for_user(
        &self,
        user: UserId,
        catalog_size: usize,
        k: usize,
    ) -> Result<Vec<(CatalogIndex, f32)>, ScoringError> {
        let indices: Vec<CatalogIndex> = (0..catalog_size).map(CatalogIndex).collect();
        let scores = self
            .model
            .predict_affinity(user, &indices)
            .map_err(|error| match error {
                ModelError::UnknownUser(user) => ScoringError::UnknownUser(user),
                other => ScoringError::Model(other),
            })?;

        let mut scored: Vec<(CatalogIndex, f32)> = indices
            .into_iter()
            .zip(scores)
            .map(|(index, score)| (index, if score.is_finite() { score } else { f32::MIN }))
            .collect();

        scored.sort_by(by_score_then_index);
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactorModelArtifact;

    fn item(name: &str, features: Vec<f32>) -> CatalogItem {
        CatalogItem::new(name, "Artist", features)
    }

    #[test]
    fn cosine_handles_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_excludes_seed_and_breaks_ties_by_index() {
        let catalog = vec![
            item("seed", vec![1.0, 0.0]),
            item("orthogonal", vec![0.0, 1.0]),
            item("same-a", vec![2.0, 0.0]),
            item("same-b", vec![3.0, 0.0]),
            item("silent", vec![0.0, 0.0]),
        ];
        let ranked = ContentSimilarityScorer.rank_by_similarity(CatalogIndex(0), &catalog, 3);
        let indices: Vec<_> = ranked.iter().map(|(index, _)| index.get()).collect();
        assert_eq!(indices, vec![2, 3, 1]);
    }

    #[test]
    fn similarity_for_missing_seed_is_empty() {
        let catalog = vec![item("only", vec![1.0])];
        assert!(ContentSimilarityScorer
            .rank_by_similarity(CatalogIndex(5), &catalog, 10)
            .is_empty());
    }

    #[test]
    fn similarity_is_deterministic() {
        let catalog: Vec<_> = (0..20)
            .map(|i| item(&format!("t{i}"), vec![(i % 3) as f32, 1.0]))
            .collect();
        let first = ContentSimilarityScorer.rank_by_similarity(CatalogIndex(4), &catalog, 8);
        let second = ContentSimilarityScorer.rank_by_similarity(CatalogIndex(4), &catalog, 8);
        assert_eq!(first, second);
    }

    #[test]
    fn collaborative_ranks_by_affinity() {
        let model = FactorModelArtifact::from_json(
            &crate::model::tests::sample_artifact_json().to_string(),
        )
        .unwrap();
        let scorer = CollaborativeScorer::new(Arc::new(model));
        let ranked = scorer.rank_for_user(UserId(0), 3, 2).unwrap();
        let indices: Vec<_> = ranked.iter().map(|(index, _)| index.get()).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn collaborative_unknown_user_is_reported() {
        let model = FactorModelArtifact::from_json(
            &crate::model::tests::sample_artifact_json().to_string(),
        )
        .unwrap();
        let scorer = CollaborativeScorer::new(Arc::new(model));
        assert!(matches!(
            scorer.rank_for_user(UserId(1), 3, 2),
            Err(ScoringError::UnknownUser(UserId(1)))
        ));
    }
}
