// SPDX-License-Identifier: GPL-3.0-or-later
use melodymind_domain::{EntityKind, RecommendationSet};
use melodymind_metadata::MetadataProvider;
use tracing::debug;

/// Keeps recommendations whose track tags mention one of the allowed labels.
#[derive(Debug, Clone, Default)]
pub struct LanguageTagFilter {
    allowed: Vec<String>,
}

impl LanguageTagFilter {
    pub fn new<S: AsRef<str>>(allowed_labels: &[S]) -> Self {
        Self {
            allowed: allowed_labels
                .iter()
                .map(|label| label.as_ref().trim().to_lowercase())
                .filter(|label| !label.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Case-insensitive substring match of any tag against any allowed label.
    pub fn matches<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|tag| {
            let tag = tag.as_ref().to_lowercase();
            self.allowed.iter().any(|label| tag.contains(label.as_str()))
        })
    }

    pub async fn filter(
        &self,
        recs: RecommendationSet,
        tag_lookup: &dyn MetadataProvider,
    ) -> RecommendationSet {
        if self.is_empty() {
            return recs;
        }

        let before = recs.len();
        let mut kept = RecommendationSet::new();
        for candidate in recs {
            let tags = tag_lookup
                .get_top_tags(
                    EntityKind::Track,
                    &candidate.track_name,
                    Some(&candidate.artist_name),
                )
                .await;
            if self.matches(tags.as_slice()) {
                kept.insert(candidate);
            }
        }

        debug!(
            target: "pipeline",
            before,
            after = kept.len(),
            labels = ?self.allowed,
            "language tag filter applied"
        );
        kept
    }
}
