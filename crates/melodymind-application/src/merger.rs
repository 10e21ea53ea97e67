// SPDX-License-Identifier: GPL-3.0-or-later

//! Merges independently ranked candidate lists into one deduplicated set.

use melodymind_domain::{Candidate, CandidateSource, RecommendationSet};
use tracing::{debug, warn};

/// Source labels in merge order, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePriority(Vec<CandidateSource>);

impl Default for SourcePriority {
    fn default() -> Self {
        Self(vec![
            CandidateSource::Collab,
            CandidateSource::Primary,
            CandidateSource::Content,
            CandidateSource::Expansion,
        ])
    }
}

impl SourcePriority {
    pub fn new(order: Vec<CandidateSource>) -> Self {
        let mut unique = Vec::with_capacity(order.len());
        for source in order {
            if !unique.contains(&source) {
                unique.push(source);
            }
        }
        Self(unique)
    }

    /// Parses configured labels. Unknown labels are logged and ignored.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let order = labels
            .iter()
            .filter_map(|label| match label.as_ref().parse::<CandidateSource>() {
                Ok(source) => Some(source),
                Err(error) => {
                    warn!(target: "merger", %error, "ignoring source priority entry");
                    None
                }
            })
            .collect();
        Self::new(order)
    }

    /// Position of `source` in the priority list; unnamed sources sort last.
    fn slot(&self, source: CandidateSource) -> usize {
        self.0
            .iter()
            .position(|named| *named == source)
            .unwrap_or(self.0.len())
    }

    pub fn as_slice(&self) -> &[CandidateSource] {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct HybridMerger {
    priority: SourcePriority,
}

impl HybridMerger {
    pub fn new(priority: SourcePriority) -> Self {
        Self { priority }
    }

    /// Merges ranked lists into at most `n` distinct candidates.
    ///
    /// Lists are consumed in priority order (the sort is stable, so unnamed
    /// sources keep the caller's order), each in rank order. The first
    /// candidate seen for a dedup key keeps its slot and provenance.
    pub fn merge(
        &self,
        ranked_lists: Vec<(CandidateSource, Vec<Candidate>)>,
        n: usize,
    ) -> RecommendationSet {
        let mut merged = RecommendationSet::new();
        if n == 0 {
            return merged;
        }

        let mut lists = ranked_lists;
        lists.sort_by_key(|(source, _)| self.priority.slot(*source));

        'lists: for (source, mut candidates) in lists {
            candidates.sort_by_key(|candidate| candidate.rank);
            let offered = candidates.len();
            let mut taken = 0usize;
            for candidate in candidates {
                if merged.len() == n {
                    debug!(target: "merger", %source, offered, taken, "merge filled");
                    break 'lists;
                }
                if merged.insert(candidate) {
                    taken += 1;
                }
            }
            debug!(target: "merger", %source, offered, taken, "list merged");
        }

        merged.truncate(n);
        merged
    }
}
