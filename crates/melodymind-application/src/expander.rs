// SPDX-License-Identifier: GPL-3.0-or-later

//! Fills sparse primary results with top tracks of similar artists.

use melodymind_config::ExpansionConfig;
use melodymind_domain::{
    pick_image, Basis, Candidate, CandidateSource, DedupKey, EntityKind, TrackSummary,
};
use melodymind_metadata::MetadataProvider;
use std::collections::HashSet;
use tracing::{debug, info};

/// Fan-out limits for expansion lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionPolicy {
    pub similar_artists_for_track: usize,
    pub similar_artists_for_artist: usize,
    pub tracks_per_similar_artist: usize,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self::from(&ExpansionConfig::default())
    }
}

impl From<&ExpansionConfig> for ExpansionPolicy {
    fn from(config: &ExpansionConfig) -> Self {
        Self {
            similar_artists_for_track: config.similar_artists_for_track,
            similar_artists_for_artist: config.similar_artists_for_artist,
            tracks_per_similar_artist: config.tracks_per_similar_artist,
        }
    }
}

impl ExpansionPolicy {
    fn similar_artist_count(&self, basis: &Basis) -> usize {
        match basis.kind() {
            EntityKind::Track => self.similar_artists_for_track,
            EntityKind::Artist => self.similar_artists_for_artist,
        }
    }
}

/// Builds an API-pipeline candidate from a provider track entry.
pub fn candidate_from_summary(
    summary: TrackSummary,
    source: CandidateSource,
    rank: usize,
    image_size_preference: &[String],
) -> Candidate {
    let art_url = pick_image(&summary.images, image_size_preference).map(str::to_string);
    Candidate::new(summary.name, summary.artist, source, rank)
        .with_art_url(art_url)
        .with_listen_url(summary.url)
}

#[derive(Debug, Clone)]
pub struct CandidateExpander {
    policy: ExpansionPolicy,
    image_size_preference: Vec<String>,
}

impl CandidateExpander {
    pub fn new(policy: ExpansionPolicy, image_size_preference: Vec<String>) -> Self {
        Self {
            policy,
            image_size_preference,
        }
    }

    /// Returns expansion candidates when `shortfall > 0`, otherwise nothing.
    ///
    /// Tracks already in `primary`, or already added, are skipped.
    /// A similar artist whose lookup comes back empty contributes nothing and
    /// the remaining artists are still queried.
    pub async fn expand(
        &self,
        basis: &Basis,
        primary: &[Candidate],
        shortfall: usize,
        provider: &dyn MetadataProvider,
    ) -> Vec<Candidate> {
        if shortfall == 0 {
            return Vec::new();
        }

        let artist_limit = self.policy.similar_artist_count(basis);
        let similar_artists = provider
            .get_similar_artists(basis.artist_name(), artist_limit)
            .await;
        debug!(
            target: "expander",
            basis = %basis,
            shortfall,
            similar_artists = similar_artists.len(),
            "expanding candidates"
        );

        let mut seen: HashSet<DedupKey> = primary.iter().map(Candidate::dedup_key).collect();
        let mut expanded = Vec::new();

        for similar_artist in similar_artists.iter().take(artist_limit) {
            let tracks = provider
                .get_top_tracks_for_artist(similar_artist, self.policy.tracks_per_similar_artist)
                .await;
            if tracks.is_empty() {
                debug!(
                    target: "expander",
                    artist = %similar_artist,
                    "no top tracks for similar artist"
                );
                continue;
            }

            for summary in tracks.into_iter().take(self.policy.tracks_per_similar_artist) {
                let candidate = candidate_from_summary(
                    summary,
                    CandidateSource::Expansion,
                    expanded.len(),
                    &self.image_size_preference,
                );
                if seen.insert(candidate.dedup_key()) {
                    expanded.push(candidate);
                }
            }
        }

        info!(target: "expander", basis = %basis, added = expanded.len(), "expansion finished");
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProvider;

    fn summary(name: &str, artist: &str) -> TrackSummary {
        TrackSummary {
            name: name.to_string(),
            artist: artist.to_string(),
            url: Some(format!("https://last.fm/{name}")),
            images: Vec::new(),
        }
    }

    fn expander() -> CandidateExpander {
        CandidateExpander::new(ExpansionPolicy::default(), vec!["large".to_string()])
    }

    #[tokio::test]
    async fn no_shortfall_means_no_lookups() {
        let provider = FakeProvider::default();
        let expanded = expander()
            .expand(&Basis::artist("Linkin Park"), &[], 0, &provider)
            .await;
        assert!(expanded.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn track_basis_uses_two_similar_artists_with_two_tracks_each() {
        let provider = FakeProvider::default()
            .with_similar_artists(
                "Linkin Park",
                &["Papa Roach", "Breaking Benjamin", "Evanescence"],
            )
            .with_top_tracks(
                "Papa Roach",
                vec![
                    summary("Last Resort", "Papa Roach"),
                    summary("Scars", "Papa Roach"),
                    summary("Between Angels", "Papa Roach"),
                ],
            )
            .with_top_tracks(
                "Breaking Benjamin",
                vec![summary("Diary of Jane", "Breaking Benjamin")],
            )
            .with_top_tracks("Evanescence", vec![summary("Bring Me to Life", "Evanescence")]);

        let expanded = expander()
            .expand(&Basis::track("Numb", "Linkin Park"), &[], 5, &provider)
            .await;

        let names: Vec<_> = expanded.iter().map(|c| c.track_name.as_str()).collect();
        assert_eq!(names, vec!["Last Resort", "Scars", "Diary of Jane"]);
        assert!(expanded.iter().all(|c| c.source == CandidateSource::Expansion));
        assert_eq!(provider.similar_artist_limits(), vec![2]);
    }

    #[tokio::test]
    async fn artist_basis_uses_three_similar_artists() {
        let provider = FakeProvider::default()
            .with_similar_artists("Linkin Park", &["A", "B", "C"])
            .with_top_tracks("A", vec![summary("a1", "A")])
            .with_top_tracks("B", vec![summary("b1", "B")])
            .with_top_tracks("C", vec![summary("c1", "C")]);

        let expanded = expander()
            .expand(&Basis::artist("Linkin Park"), &[], 3, &provider)
            .await;

        assert_eq!(expanded.len(), 3);
        assert_eq!(provider.similar_artist_limits(), vec![3]);
    }

    #[tokio::test]
    async fn skips_tracks_already_in_primary() {
        let primary = vec![Candidate::new(
            "Last Resort",
            "Papa Roach",
            CandidateSource::Primary,
            0,
        )];
        let provider = FakeProvider::default()
            .with_similar_artists("Linkin Park", &["Papa Roach"])
            .with_top_tracks(
                "Papa Roach",
                vec![summary("last resort ", "papa roach"), summary("Numb", "Linkin Park")],
            );

        let expanded = expander()
            .expand(&Basis::track("Numb", "Linkin Park"), &primary, 4, &provider)
            .await;

        let names: Vec<_> = expanded.iter().map(|c| c.track_name.as_str()).collect();
        assert_eq!(names, vec!["Numb"]);
    }

    #[tokio::test]
    async fn empty_lookup_for_one_artist_does_not_stop_the_rest() {
        let provider = FakeProvider::default()
            .with_similar_artists("Linkin Park", &["Silent", "Papa Roach"])
            .with_top_tracks(
                "Papa Roach",
                vec![summary("Last Resort", "Papa Roach"), summary("Scars", "Papa Roach")],
            );

        let expanded = expander()
            .expand(&Basis::track("Numb", "Linkin Park"), &[], 4, &provider)
            .await;

        let names: Vec<_> = expanded.iter().map(|c| c.track_name.as_str()).collect();
        assert_eq!(names, vec!["Last Resort", "Scars"]);
        assert_eq!(expanded[1].rank, 1);
        // similar artists, then one top-tracks lookup per similar artist
        assert_eq!(provider.calls(), 3);
    }
}
