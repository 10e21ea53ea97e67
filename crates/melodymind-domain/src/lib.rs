// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use url::form_urlencoded;

// ============================================================================
// Value Objects & IDs
// ============================================================================

/// Position of a track in the catalog. This is the only identity a catalog
/// item has; names are not unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogIndex(pub usize);

impl CatalogIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for CatalogIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encoded listener id as produced by the model's user encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u32);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized `(track, artist)` pair used to collapse duplicate candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub track: String,
    pub artist: String,
}

impl DedupKey {
    pub fn new(track: &str, artist: &str) -> Self {
        Self {
            track: normalize_name(track),
            artist: normalize_name(artist),
        }
    }
}

/// Trim, compose to NFC and lowercase a display name. Inner spacing is kept.
pub fn normalize_name(value: &str) -> String {
    value.trim().nfc().collect::<String>().to_lowercase()
}

// ============================================================================
// Enums
// ============================================================================

/// Which signal produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Content,
    Collab,
    Primary,
    Expansion,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Collab => "collab",
            Self::Primary => "primary",
            Self::Expansion => "expansion",
        }
    }
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown candidate source label '{0}'")]
pub struct UnknownSourceLabel(pub String);

impl FromStr for CandidateSource {
    type Err = UnknownSourceLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "content" => Ok(Self::Content),
            "collab" | "collaborative" => Ok(Self::Collab),
            "primary" => Ok(Self::Primary),
            "expansion" => Ok(Self::Expansion),
            other => Err(UnknownSourceLabel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Track,
    Artist,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Artist => "artist",
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub track_name: String,
    pub primary_artist: String,
    pub feature_vector: Vec<f32>,
}

impl CatalogItem {
    pub fn new(
        track_name: impl Into<String>,
        primary_artist: impl Into<String>,
        feature_vector: Vec<f32>,
    ) -> Self {
        Self {
            track_name: track_name.into(),
            primary_artist: primary_artist.into(),
            feature_vector,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.track_name, &self.primary_artist)
    }
}

/// One potential recommendation, tagged with the list it came from and its
/// position in that list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub track_name: String,
    pub artist_name: String,
    pub source: CandidateSource,
    pub rank: usize,
    pub art_url: Option<String>,
    pub listen_url: Option<String>,
}

impl Candidate {
    pub fn new(
        track_name: impl Into<String>,
        artist_name: impl Into<String>,
        source: CandidateSource,
        rank: usize,
    ) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            source,
            rank,
            art_url: None,
            listen_url: None,
        }
    }

    pub fn with_art_url(mut self, art_url: Option<String>) -> Self {
        self.art_url = art_url.filter(|url| !url.trim().is_empty());
        self
    }

    pub fn with_listen_url(mut self, listen_url: Option<String>) -> Self {
        self.listen_url = listen_url.filter(|url| !url.trim().is_empty());
        self
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.track_name, &self.artist_name)
    }

    /// YouTube search link for the candidate.
    pub fn youtube_search_url(&self) -> String {
        let query = format!("{} {}", self.artist_name, self.track_name);
        let query = query.split_whitespace().collect::<Vec<_>>().join(" ");
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        format!("https://www.youtube.com/results?search_query={encoded}")
    }
}

/// Anchor of a recommendation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Basis {
    Track {
        track_name: String,
        artist_name: String,
    },
    Artist {
        artist_name: String,
    },
}

impl Basis {
    pub fn track(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self::Track {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
        }
    }

    pub fn artist(artist_name: impl Into<String>) -> Self {
        Self::Artist {
            artist_name: artist_name.into(),
        }
    }

    pub fn artist_name(&self) -> &str {
        match self {
            Self::Track { artist_name, .. } | Self::Artist { artist_name } => artist_name,
        }
    }

    pub fn track_name(&self) -> Option<&str> {
        match self {
            Self::Track { track_name, .. } => Some(track_name),
            Self::Artist { .. } => None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Track { .. } => EntityKind::Track,
            Self::Artist { .. } => EntityKind::Artist,
        }
    }
}

impl std::fmt::Display for Basis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Track {
                track_name,
                artist_name,
            } => write!(f, "'{track_name}' by {artist_name}"),
            Self::Artist { artist_name } => write!(f, "artist {artist_name}"),
        }
    }
}

/// Ordered, deduplicated recommendations. Insertion order is ranking order
/// and the first candidate seen for a key keeps its slot.
#[derive(Debug, Clone, Default)]
pub struct RecommendationSet {
    items: Vec<Candidate>,
    keys: HashSet<DedupKey>,
}

impl RecommendationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the candidate unless its key is already present. Returns
    /// whether it was inserted.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if self.keys.insert(candidate.dedup_key()) {
            self.items.push(candidate);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Candidate> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.items
    }

    pub fn truncate(&mut self, n: usize) {
        for dropped in self.items.drain(n.min(self.items.len())..) {
            self.keys.remove(&dropped.dedup_key());
        }
    }

}

impl FromIterator<Candidate> for RecommendationSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = Self::new();
        for candidate in iter {
            set.insert(candidate);
        }
        set
    }
}

impl IntoIterator for RecommendationSet {
    type Item = Candidate;
    type IntoIter = std::vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecommendationSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl PartialEq for RecommendationSet {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Serialize for RecommendationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

// ============================================================================
// Metadata records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub size: String,
    pub url: String,
}

/// First non-empty image URL following `preferences` (size names, most
/// preferred first).
pub fn pick_image<'a>(images: &'a [Image], preferences: &[String]) -> Option<&'a str> {
    preferences.iter().find_map(|size| {
        images
            .iter()
            .find(|image| image.size.eq_ignore_ascii_case(size) && !image.url.trim().is_empty())
            .map(|image| image.url.as_str())
    })
}

/// A track entry as returned by list lookups (similar tracks, top tracks, search).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub name: String,
    pub artist: String,
    pub url: Option<String>,
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub name: String,
    pub artist: String,
    /// Album artwork of the track's album.
    pub images: Vec<Image>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub name: String,
    pub images: Vec<Image>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_ignores_case_and_surrounding_whitespace() {
        let a = Candidate::new("Numb", "Linkin Park", CandidateSource::Collab, 0);
        let b = Candidate::new("numb ", " linkin park", CandidateSource::Content, 3);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_trims_but_keeps_inner_spacing() {
        assert_eq!(
            DedupKey::new("\tIn the End ", "  Linkin Park"),
            DedupKey::new("in the end", "linkin park")
        );
        assert_ne!(DedupKey::new("In  the End", "x"), DedupKey::new("In the End", "x"));
    }

    #[test]
    fn dedup_key_composes_unicode_before_comparing() {
        let composed = DedupKey::new("Caf\u{e9}", "Artist");
        let decomposed = DedupKey::new("Cafe\u{301}", "artist");
        assert_eq!(composed, decomposed);
    }

    #[test]
    fn recommendation_set_keeps_first_seen_candidate() {
        let mut set = RecommendationSet::new();
        assert!(set.insert(Candidate::new("Numb", "Linkin Park", CandidateSource::Collab, 0)));
        assert!(!set.insert(Candidate::new("NUMB", "linkin park", CandidateSource::Content, 0)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].source, CandidateSource::Collab);
    }

    #[test]
    fn recommendation_set_truncate_releases_keys() {
        let mut set: RecommendationSet = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(rank, name)| Candidate::new(*name, "x", CandidateSource::Primary, rank))
            .collect();

        set.truncate(2);
        assert_eq!(set.len(), 2);
        assert!(set.insert(Candidate::new("c", "x", CandidateSource::Expansion, 0)));
        assert!(!set.insert(Candidate::new("a", "x", CandidateSource::Expansion, 0)));

        let names: Vec<_> = set.iter().map(|c| c.track_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn recommendation_set_serializes_as_list() {
        let set: RecommendationSet =
            std::iter::once(Candidate::new("Numb", "Linkin Park", CandidateSource::Collab, 0))
                .collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0]["track_name"], "Numb");
        assert_eq!(json[0]["source"], "collab");
    }

    #[test]
    fn candidate_source_parses_labels() {
        assert_eq!("collab".parse::<CandidateSource>(), Ok(CandidateSource::Collab));
        assert_eq!(" Content ".parse::<CandidateSource>(), Ok(CandidateSource::Content));
        let error = "bogus".parse::<CandidateSource>().unwrap_err();
        assert_eq!(error, UnknownSourceLabel("bogus".to_string()));
        assert_eq!(error.to_string(), "unknown candidate source label 'bogus'");
    }

    #[test]
    fn basis_accessors() {
        let track = Basis::track("Numb", "Linkin Park");
        assert_eq!(track.artist_name(), "Linkin Park");
        assert_eq!(track.track_name(), Some("Numb"));
        assert_eq!(track.kind(), EntityKind::Track);

        let artist = Basis::artist("VTEN");
        assert_eq!(artist.track_name(), None);
        assert_eq!(artist.kind(), EntityKind::Artist);
    }

    #[test]
    fn youtube_link_encodes_query() {
        let candidate = Candidate::new("In the End", "Linkin Park", CandidateSource::Primary, 0);
        assert_eq!(
            candidate.youtube_search_url(),
            "https://www.youtube.com/results?search_query=Linkin+Park+In+the+End"
        );

        let candidate = Candidate::new("R&B", "A/B", CandidateSource::Primary, 0);
        assert_eq!(
            candidate.youtube_search_url(),
            "https://www.youtube.com/results?search_query=A%2FB+R%26B"
        );

        let candidate = Candidate::new(" Caf\u{e9}  Song?", "Band", CandidateSource::Primary, 0);
        assert_eq!(
            candidate.youtube_search_url(),
            "https://www.youtube.com/results?search_query=Band+Caf%C3%A9+Song%3F"
        );
    }

    #[test]
    fn pick_image_follows_preference_and_skips_empty() {
        let images = vec![
            Image { size: "small".into(), url: "s.png".into() },
            Image { size: "large".into(), url: "l.png".into() },
            Image { size: "extralarge".into(), url: "".into() },
        ];
        let prefs = vec!["extralarge".to_string(), "large".to_string()];
        assert_eq!(pick_image(&images, &prefs), Some("l.png"));
        assert_eq!(pick_image(&images, &["mega".to_string()]), None);
    }
}
