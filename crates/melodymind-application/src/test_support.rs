// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory `MetadataProvider` for pipeline tests.

use async_trait::async_trait;
use melodymind_domain::{normalize_name, ArtistInfo, EntityKind, TrackInfo, TrackSummary};
use melodymind_metadata::MetadataProvider;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| normalize_name(part))
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Default)]
pub struct FakeProvider {
    similar_tracks: HashMap<String, Vec<TrackSummary>>,
    top_tracks: HashMap<String, Vec<TrackSummary>>,
    similar_artists: HashMap<String, Vec<String>>,
    track_tags: HashMap<String, Vec<String>>,
    track_info: HashMap<String, TrackInfo>,
    artist_info: HashMap<String, ArtistInfo>,
    searches: HashMap<String, TrackSummary>,
    failing: bool,
    calls: AtomicUsize,
    similar_artist_limits: Mutex<Vec<usize>>,
}

impl FakeProvider {
    /// A provider whose every lookup fails (and therefore degrades to empty).
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_similar_tracks(
        mut self,
        track: &str,
        artist: &str,
        tracks: Vec<TrackSummary>,
    ) -> Self {
        self.similar_tracks.insert(key(&[track, artist]), tracks);
        self
    }

    pub fn with_top_tracks(mut self, artist: &str, tracks: Vec<TrackSummary>) -> Self {
        self.top_tracks.insert(key(&[artist]), tracks);
        self
    }

    pub fn with_similar_artists(mut self, artist: &str, similar: &[&str]) -> Self {
        self.similar_artists
            .insert(key(&[artist]), similar.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_track_tags(mut self, track: &str, artist: &str, tags: &[&str]) -> Self {
        self.track_tags
            .insert(key(&[track, artist]), tags.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_track_info(mut self, info: TrackInfo) -> Self {
        self.track_info.insert(key(&[info.name.as_str(), info.artist.as_str()]), info);
        self
    }

    pub fn with_artist_info(mut self, info: ArtistInfo) -> Self {
        self.artist_info.insert(key(&[info.name.as_str()]), info);
        self
    }

    pub fn with_search(mut self, query: &str, result: TrackSummary) -> Self {
        self.searches.insert(key(&[query]), result);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn similar_artist_limits(&self) -> Vec<usize> {
        self.similar_artist_limits
            .lock()
            .map(|limits| limits.clone())
            .unwrap_or_default()
    }

    fn record(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        !self.failing
    }
}

fn limited(tracks: Option<&Vec<TrackSummary>>, limit: usize) -> Vec<TrackSummary> {
    tracks
        .map(|tracks| tracks.iter().take(limit).cloned().collect())
        .unwrap_or_default()
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    async fn get_track_info(&self, track: &str, artist: &str) -> Option<TrackInfo> {
        if !self.record() {
            return None;
        }
        self.track_info.get(&key(&[track, artist])).cloned()
    }

    async fn get_artist_info(&self, artist: &str) -> Option<ArtistInfo> {
        if !self.record() {
            return None;
        }
        self.artist_info.get(&key(&[artist])).cloned()
    }

    async fn get_similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Vec<TrackSummary> {
        if !self.record() {
            return Vec::new();
        }
        limited(self.similar_tracks.get(&key(&[track, artist])), limit)
    }

    async fn get_top_tracks_for_artist(&self, artist: &str, limit: usize) -> Vec<TrackSummary> {
        if !self.record() {
            return Vec::new();
        }
        limited(self.top_tracks.get(&key(&[artist])), limit)
    }

    async fn get_top_tracks_for_tag(&self, _tag: &str, _limit: usize) -> Vec<TrackSummary> {
        self.record();
        Vec::new()
    }

    async fn get_similar_artists(&self, artist: &str, limit: usize) -> Vec<String> {
        if let Ok(mut limits) = self.similar_artist_limits.lock() {
            limits.push(limit);
        }
        if !self.record() {
            return Vec::new();
        }
        self.similar_artists
            .get(&key(&[artist]))
            .map(|artists| artists.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    async fn get_top_tags(
        &self,
        kind: EntityKind,
        name: &str,
        artist: Option<&str>,
    ) -> Vec<String> {
        if !self.record() {
            return Vec::new();
        }
        match (kind, artist) {
            (EntityKind::Track, Some(artist)) => self
                .track_tags
                .get(&key(&[name, artist]))
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    async fn search_track(&self, query: &str) -> Option<TrackSummary> {
        if !self.record() {
            return None;
        }
        self.searches.get(&key(&[query])).cloned()
    }
}
