// SPDX-License-Identifier: GPL-3.0-or-later

//! Narrow metadata interface consumed by the recommendation pipelines.
//!
//! Implementations validate wire responses into the typed records from
//! `melodymind_domain` and never surface errors: a failed lookup is reported
//! as an empty list or `None`, and logged by the implementation.

use async_trait::async_trait;
use melodymind_domain::{ArtistInfo, EntityKind, TrackInfo, TrackSummary};

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn get_track_info(&self, track: &str, artist: &str) -> Option<TrackInfo>;

    async fn get_artist_info(&self, artist: &str) -> Option<ArtistInfo>;

    async fn get_similar_tracks(&self, track: &str, artist: &str, limit: usize)
        -> Vec<TrackSummary>;

    async fn get_top_tracks_for_artist(&self, artist: &str, limit: usize) -> Vec<TrackSummary>;

    async fn get_top_tracks_for_tag(&self, tag: &str, limit: usize) -> Vec<TrackSummary>;

    async fn get_similar_artists(&self, artist: &str, limit: usize) -> Vec<String>;

    /// Top tags of a track (`artist` required) or an artist.
    async fn get_top_tags(&self, kind: EntityKind, name: &str, artist: Option<&str>)
        -> Vec<String>;

    /// Best match for a free-text track query.
    async fn search_track(&self, query: &str) -> Option<TrackSummary>;
}
