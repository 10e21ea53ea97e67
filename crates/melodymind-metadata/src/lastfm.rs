// SPDX-License-Identifier: GPL-3.0-or-later

//! Last.fm API client implementation

use async_trait::async_trait;
use melodymind_config::LastFmConfig;
use melodymind_domain::{ArtistInfo, EntityKind, Image, TrackInfo, TrackSummary};
use moka::sync::Cache;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{self, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::provider::MetadataProvider;

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0";

/// Hash of the grey star Last.fm serves in place of missing images.
const LASTFM_PLACEHOLDER_IMAGE_ID: &str = "2a96cbd8b46e442fc41c2b86b821562f";

/// Last.fm error codes that describe a temporary server condition.
const RETRYABLE_API_CODES: [i64; 3] = [11, 16, 29];

/// Struct representing the Last.fm API client.
pub struct LastFmClient {
    api_key: String,
    client: Client,
    base_url: String,
    rate_limiter: Arc<Semaphore>,
    cache: Cache<String, Value>,
    max_retries: u32,
    headroom_factor: usize,
}

impl LastFmClient {
    /// Creates a new Last.fm API client with default limits.
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let config = LastFmConfig {
            api_key: Some(api_key.clone()),
            base_url,
            ..LastFmConfig::default()
        };
        Self::with_config(api_key, &config)
    }

    /// Creates a client from configuration. A missing or blank API key is
    /// fatal for live lookups.
    pub fn from_config(config: &LastFmConfig) -> Result<Self, LastFmError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(LastFmError::ConfigurationMissing)?
            .to_string();
        Ok(Self::with_config(api_key, config))
    }

    fn with_config(api_key: String, config: &LastFmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("melodymind/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|error| {
                debug!(
                    target: "lastfm",
                    ?error,
                    "Failed to build Last.fm HTTP client with custom settings, falling back to default client"
                );
                Client::new()
            });

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs.max(1)))
            .build();

        Self {
            api_key,
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| LASTFM_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            rate_limiter: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            cache,
            max_retries: config.max_retries,
            headroom_factor: config.request_headroom_factor.max(1),
        }
    }

    /// Fetches detailed information for a single track.
    pub async fn track_info(&self, track: &str, artist: &str) -> Result<TrackInfo, LastFmError> {
        let value = self
            .call("track.getInfo", &[("track", track), ("artist", artist)])
            .await?;
        let payload: TrackInfoResponse = decode(value)?;
        let track = payload.track.ok_or(LastFmError::NotFound("track"))?;
        Ok(TrackInfo {
            name: track.name,
            artist: track.artist.map(ArtistRef::into_name).unwrap_or_default(),
            images: track.album.map(|album| album.image).unwrap_or_default().into_images(),
            tags: track.toptags.into_names(),
            summary: track.wiki.and_then(|wiki| wiki.summary),
            url: track.url,
        })
    }

    /// Fetches detailed information for a single artist.
    pub async fn artist_info(&self, artist: &str) -> Result<ArtistInfo, LastFmError> {
        let value = self.call("artist.getInfo", &[("artist", artist)]).await?;
        let payload: ArtistInfoResponse = decode(value)?;
        let artist = payload.artist.ok_or(LastFmError::NotFound("artist"))?;
        Ok(ArtistInfo {
            name: artist.name,
            images: artist.image.into_images(),
            tags: artist.tags.into_names(),
            summary: artist.bio.and_then(|bio| bio.summary),
            url: artist.url,
        })
    }

    pub async fn similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<TrackSummary>, LastFmError> {
        let upstream_limit = self.upstream_limit(limit);
        let value = self
            .call(
                "track.getSimilar",
                &[("track", track), ("artist", artist), ("limit", upstream_limit.as_str())],
            )
            .await?;
        let payload: SimilarTracksResponse = decode(value)?;
        Ok(usable_tracks(payload.similartracks.track, limit))
    }

    pub async fn artist_top_tracks(
        &self,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<TrackSummary>, LastFmError> {
        let upstream_limit = self.upstream_limit(limit);
        let value = self
            .call(
                "artist.getTopTracks",
                &[("artist", artist), ("limit", upstream_limit.as_str())],
            )
            .await?;
        let payload: TopTracksResponse = decode(value)?;
        Ok(usable_tracks(payload.toptracks.track, limit))
    }

    pub async fn tag_top_tracks(
        &self,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<TrackSummary>, LastFmError> {
        let upstream_limit = self.upstream_limit(limit);
        let value = self
            .call("tag.getTopTracks", &[("tag", tag), ("limit", upstream_limit.as_str())])
            .await?;
        let payload: TagTopTracksResponse = decode(value)?;
        Ok(usable_tracks(payload.tracks.track, limit))
    }

    pub async fn similar_artists(
        &self,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<String>, LastFmError> {
        let limit_param = limit.to_string();
        let value = self
            .call("artist.getSimilar", &[("artist", artist), ("limit", limit_param.as_str())])
            .await?;
        let payload: SimilarArtistsResponse = decode(value)?;
        Ok(payload
            .similarartists
            .artist
            .into_iter()
            .map(|artist| artist.name)
            .filter(|name| !name.trim().is_empty())
            .take(limit)
            .collect())
    }

    pub async fn top_tags(
        &self,
        kind: EntityKind,
        name: &str,
        artist: Option<&str>,
    ) -> Result<Vec<String>, LastFmError> {
        let value = match (kind, artist) {
            (EntityKind::Track, Some(artist)) => {
                self.call("track.getTopTags", &[("track", name), ("artist", artist)])
                    .await?
            }
            (EntityKind::Track, None) => return Err(LastFmError::MissingArtist),
            (EntityKind::Artist, _) => self.call("artist.getTopTags", &[("artist", name)]).await?,
        };
        let payload: TopTagsResponse = decode(value)?;
        Ok(payload.toptags.into_names())
    }

    /// Finds the top track match for a free-text query.
    pub async fn search(&self, query: &str) -> Result<Option<TrackSummary>, LastFmError> {
        let value = self
            .call("track.search", &[("track", query), ("limit", "1")])
            .await?;
        let payload: SearchResponse = decode(value)?;
        Ok(payload
            .results
            .trackmatches
            .track
            .into_iter()
            .find_map(WireTrack::into_summary))
    }

    fn upstream_limit(&self, limit: usize) -> String {
        limit.saturating_mul(self.headroom_factor).max(1).to_string()
    }

    /// Performs a rate-limited, memoized API call. Only successful payloads
    /// are cached.
    #[instrument(skip(self, params))]
    async fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<Value, LastFmError> {
        let cache_key = cache_key(method, params);
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!(target: "lastfm", "cache hit");
            return Ok(cached);
        }

        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|_| LastFmError::RateLimiterClosed)?;

        let mut attempt = 0;
        loop {
            match self.send(method, params).await {
                Ok(value) => {
                    self.cache.insert(cache_key, value.clone());
                    return Ok(value);
                }
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(target: "lastfm", error = %error, attempt, "retrying request");
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send(&self, method: &str, params: &[(&str, &str)]) -> Result<Value, LastFmError> {
        let url = format!("{}/", self.base_url);
        debug!(target: "lastfm", url = %url, method, "calling Last.fm");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("method", method),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
                ("autocorrect", "1"),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_lastfm_body(status, &body)
    }
}

fn cache_key(method: &str, params: &[(&str, &str)]) -> String {
    let mut parts: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value.trim().to_lowercase()))
        .collect();
    parts.sort();
    format!("{}?{}", method.to_lowercase(), parts.join("&"))
}

fn degrade<T>(lookup: &str, result: Result<T, LastFmError>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            warn!(target: "lastfm", lookup, error = %error, "lookup failed; continuing without it");
            fallback
        }
    }
}

#[async_trait]
impl MetadataProvider for LastFmClient {
    async fn get_track_info(&self, track: &str, artist: &str) -> Option<TrackInfo> {
        degrade("track.getInfo", self.track_info(track, artist).await.map(Some), None)
    }

    async fn get_artist_info(&self, artist: &str) -> Option<ArtistInfo> {
        degrade("artist.getInfo", self.artist_info(artist).await.map(Some), None)
    }

    async fn get_similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Vec<TrackSummary> {
        degrade(
            "track.getSimilar",
            self.similar_tracks(track, artist, limit).await,
            Vec::new(),
        )
    }

    async fn get_top_tracks_for_artist(&self, artist: &str, limit: usize) -> Vec<TrackSummary> {
        degrade(
            "artist.getTopTracks",
            self.artist_top_tracks(artist, limit).await,
            Vec::new(),
        )
    }

    async fn get_top_tracks_for_tag(&self, tag: &str, limit: usize) -> Vec<TrackSummary> {
        degrade("tag.getTopTracks", self.tag_top_tracks(tag, limit).await, Vec::new())
    }

    async fn get_similar_artists(&self, artist: &str, limit: usize) -> Vec<String> {
        degrade(
            "artist.getSimilar",
            self.similar_artists(artist, limit).await,
            Vec::new(),
        )
    }

    async fn get_top_tags(
        &self,
        kind: EntityKind,
        name: &str,
        artist: Option<&str>,
    ) -> Vec<String> {
        degrade("getTopTags", self.top_tags(kind, name, artist).await, Vec::new())
    }

    async fn search_track(&self, query: &str) -> Option<TrackSummary> {
        degrade("track.search", self.search(query).await, None)
    }
}

#[derive(Debug, Error)]
pub enum LastFmError {
    #[error("Last.fm API key is not configured")]
    ConfigurationMissing,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("Last.fm API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
    #[error("Last.fm response contained no {0}")]
    NotFound(&'static str),
    #[error("track tag lookups need an artist")]
    MissingArtist,
    #[error("Rate limiter closed")]
    RateLimiterClosed,
}

impl LastFmError {
    /// Whether an immediate second attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Api { code, .. } => RETRYABLE_API_CODES.contains(code),
            _ => false,
        }
    }
}

fn parse_lastfm_body(status: StatusCode, response_body: &str) -> Result<Value, LastFmError> {
    // Last.fm reports API errors with a JSON body even on 4xx statuses.
    let parsed: Result<Value, _> = serde_json::from_str(response_body);

    if let Ok(value) = &parsed {
        if let Some(code) = value.get("error").and_then(Value::as_i64) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(LastFmError::Api { code, message });
        }
    }

    if !status.is_success() {
        return Err(LastFmError::HttpStatus {
            status,
            body: response_body.to_string(),
        });
    }

    Ok(parsed?)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, LastFmError> {
    Ok(serde_json::from_value(value)?)
}

fn usable_tracks(items: Vec<WireTrack>, limit: usize) -> Vec<TrackSummary> {
    items
        .into_iter()
        .filter_map(WireTrack::into_summary)
        .filter(|track| track.url.is_some())
        .take(limit)
        .collect()
}

// ============================================================================
// Wire schema
// ============================================================================

/// Accepts either a list or a single object; anything else, and any element
/// that does not match `T`, is dropped.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        object @ Value::Object(_) => serde_json::from_value(object)
            .map(|item| vec![item])
            .unwrap_or_default(),
        _ => Vec::new(),
    })
}

/// Falls back to `T::default()` when the field has an unexpected shape
/// (Last.fm sends `""` for empty containers).
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtistRef {
    Name(String),
    Object { name: String },
}

impl ArtistRef {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireImage {
    #[serde(rename = "#text", default)]
    url: String,
    #[serde(default)]
    size: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
struct WireImages(#[serde(deserialize_with = "one_or_many")] Vec<WireImage>);

impl WireImages {
    fn into_images(self) -> Vec<Image> {
        self.0
            .into_iter()
            .filter(|image| {
                !image.url.trim().is_empty() && !image.url.contains(LASTFM_PLACEHOLDER_IMAGE_ID)
            })
            .map(|image| Image {
                size: image.size,
                url: image.url,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WireTag {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireTagList {
    #[serde(default, deserialize_with = "one_or_many")]
    tag: Vec<WireTag>,
}

impl WireTagList {
    fn into_names(self) -> Vec<String> {
        self.tag
            .into_iter()
            .map(|tag| tag.name)
            .filter(|name| !name.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artist: Option<ArtistRef>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    image: WireImages,
}

impl WireTrack {
    fn into_summary(self) -> Option<TrackSummary> {
        let name = self.name.filter(|name| !name.trim().is_empty())?;
        let artist = self
            .artist
            .map(ArtistRef::into_name)
            .filter(|artist| !artist.trim().is_empty())?;
        Some(TrackSummary {
            name,
            artist,
            url: self.url.filter(|url| !url.trim().is_empty()),
            images: self.image.into_images(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireTrackList {
    #[serde(default, deserialize_with = "one_or_many")]
    track: Vec<WireTrack>,
}

#[derive(Debug, Deserialize)]
struct TrackInfoResponse {
    track: Option<WireTrackDetail>,
}

#[derive(Debug, Deserialize)]
struct WireTrackDetail {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    artist: Option<ArtistRef>,
    #[serde(default, deserialize_with = "lenient")]
    album: Option<WireAlbum>,
    #[serde(default, deserialize_with = "lenient")]
    toptags: WireTagList,
    #[serde(default, deserialize_with = "lenient")]
    wiki: Option<WireWiki>,
}

#[derive(Debug, Default, Deserialize)]
struct WireAlbum {
    #[serde(default, deserialize_with = "lenient")]
    image: WireImages,
}

#[derive(Debug, Default, Deserialize)]
struct WireWiki {
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtistInfoResponse {
    artist: Option<WireArtistDetail>,
}

#[derive(Debug, Deserialize)]
struct WireArtistDetail {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    image: WireImages,
    #[serde(default, deserialize_with = "lenient")]
    tags: WireTagList,
    #[serde(default, deserialize_with = "lenient")]
    bio: Option<WireWiki>,
}

#[derive(Debug, Deserialize)]
struct SimilarTracksResponse {
    #[serde(default, deserialize_with = "lenient")]
    similartracks: WireTrackList,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    #[serde(default, deserialize_with = "lenient")]
    toptracks: WireTrackList,
}

#[derive(Debug, Deserialize)]
struct TagTopTracksResponse {
    #[serde(default, deserialize_with = "lenient")]
    tracks: WireTrackList,
}

#[derive(Debug, Deserialize)]
struct WireSimilarArtist {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireSimilarArtists {
    #[serde(default, deserialize_with = "one_or_many")]
    artist: Vec<WireSimilarArtist>,
}

#[derive(Debug, Deserialize)]
struct SimilarArtistsResponse {
    #[serde(default, deserialize_with = "lenient")]
    similarartists: WireSimilarArtists,
}

#[derive(Debug, Deserialize)]
struct TopTagsResponse {
    #[serde(default, deserialize_with = "lenient")]
    toptags: WireTagList,
}

#[derive(Debug, Default, Deserialize)]
struct WireSearchResults {
    #[serde(default, deserialize_with = "lenient")]
    trackmatches: WireTrackList,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, deserialize_with = "lenient")]
    results: WireSearchResults,
}
