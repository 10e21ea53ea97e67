// SPDX-License-Identifier: GPL-3.0-or-later
use melodymind_config::ArtworkConfig;
use melodymind_domain::{normalize_name, pick_image};
use moka::sync::Cache;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{self, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::lastfm::{LastFmClient, LastFmError};

const ITUNES_API_BASE: &str = "https://itunes.apple.com";
const WIKIPEDIA_API_BASE: &str = "https://en.wikipedia.org/api/rest_v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkProvider {
    LastFm,
    Itunes,
    Wikipedia,
}

impl ArtworkProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastFm => "lastfm",
            Self::Itunes => "itunes",
            Self::Wikipedia => "wikipedia",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkResult {
    pub image_url: String,
    pub provider: ArtworkProvider,
}

/// Cover art lookup across Last.fm, iTunes and Wikipedia, in that order.
pub struct ArtworkResolver {
    lastfm_client: Option<Arc<LastFmClient>>,
    itunes_client: ItunesClient,
    wikipedia_client: WikipediaClient,
    image_size_preference: Vec<String>,
    cache: Cache<String, ArtworkResult>,
}

impl ArtworkResolver {
    pub fn from_config(config: &ArtworkConfig, lastfm_client: Option<Arc<LastFmClient>>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|error| {
                debug!(target: "artwork", ?error, "falling back to default HTTP client");
                Client::new()
            });

        Self {
            lastfm_client,
            itunes_client: ItunesClient::new(
                client.clone(),
                config.itunes_base_url.clone(),
                config.itunes_regions.clone(),
            ),
            wikipedia_client: WikipediaClient::new(client, config.wikipedia_base_url.clone()),
            image_size_preference: config.image_size_preference.clone(),
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(3_600))
                .build(),
        }
    }

    /// Returns the first artwork URL any provider yields for the artist, or
    /// for the track when one is given.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        artist: &str,
        track: Option<&str>,
    ) -> Result<ArtworkResult, ArtworkError> {
        let cache_key = format!(
            "{}\u{1f}{}",
            normalize_name(artist),
            track.map(normalize_name).unwrap_or_default()
        );
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let mut provider_errors = Vec::new();
        let mut provider_attempts = 0usize;

        for provider in [
            ArtworkProvider::LastFm,
            ArtworkProvider::Itunes,
            ArtworkProvider::Wikipedia,
        ] {
            let outcome = match provider {
                ArtworkProvider::LastFm => {
                    let Some(client) = self.lastfm_client.as_ref() else {
                        continue;
                    };
                    provider_attempts += 1;
                    self.lastfm_image(client, artist, track)
                        .await
                        .map_err(|error| error.to_string())
                }
                ArtworkProvider::Itunes => {
                    provider_attempts += 1;
                    self.itunes_client
                        .artwork(artist, track)
                        .await
                        .map_err(|error| error.to_string())
                }
                ArtworkProvider::Wikipedia => {
                    if track.is_some() {
                        continue;
                    }
                    provider_attempts += 1;
                    self.wikipedia_client
                        .thumbnail(artist)
                        .await
                        .map_err(|error| error.to_string())
                }
            };

            match outcome {
                Ok(Some(image_url)) => {
                    let result = ArtworkResult {
                        image_url,
                        provider,
                    };
                    self.cache.insert(cache_key, result.clone());
                    return Ok(result);
                }
                Ok(None) => {
                    debug!(
                        target: "artwork",
                        provider = provider.as_str(),
                        "no artwork returned from provider"
                    );
                }
                Err(message) => {
                    warn!(
                        target: "artwork",
                        provider = provider.as_str(),
                        error = %message,
                        "provider failed"
                    );
                    provider_errors.push(ProviderError { provider, message });
                }
            }
        }

        if provider_attempts > 0 && provider_errors.len() == provider_attempts {
            return Err(ArtworkError::ProvidersFailed(provider_errors));
        }

        Err(ArtworkError::NoArtworkFound)
    }

    async fn lastfm_image(
        &self,
        client: &LastFmClient,
        artist: &str,
        track: Option<&str>,
    ) -> Result<Option<String>, LastFmError> {
        let images = match track {
            Some(track) => client.track_info(track, artist).await?.images,
            None => client.artist_info(artist).await?.images,
        };
        Ok(pick_image(&images, &self.image_size_preference).map(str::to_string))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub provider: ArtworkProvider,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("All artwork providers failed")]
    ProvidersFailed(Vec<ProviderError>),
    #[error("No artwork found from configured providers")]
    NoArtworkFound,
}

#[derive(Debug, Error)]
enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
    #[error("invalid base URL {0}")]
    InvalidBaseUrl(String),
}

fn parse_json_body(status: StatusCode, response_body: &str) -> Result<Value, LookupError> {
    if !status.is_success() {
        return Err(LookupError::HttpStatus {
            status,
            body: response_body.to_string(),
        });
    }
    Ok(serde_json::from_str(response_body)?)
}

// ============================================================================
// iTunes Search
// ============================================================================

#[derive(Debug)]
struct ItunesClient {
    client: Client,
    base_url: String,
    regions: Vec<String>,
}

impl ItunesClient {
    fn new(client: Client, base_url: Option<String>, regions: Vec<String>) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| ITUNES_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            regions,
        }
    }

    /// Walks the region storefronts until one returns artwork. Fails only when
    /// every region failed.
    async fn artwork(
        &self,
        artist: &str,
        track: Option<&str>,
    ) -> Result<Option<String>, LookupError> {
        let (term, entity) = match track {
            Some(track) => (format!("{artist} {track}"), "song"),
            None => (artist.to_string(), "album"),
        };

        let mut last_error = None;
        let mut failures = 0usize;
        for region in &self.regions {
            match self.search(&term, entity, region).await {
                Ok(Some(url)) => return Ok(Some(url)),
                Ok(None) => {
                    debug!(target: "artwork", region = %region, "no iTunes match in region");
                }
                Err(error) => {
                    debug!(
                        target: "artwork",
                        region = %region,
                        error = %error,
                        "iTunes region lookup failed"
                    );
                    failures += 1;
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) if failures == self.regions.len() => Err(error),
            _ => Ok(None),
        }
    }

    async fn search(
        &self,
        term: &str,
        entity: &str,
        region: &str,
    ) -> Result<Option<String>, LookupError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("term", term),
                ("media", "music"),
                ("entity", entity),
                ("country", region),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let payload: ItunesResponse = serde_json::from_value(parse_json_body(status, &body)?)?;

        Ok(payload
            .results
            .into_iter()
            .find_map(|result| result.artwork_url_100)
            .filter(|url| !url.trim().is_empty())
            .map(|url| upscale_itunes_artwork(&url)))
    }
}

/// iTunes serves 100px thumbnails; the same path at 600px is the full cover.
pub fn upscale_itunes_artwork(url: &str) -> String {
    url.replace("100x100bb", "600x600bb")
}

#[derive(Debug, Deserialize)]
struct ItunesResponse {
    #[serde(default)]
    results: Vec<ItunesResult>,
}

#[derive(Debug, Deserialize)]
struct ItunesResult {
    #[serde(rename = "artworkUrl100", default)]
    artwork_url_100: Option<String>,
}

// ============================================================================
// Wikipedia page summary
// ============================================================================

#[derive(Debug)]
struct WikipediaClient {
    client: Client,
    base_url: String,
}

impl WikipediaClient {
    fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| WIKIPEDIA_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn summary_url(&self, title: &str) -> Result<Url, LookupError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|_| LookupError::InvalidBaseUrl(self.base_url.clone()))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["page", "summary", title]);
        Ok(url)
    }

    async fn thumbnail(&self, artist: &str) -> Result<Option<String>, LookupError> {
        let title = artist.trim().replace(' ', "_");
        if title.is_empty() {
            return Ok(None);
        }
        let url = self.summary_url(&title)?;
        debug!(target: "artwork", url = %url, "fetching Wikipedia page summary");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        // A missing page is an empty answer, not a provider failure.
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        let payload: WikipediaSummary = serde_json::from_value(parse_json_body(status, &body)?)?;

        Ok(payload
            .thumbnail
            .or(payload.originalimage)
            .map(|image| image.source)
            .filter(|source| !source.trim().is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct WikipediaSummary {
    #[serde(default)]
    thumbnail: Option<WikipediaImage>,
    #[serde(default)]
    originalimage: Option<WikipediaImage>,
}

#[derive(Debug, Deserialize)]
struct WikipediaImage {
    source: String,
}
