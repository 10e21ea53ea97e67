// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Location of the pre-trained model artifact. Without it the model-based
/// pipeline is disabled.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelConfig {
    pub artifact_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Extra attempts after a failed call. Retries are immediate.
    pub max_retries: u32,
    pub max_concurrent_requests: usize,
    pub cache_capacity: u64,
    pub cache_ttl_secs: u64,
    /// Multiplier applied to list limits sent upstream, so entries dropped for
    /// missing fields still leave `limit` usable items.
    pub request_headroom_factor: usize,
}

impl Default for LastFmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_secs: 10,
            max_retries: 1,
            max_concurrent_requests: 4,
            cache_capacity: 10_000,
            cache_ttl_secs: 3_600,
            request_headroom_factor: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtworkConfig {
    pub itunes_base_url: Option<String>,
    pub itunes_regions: Vec<String>,
    pub wikipedia_base_url: Option<String>,
    pub image_size_preference: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            itunes_base_url: None,
            itunes_regions: ["US", "GB", "IN", "NP"].map(String::from).to_vec(),
            wikipedia_base_url: None,
            image_size_preference: ["extralarge", "large", "medium"]
                .map(String::from)
                .to_vec(),
            timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataConfig {
    pub lastfm: LastFmConfig,
    pub artwork: ArtworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    pub similar_artists_for_track: usize,
    pub similar_artists_for_artist: usize,
    pub tracks_per_similar_artist: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            similar_artists_for_track: 2,
            similar_artists_for_artist: 3,
            tracks_per_similar_artist: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderConfig {
    pub oversample_factor: usize,
    pub default_count: usize,
    pub max_count: usize,
    /// Source labels in merge priority order, highest first.
    pub source_priority: Vec<String>,
    pub expansion: ExpansionConfig,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            oversample_factor: 2,
            default_count: 10,
            max_count: 25,
            source_priority: ["collab", "primary", "content", "expansion"]
                .map(String::from)
                .to_vec(),
            expansion: ExpansionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
    pub model: ModelConfig,
    pub metadata: MetadataConfig,
    pub recommender: RecommenderConfig,
}

/// Legacy variable honoured for the Last.fm key when the prefixed one is unset.
pub const LEGACY_LASTFM_KEY_VAR: &str = "LASTFM_API_KEY";

/// Load configuration from defaults, an optional TOML file and `MELODYMIND_`
/// environment overrides.
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment
        .merge(
            Env::raw()
                .only(&[LEGACY_LASTFM_KEY_VAR])
                .map(|_| "metadata.lastfm.api_key".into()),
        )
        .merge(Env::prefixed("MELODYMIND_").split("__"));

    let config: AppConfig = figment.extract()?;

    if config.metadata.lastfm.api_key.is_none() {
        warn!(target: "config", "no Last.fm API key configured; live discovery is unavailable");
    }
    info!(target: "config", "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.recommender.oversample_factor, 2);
        assert_eq!(config.recommender.expansion.similar_artists_for_track, 2);
        assert_eq!(config.recommender.expansion.similar_artists_for_artist, 3);
        assert_eq!(config.recommender.expansion.tracks_per_similar_artist, 2);
        assert_eq!(config.metadata.lastfm.timeout_secs, 10);
        assert_eq!(config.metadata.lastfm.max_retries, 1);
        assert_eq!(
            config.recommender.source_priority,
            vec!["collab", "primary", "content", "expansion"]
        );
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[recommender]
oversample_factor = 3
max_count = 12

[recommender.expansion]
similar_artists_for_artist = 5

[model]
artifact_path = "/tmp/model.json"
"#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.recommender.oversample_factor, 3);
        assert_eq!(config.recommender.max_count, 12);
        assert_eq!(config.recommender.expansion.similar_artists_for_artist, 5);
        // untouched keys keep their defaults
        assert_eq!(config.recommender.expansion.similar_artists_for_track, 2);
        assert_eq!(config.http.port, 5150);
        assert_eq!(
            config.model.artifact_path,
            Some(PathBuf::from("/tmp/model.json"))
        );
    }
}
