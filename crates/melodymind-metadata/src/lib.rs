// SPDX-License-Identifier: GPL-3.0-or-later
pub mod artwork;
pub mod genre_art;
pub mod lastfm;
pub mod provider;

pub use artwork::{ArtworkError, ArtworkProvider, ArtworkResolver, ArtworkResult};
pub use genre_art::{placeholder_for_tags, DEFAULT_PLACEHOLDER_URL};
pub use lastfm::{LastFmClient, LastFmError};
pub use provider::MetadataProvider;
