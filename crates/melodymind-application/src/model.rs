// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only access to the pre-trained recommendation model.
//!
//! The artifact bundles the track catalog with its feature vectors, the
//! listener name encoder and a factorized affinity model. It is loaded once
//! at startup and shared behind an `Arc`.

use melodymind_domain::{CatalogIndex, CatalogItem, UserId};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors raised while loading or querying a model artifact
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("User {0} has no entry in the affinity model")]
    UnknownUser(UserId),

    #[error("Catalog index {0} is out of range")]
    IndexOutOfRange(CatalogIndex),
}

pub trait TrainedModelArtifact: Send + Sync {
    fn catalog(&self) -> &[CatalogItem];

    /// Feature rows aligned by catalog index.
    fn feature_matrix(&self) -> Vec<&[f32]> {
        self.catalog()
            .iter()
            .map(|item| item.feature_vector.as_slice())
            .collect()
    }

    fn predict_affinity(
        &self,
        user: UserId,
        indices: &[CatalogIndex],
    ) -> Result<Vec<f32>, ModelError>;

    fn encode_user(&self, display_name: &str) -> Option<UserId>;

    fn decode_user(&self, user: UserId) -> Option<&str>;

    /// All listener display names, sorted.
    fn known_users(&self) -> Vec<String>;
}

#[derive(Debug, Deserialize)]
struct ArtifactDocument {
    catalog: Vec<CatalogItem>,
    users: Vec<String>,
    affinity: AffinityDocument,
}

#[derive(Debug, Deserialize)]
struct AffinityDocument {
    user_index: HashMap<u32, usize>,
    user_factors: Vec<Vec<f32>>,
    user_biases: Vec<f32>,
    item_factors: Vec<Vec<f32>>,
    item_biases: Vec<f32>,
}

/// Matrix-factorization model stored as a JSON document.
///
/// A prediction for internal user row `u` and item `i` is
/// `user_biases[u] + item_biases[i] + dot(user_factors[u], item_factors[i])`.
#[derive(Debug)]
pub struct FactorModelArtifact {
    catalog: Vec<CatalogItem>,
    users: Vec<String>,
    user_ids: HashMap<String, UserId>,
    affinity: AffinityDocument,
}

impl FactorModelArtifact {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        let artifact = Self::from_json(&raw)?;
        info!(
            target: "scoring",
            path = %path.display(),
            tracks = artifact.catalog.len(),
            users = artifact.users.len(),
            "model artifact loaded"
        );
        Ok(artifact)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let document: ArtifactDocument = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    fn from_document(document: ArtifactDocument) -> Result<Self, ModelError> {
        let ArtifactDocument {
            catalog,
            users,
            affinity,
        } = document;

        validate_catalog(&catalog)?;
        validate_affinity(&affinity, catalog.len(), users.len())?;

        let mut user_ids = HashMap::with_capacity(users.len());
        for (position, name) in users.iter().enumerate() {
            let id = u32::try_from(position).map_err(|_| {
                ModelError::InvalidArtifact("too many users for a 32-bit id".to_string())
            })?;
            if user_ids.insert(name.clone(), UserId(id)).is_some() {
                return Err(ModelError::InvalidArtifact(format!(
                    "duplicate user display name '{name}'"
                )));
            }
        }

        Ok(Self {
            catalog,
            users,
            user_ids,
            affinity,
        })
    }
}

fn validate_catalog(catalog: &[CatalogItem]) -> Result<(), ModelError> {
    let Some(first) = catalog.first() else {
        return Ok(());
    };
    let dimensions = first.feature_vector.len();
    if let Some((index, item)) = catalog
        .iter()
        .enumerate()
        .find(|(_, item)| item.feature_vector.len() != dimensions)
    {
        return Err(ModelError::InvalidArtifact(format!(
            "catalog item {index} ('{}') has {} features, expected {dimensions}",
            item.track_name,
            item.feature_vector.len()
        )));
    }
    Ok(())
}

fn validate_affinity(
    affinity: &AffinityDocument,
    catalog_len: usize,
    user_count: usize,
) -> Result<(), ModelError> {
    let invalid = |message: String| Err(ModelError::InvalidArtifact(message));

    if affinity.item_factors.len() != catalog_len || affinity.item_biases.len() != catalog_len {
        return invalid(format!(
            "item factors ({}) and biases ({}) must match the catalog size {catalog_len}",
            affinity.item_factors.len(),
            affinity.item_biases.len()
        ));
    }
    if affinity.user_factors.len() != affinity.user_biases.len() {
        return invalid(format!(
            "user factors ({}) and biases ({}) differ in length",
            affinity.user_factors.len(),
            affinity.user_biases.len()
        ));
    }

    let rank = affinity
        .user_factors
        .first()
        .or_else(|| affinity.item_factors.first())
        .map(Vec::len)
        .unwrap_or(0);
    let ragged = affinity
        .user_factors
        .iter()
        .chain(&affinity.item_factors)
        .any(|row| row.len() != rank);
    if ragged {
        return invalid(format!("factor rows must all have {rank} components"));
    }

    let mut rows_seen = HashSet::new();
    for (&user, &row) in &affinity.user_index {
        if user as usize >= user_count {
            return invalid(format!("affinity user {user} has no display name"));
        }
        if row >= affinity.user_factors.len() {
            return invalid(format!("affinity user {user} maps to missing row {row}"));
        }
        if !rows_seen.insert(row) {
            return invalid(format!("affinity row {row} is mapped more than once"));
        }
    }
    Ok(())
}

impl TrainedModelArtifact for FactorModelArtifact {
    fn catalog(&self) -> &[CatalogItem] {
        &self.catalog
    }

    fn predict_affinity(
        &self,
        user: UserId,
        indices: &[CatalogIndex],
    ) -> Result<Vec<f32>, ModelError> {
        let row = *self
            .affinity
            .user_index
            .get(&user.0)
            .ok_or(ModelError::UnknownUser(user))?;
        let user_factors = &self.affinity.user_factors[row];
        let user_bias = self.affinity.user_biases[row];

        indices
            .iter()
            .map(|&index| {
                let item = index.get();
                let item_factors = self
                    .affinity
                    .item_factors
                    .get(item)
                    .ok_or(ModelError::IndexOutOfRange(index))?;
                let dot: f32 = user_factors
                    .iter()
                    .zip(item_factors)
                    .map(|(u, i)| u * i)
                    .sum();
                Ok(user_bias + self.affinity.item_biases[item] + dot)
            })
            .collect()
    }

    fn encode_user(&self, display_name: &str) -> Option<UserId> {
        self.user_ids.get(display_name).copied()
    }

    fn decode_user(&self, user: UserId) -> Option<&str> {
        self.users.get(user.0 as usize).map(String::as_str)
    }

    fn known_users(&self) -> Vec<String> {
        let mut users = self.users.clone();
        users.sort();
        users
    }
}
