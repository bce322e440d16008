//! Images and files sub-contexts
//!
//! Both are derived once from the configured storage map and shared,
//! unchanged, by every context the factory produces. They only know how
//! to address stored assets; reading and writing bytes belongs to the
//! storage adapters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::ContextSettings;
use crate::core::error::ContextError;

/// Kind of asset a storage holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Image,
    File,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::Image => f.write_str("image"),
            AssetType::File => f.write_str("file"),
        }
    }
}

/// Configuration of one named asset storage
///
/// Assets are addressed under the storage's public `base_url`; how the
/// bytes get there is up to the storage adapters.
///
/// ```yaml
/// storage:
///   avatars:
///     type: image
///     base_url: https://cdn.example.com/images
///   documents:
///     type: file
///     base_url: /files/
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub base_url: String,
}

impl StorageConfig {
    pub fn new(asset_type: AssetType, base_url: impl Into<String>) -> Self {
        Self {
            asset_type,
            base_url: base_url.into(),
        }
    }

    /// Public URL of a stored object
    pub fn url(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), filename)
    }
}

/// Storages of one asset type, addressed by name
#[derive(Debug, Clone)]
struct AssetStorages {
    asset_type: AssetType,
    storages: BTreeMap<String, StorageConfig>,
}

impl AssetStorages {
    fn from_settings(settings: &ContextSettings, asset_type: AssetType) -> Self {
        let storages = settings
            .storage
            .iter()
            .filter(|(_, config)| config.asset_type == asset_type)
            .map(|(name, config)| (name.clone(), config.clone()))
            .collect();
        Self {
            asset_type,
            storages,
        }
    }

    fn get(&self, storage: &str) -> Result<&StorageConfig, ContextError> {
        self.storages
            .get(storage)
            .ok_or_else(|| ContextError::UnknownStorage {
                asset_type: self.asset_type,
                storage: storage.to_string(),
            })
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.storages.keys().map(String::as_str)
    }
}

/// Image addressing for every image storage
#[derive(Debug, Clone)]
pub struct ImagesContext {
    storages: AssetStorages,
}

impl ImagesContext {
    pub fn from_settings(settings: &ContextSettings) -> Self {
        Self {
            storages: AssetStorages::from_settings(settings, AssetType::Image),
        }
    }

    /// URL of image `id` with `extension` in `storage`
    pub fn get_url(
        &self,
        storage: &str,
        id: &str,
        extension: &str,
    ) -> Result<String, ContextError> {
        let config = self.storages.get(storage)?;
        Ok(config.url(&format!("{id}.{extension}")))
    }

    pub fn storage_names(&self) -> impl Iterator<Item = &str> {
        self.storages.names()
    }
}

/// File addressing for every file storage
#[derive(Debug, Clone)]
pub struct FilesContext {
    storages: AssetStorages,
}

impl FilesContext {
    pub fn from_settings(settings: &ContextSettings) -> Self {
        Self {
            storages: AssetStorages::from_settings(settings, AssetType::File),
        }
    }

    /// URL of `filename` in `storage`
    pub fn get_url(&self, storage: &str, filename: &str) -> Result<String, ContextError> {
        let config = self.storages.get(storage)?;
        Ok(config.url(filename))
    }

    pub fn storage_names(&self) -> impl Iterator<Item = &str> {
        self.storages.names()
    }
}
