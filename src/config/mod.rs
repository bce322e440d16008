//! Configuration loading and management

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::assets::StorageConfig;
use crate::core::session::SessionStrategy;

/// Feature flags for unstable context surface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentalConfig {
    /// Expose the raw entity definitions as `context.experimental()`
    #[serde(default)]
    pub context_initialised_lists: bool,
}

/// Serializable part of the context configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Named asset storages (images and files)
    #[serde(default)]
    pub storage: BTreeMap<String, StorageConfig>,

    #[serde(default)]
    pub experimental: ExperimentalConfig,
}

impl ContextSettings {
    /// Load settings from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        Ok(settings)
    }
}

/// Global configuration handed to the context factory
///
/// Settings come from YAML; the session strategy is code and is attached
/// with [`ContextConfig::with_session_strategy`].
#[derive(Clone, Default)]
pub struct ContextConfig {
    pub settings: ContextSettings,
    pub session: Option<Arc<dyn SessionStrategy>>,
}

impl ContextConfig {
    pub fn new(settings: ContextSettings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    /// Load the settings part from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        Ok(Self::new(ContextSettings::from_yaml_file(path)?))
    }

    /// Load the settings part from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(Self::new(ContextSettings::from_yaml_str(yaml)?))
    }

    pub fn with_session_strategy(mut self, strategy: Arc<dyn SessionStrategy>) -> Self {
        self.session = Some(strategy);
        self
    }
}

impl fmt::Debug for ContextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextConfig")
            .field("settings", &self.settings)
            .field("session", &self.session.is_some())
            .finish()
    }
}
