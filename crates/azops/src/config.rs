//! YAML configuration file.
//!
//! Every section is optional; CLI flags override file values.
//!
//! ```yaml
//! subscriptions:
//!   - 00000000-0000-0000-0000-000000000000
//! cleanup:
//!   patterns: ["proj-*", "tmp-*"]
//!   inactivityDays: 30
//! rotation:
//!   secretLength: 48
//!   bindings:
//!     - subscriptionId: 00000000-0000-0000-0000-000000000000
//!       resourceGroup: rg-web
//!       webApp: api
//!       setting: DB_PASSWORD
//!       mode: reference
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::cleanup::{DEFAULT_CLEANUP_TAG, DEFAULT_CREATION_TAGS, DEFAULT_UNSAFE_TYPES};
use crate::errors::ConfigError;
use crate::rotation::{SecretBinding, DEFAULT_SECRET_LENGTH};

fn default_inactivity_days() -> u32 {
    30
}

fn default_unsafe_types() -> Vec<String> {
    DEFAULT_UNSAFE_TYPES.iter().map(|s| (*s).to_string()).collect()
}

fn default_tag_name() -> String {
    DEFAULT_CLEANUP_TAG.to_string()
}

fn default_creation_tags() -> Vec<String> {
    DEFAULT_CREATION_TAGS.iter().map(|s| (*s).to_string()).collect()
}

fn default_secret_length() -> usize {
    DEFAULT_SECRET_LENGTH
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzopsConfig {
    /// Subscriptions used when none are given on the command line.
    #[serde(default)]
    pub subscriptions: Vec<String>,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Resource group cleanup settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupConfig {
    /// Name globs selecting candidate groups.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default = "default_inactivity_days")]
    pub inactivity_days: u32,
    /// Resource types that block deletion.
    #[serde(default = "default_unsafe_types")]
    pub unsafe_types: Vec<String>,
    /// Tag merged into groups marked for cleanup.
    #[serde(default = "default_tag_name")]
    pub tag_name: String,
    /// Group tags holding a creation date, in lookup order.
    #[serde(default = "default_creation_tags")]
    pub creation_tags: Vec<String>,
    /// Report path.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            inactivity_days: default_inactivity_days(),
            unsafe_types: default_unsafe_types(),
            tag_name: default_tag_name(),
            creation_tags: default_creation_tags(),
            output: None,
        }
    }
}

impl CleanupConfig {
    /// Check values before a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "cleanup requires at least one resource group name pattern",
            ));
        }
        if self.tag_name.trim().is_empty() {
            return Err(ConfigError::invalid("cleanup tag name must not be empty"));
        }
        Ok(())
    }
}

/// Secret rotation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationConfig {
    #[serde(default = "default_secret_length")]
    pub secret_length: usize,
    /// Web app settings updated after rotation.
    #[serde(default)]
    pub bindings: Vec<SecretBinding>,
    #[serde(default)]
    pub restart_apps: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            secret_length: default_secret_length(),
            bindings: Vec::new(),
            restart_apps: false,
        }
    }
}

/// Access policy audit settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// Report path.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl AzopsConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !fs::try_exists(path).await? {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        debug!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path).await?;
        Self::from_yaml(path, &contents)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    /// Structural checks that hold for every command. Cleanup-specific checks
    /// live in [`CleanupConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(sub) = self.subscriptions.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::invalid(format!(
                "empty subscription id in subscriptions list: '{sub}'"
            )));
        }
        for binding in &self.rotation.bindings {
            if binding.setting.trim().is_empty() || binding.web_app.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "rotation binding for '{}' needs both webApp and setting",
                    binding.web_app
                )));
            }
        }
        Ok(())
    }
}

/// Split a comma separated subscription list, dropping blanks.
#[must_use]
pub fn parse_subscription_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
