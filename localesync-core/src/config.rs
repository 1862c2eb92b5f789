//! Per-invocation configuration: which locales exist and where they live.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::ArrayPolicy;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2,3}([-_][A-Za-z0-9]{2,8})*$").expect("valid tag regex"));

/// Reject anything that is not a plain language tag (`es`, `pt-BR`, `zh_Hant`).
/// Tags become file names, so separators and `..` never get through.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidTag`] when `tag` does not match.
pub fn validate_tag(tag: &str) -> Result<(), ConfigError> {
    if TAG_PATTERN.is_match(tag) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTag(tag.to_string()))
    }
}

/// Errors raised when locale configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("canonical locale tag must not be empty")]
    EmptyCanonical,
    #[error("canonical locale '{0}' must not also be listed as a target")]
    CanonicalIsTarget(String),
    #[error("target locale '{0}' is listed more than once")]
    DuplicateTarget(String),
    #[error("'{0}' is not a valid locale tag")]
    InvalidTag(String),
    #[error("cannot read config {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    #[serde(default = "LocaleConfig::default_canonical")]
    pub canonical: String,
    #[serde(default = "LocaleConfig::default_targets")]
    pub targets: Vec<String>,
    #[serde(default = "LocaleConfig::default_storage_root")]
    pub storage_root: PathBuf,
    #[serde(default)]
    pub array_policy: ArrayPolicy,
}

impl LocaleConfig {
    fn default_canonical() -> String {
        "en".to_string()
    }

    fn default_targets() -> Vec<String> {
        ["es", "fr", "de", "zh", "hi", "ja", "ko"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn default_storage_root() -> PathBuf {
        PathBuf::from("messages")
    }

    #[must_use]
    pub fn new(
        canonical: impl Into<String>,
        targets: Vec<String>,
        storage_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            canonical: canonical.into(),
            targets,
            storage_root: storage_root.into(),
            array_policy: ArrayPolicy::default(),
        }
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unreadable`] for malformed JSON and any
    /// validation error from [`LocaleConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Unreadable {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A relative `storage_root` is resolved against the
    /// file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unreadable`] when the file cannot be read or
    /// parsed, or a validation error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_json(&text).map_err(|err| match err {
            ConfigError::Unreadable { reason, .. } => ConfigError::Unreadable {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;
        if config.storage_root.is_relative()
            && let Some(base) = path.parent()
        {
            config.storage_root = base.join(&config.storage_root);
        }
        Ok(config)
    }

    /// Check the invariants every operation relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canonical.trim().is_empty() {
            return Err(ConfigError::EmptyCanonical);
        }
        validate_tag(&self.canonical)?;
        let mut seen = HashSet::new();
        for tag in &self.targets {
            validate_tag(tag)?;
            if tag == &self.canonical {
                return Err(ConfigError::CanonicalIsTarget(tag.clone()));
            }
            if !seen.insert(tag.as_str()) {
                return Err(ConfigError::DuplicateTarget(tag.clone()));
            }
        }
        Ok(())
    }

    /// Canonical first, then targets in configured order.
    pub fn all_tags(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str()).chain(self.targets.iter().map(String::as_str))
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            canonical: Self::default_canonical(),
            targets: Self::default_targets(),
            storage_root: Self::default_storage_root(),
            array_policy: ArrayPolicy::default(),
        }
    }
}
