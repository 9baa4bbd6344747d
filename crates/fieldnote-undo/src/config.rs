#![forbid(unsafe_code)]

//! Tunables for [`ActionManager`](crate::ActionManager).
//!
//! With the `config` feature, [`ManagerConfig`] loads from TOML or JSON:
//!
//! ```toml
//! # fieldnote-undo.toml
//! max_tasks = 200
//! refresh_threshold = 25
//! keep_empty_tasks = false
//! create_mark_if_needed = false
//! ```
//!
//! Missing keys fall back to [`ManagerConfig::default`].

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Configuration for the action manager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ManagerConfig {
    /// Maximum number of tasks kept in undo history.
    pub max_tasks: usize,
    /// Data-change actions a task may hold before traversals suppress
    /// per-action notifications and report `Refresh`.
    pub refresh_threshold: usize,
    /// Keep tasks that completed without any action.
    pub keep_empty_tasks: bool,
    /// Register a mark when a fresh outer task begins and none exists.
    pub create_mark_if_needed: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_tasks: usize::MAX,
            refresh_threshold: 0,
            keep_empty_tasks: false,
            create_mark_if_needed: false,
        }
    }
}

impl ManagerConfig {
    /// Create a configuration with a history depth limit.
    #[must_use]
    pub fn new(max_tasks: usize) -> Self {
        Self {
            max_tasks,
            ..Self::default()
        }
    }

    /// Unbounded history (the default).
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Set the refresh threshold.
    #[must_use]
    pub fn with_refresh_threshold(mut self, threshold: usize) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    /// Keep tasks that completed without any action.
    #[must_use]
    pub fn with_keep_empty_tasks(mut self, keep: bool) -> Self {
        self.keep_empty_tasks = keep;
        self
    }

    /// Register a mark automatically when a fresh outer task begins.
    #[must_use]
    pub fn with_create_mark_if_needed(mut self, create: bool) -> Self {
        self.create_mark_if_needed = create;
        self
    }

    /// Validate parameters.
    ///
    /// Returns a list of validation errors; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_tasks == 0 {
            errors.push("max_tasks must be > 0".into());
        }
        errors
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.checked()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.checked()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    #[cfg(feature = "config")]
    fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a configuration.
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// Validation errors.
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
