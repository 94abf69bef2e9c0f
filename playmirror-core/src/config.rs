//! Tunable settings, loaded from an optional YAML file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.playmirror/
//!   config.yaml     (optional; every key has a default)
//!   progress.json   (see playmirror-sync::progress)
//! ```
//!
//! Like the progress store, loading has two forms: `load_at(home)` for an
//! explicit home directory (tests use a `TempDir`) and `load()` which derives
//! it from `dirs::home_dir()`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which differences between a remote track and its mirror record trigger
/// an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePredicate {
    /// Only a change of the derived status.
    #[default]
    StatusOnly,
    /// Status, name, artist or album.
    StatusAndMetadata,
}

/// How a record that left its playlist is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetirePolicy {
    /// Always mark `Removed`.
    #[default]
    Remove,
    /// Ask the source whether the track still exists in the catalog:
    /// `Unlinked` if it does, `Unavailable` if it does not.
    CatalogCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_secs: 5,
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub base_url: String,
    /// Tracks requested per page; the API caps it.
    pub page_size: u32,
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://music.163.com".to_string(),
            page_size: 500,
            page_delay_ms: 500,
            timeout_secs: 30,
        }
    }
}

impl SourceSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    pub base_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.notion.com".to_string(),
            api_version: "2022-06-28".to_string(),
            timeout_secs: 30,
        }
    }
}

impl MirrorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub update_predicate: UpdatePredicate,
    pub retire_policy: RetirePolicy,
    /// Offset applied to every timestamp written to the mirror.
    pub utc_offset_hours: i32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            update_predicate: UpdatePredicate::default(),
            retire_policy: RetirePolicy::default(),
            utc_offset_hours: 8,
        }
    }
}

impl ReconcileSettings {
    /// The configured offset; out-of-range hours fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub retry: RetrySettings,
    pub source: SourceSettings,
    pub mirror: MirrorSettings,
    pub sync: ReconcileSettings,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.playmirror/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".playmirror")
}

/// `<home>/.playmirror/config.yaml`
pub fn settings_path_at(home: &Path) -> PathBuf {
    root_at(home).join("config.yaml")
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

impl Settings {
    /// Load settings from an explicit file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `<home>/.playmirror/config.yaml`.
    pub fn load_at(home: &Path) -> Result<Self, ConfigError> {
        Self::load_from(&settings_path_at(home))
    }

    /// `load_at` convenience wrapper.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&home()?)
    }
}
