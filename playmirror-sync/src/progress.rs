//! Resume state for interrupted runs.
//!
//! Persists a [`SyncProgress`] JSON document at
//! `<home>/.playmirror/progress.json`. Writes use the atomic `.tmp` + rename
//! pattern; a run that finishes every playlist rewrites it empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use playmirror_core::{config, PlaylistId};

use crate::error::{io_err, SyncError};

/// Completed playlists of the current run: id → 1-based listing position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncProgress {
    pub updated_at: DateTime<Utc>,
    pub playlists: BTreeMap<String, u32>,
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self {
            updated_at: Utc::now(),
            playlists: BTreeMap::new(),
        }
    }
}

impl SyncProgress {
    pub fn is_done(&self, playlist: &PlaylistId) -> bool {
        self.playlists.contains_key(&playlist.0)
    }

    pub fn position(&self, playlist: &PlaylistId) -> Option<u32> {
        self.playlists.get(&playlist.0).copied()
    }

    pub fn record(&mut self, playlist: &PlaylistId, position: u32) {
        self.playlists.insert(playlist.0.clone(), position);
        self.updated_at = Utc::now();
    }

    pub fn clear(&mut self) {
        self.playlists.clear();
        self.updated_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProgressCompat {
    Structured(StructuredCompat),
    Legacy(BTreeMap<String, u32>),
}

#[derive(Debug, Deserialize)]
struct StructuredCompat {
    updated_at: Option<DateTime<Utc>>,
    playlists: BTreeMap<String, u32>,
}

/// `<home>/.playmirror/progress.json`
pub fn path_at(home: &Path) -> PathBuf {
    config::root_at(home).join("progress.json")
}

pub fn default_path() -> Result<PathBuf, SyncError> {
    let home = dirs::home_dir().ok_or(SyncError::HomeNotFound)?;
    Ok(path_at(&home))
}

/// Load progress from `path`; a missing file is empty progress.
pub fn load(path: &Path) -> Result<SyncProgress, SyncError> {
    if !path.exists() {
        return Ok(SyncProgress::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(SyncProgress::default());
    }
    match serde_json::from_str::<ProgressCompat>(&contents)? {
        ProgressCompat::Structured(p) => Ok(SyncProgress {
            updated_at: p.updated_at.unwrap_or_else(Utc::now),
            playlists: p.playlists,
        }),
        ProgressCompat::Legacy(playlists) => Ok(SyncProgress {
            updated_at: Utc::now(),
            playlists,
        }),
    }
}

/// Save progress to `path` atomically.
pub fn save(path: &Path, progress: &SyncProgress) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid progress path"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(progress)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
