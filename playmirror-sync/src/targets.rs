//! Which playlists a run covers.

use std::path::Path;

use playmirror_core::PlaylistId;

use crate::error::{io_err, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// Every playlist listed for this user id.
    User(String),
    /// Explicit playlist ids, in order.
    Playlists(Vec<PlaylistId>),
}

/// One id per line; blank lines and `#` comments are ignored, as is
/// anything after the first whitespace on a line.
pub fn parse_playlist_list(contents: &str) -> Vec<PlaylistId> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter_map(|line| line.split_whitespace().next())
        .map(PlaylistId::from)
        .collect()
}

pub fn read_playlist_file(path: &Path) -> Result<Vec<PlaylistId>, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let ids = parse_playlist_list(&contents);
    tracing::debug!("read {} playlist ids from {}", ids.len(), path.display());
    Ok(ids)
}
