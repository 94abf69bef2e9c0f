//! Domain types shared by the source reader, the mirror store and the
//! reconciler.
//!
//! Identifiers are string newtypes; the mirror's own row identifier is kept
//! apart from the natural `(track, playlist)` key so it can never be mistaken
//! for it.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a track in the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of a remote playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaylistId(pub String);

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PlaylistId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PlaylistId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque row identifier assigned by the mirror store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(pub String);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Natural key of a mirror record: one record per track per playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub track_id: TrackId,
    pub playlist_id: PlaylistId,
}

impl RecordKey {
    pub fn new(track_id: TrackId, playlist_id: PlaylistId) -> Self {
        Self {
            track_id,
            playlist_id,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.track_id, self.playlist_id)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Availability status of a mirrored track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Available,
    VipRestricted,
    NoLicense,
    Removed,
    Unavailable,
    /// Dropped from the playlist while still present in the catalog.
    Unlinked,
    #[default]
    Unknown,
}

impl Status {
    /// Every status, in select-option order.
    pub fn all() -> &'static [Status] {
        &[
            Status::Available,
            Status::VipRestricted,
            Status::NoLicense,
            Status::Removed,
            Status::Unavailable,
            Status::Unlinked,
            Status::Unknown,
        ]
    }

    /// Derive a status from the source's fee code. Total over `i64`.
    pub fn from_fee(fee: i64) -> Self {
        match fee {
            0 => Status::NoLicense,
            1 => Status::VipRestricted,
            8 => Status::Available,
            _ => Status::Unknown,
        }
    }

    /// Name of the select option stored in the mirror.
    pub fn display_name(self) -> &'static str {
        match self {
            Status::Available => "Available",
            Status::VipRestricted => "VIP",
            Status::NoLicense => "No License",
            Status::Removed => "Removed",
            Status::Unavailable => "Unavailable",
            Status::Unlinked => "Unlinked",
            Status::Unknown => "Unknown",
        }
    }

    /// Select-option color in the mirror palette.
    pub fn color(self) -> &'static str {
        match self {
            Status::Available => "green",
            Status::VipRestricted => "purple",
            Status::NoLicense => "yellow",
            Status::Removed => "red",
            Status::Unavailable => "brown",
            Status::Unlinked => "orange",
            Status::Unknown => "gray",
        }
    }

    /// Parse a stored option name. Unrecognized names map to `Unknown`.
    pub fn from_display_name(name: &str) -> Self {
        Status::all()
            .iter()
            .copied()
            .find(|s| s.display_name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Status::Unknown)
    }

    /// Statuses written by a retire; a retired record keeps its timestamp.
    pub fn is_retired(self) -> bool {
        matches!(
            self,
            Status::Removed | Status::Unavailable | Status::Unlinked
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A track as listed by the source, fetched fresh on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: TrackId,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub artwork_url: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub fee: i64,
    /// Canonical public URL of the track.
    pub link: String,
}

impl RemoteTrack {
    pub fn status(&self) -> Status {
        Status::from_fee(self.fee)
    }
}

/// A row of the mirror store describing one track in one playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRecord {
    pub row_id: RowId,
    pub track_id: TrackId,
    pub playlist_id: PlaylistId,
    pub playlist_name: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub artwork_url: String,
    pub status: Status,
    pub last_synced: Option<DateTime<FixedOffset>>,
}

impl MirrorRecord {
    pub const UNKNOWN_NAME: &'static str = "Unknown track";
    pub const UNKNOWN_ARTIST: &'static str = "Unknown artist";
    pub const UNKNOWN_ALBUM: &'static str = "Unknown album";

    /// A record carrying the documented defaults for every optional field.
    pub fn with_defaults(row_id: RowId, track_id: TrackId, playlist_id: PlaylistId) -> Self {
        Self {
            row_id,
            track_id,
            playlist_id,
            playlist_name: String::new(),
            name: Self::UNKNOWN_NAME.to_string(),
            artist: Self::UNKNOWN_ARTIST.to_string(),
            album: Self::UNKNOWN_ALBUM.to_string(),
            artwork_url: String::new(),
            status: Status::Unknown,
            last_synced: None,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.track_id.clone(), self.playlist_id.clone())
    }
}

/// Metadata of a remote playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistInfo {
    pub id: PlaylistId,
    pub name: String,
    pub track_count: u64,
    pub creator: String,
    pub cover_url: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
