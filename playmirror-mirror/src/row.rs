//! Typed rows written to and read from the mirror.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use playmirror_core::{
    MirrorRecord, PlaylistId, PlaylistInfo, RecordKey, RemoteTrack, RowId, Status, TrackId,
};

/// The complete field set of a track row. Every upsert writes all of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    pub track_id: TrackId,
    pub playlist_id: PlaylistId,
    pub playlist_name: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub artwork_url: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub link: String,
    pub status: Status,
    pub synced_at: DateTime<FixedOffset>,
}

impl TrackRow {
    pub fn from_track(
        track: &RemoteTrack,
        playlist: &PlaylistInfo,
        status: Status,
        synced_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            track_id: track.id.clone(),
            playlist_id: playlist.id.clone(),
            playlist_name: playlist.name.clone(),
            name: track.name.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            artwork_url: track.artwork_url.clone(),
            published_at: track.published_at,
            link: track.link.clone(),
            status,
            synced_at,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.track_id.clone(), self.playlist_id.clone())
    }

    /// The record a reader would see after this row is stored as `row_id`.
    pub fn to_record(&self, row_id: RowId) -> MirrorRecord {
        MirrorRecord {
            row_id,
            track_id: self.track_id.clone(),
            playlist_id: self.playlist_id.clone(),
            playlist_name: self.playlist_name.clone(),
            name: self.name.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            artwork_url: self.artwork_url.clone(),
            status: self.status,
            last_synced: Some(self.synced_at),
        }
    }
}

/// The row standing for a playlist itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRow {
    pub playlist_id: PlaylistId,
    pub name: String,
    pub creator: String,
    pub track_count: u64,
    pub cover_url: String,
    pub synced_at: DateTime<FixedOffset>,
}

impl BucketRow {
    pub fn from_info(info: &PlaylistInfo, synced_at: DateTime<FixedOffset>) -> Self {
        Self {
            playlist_id: info.id.clone(),
            name: info.name.clone(),
            creator: info.creator.clone(),
            track_count: info.track_count,
            cover_url: info.cover_url.clone(),
            synced_at,
        }
    }
}

/// Everything read from the mirror in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSnapshot {
    pub records: Vec<MirrorRecord>,
    pub buckets: HashSet<PlaylistId>,
    /// Rows that were neither a track record nor a playlist bucket.
    pub skipped: usize,
}

impl MirrorSnapshot {
    pub fn has_bucket(&self, playlist: &PlaylistId) -> bool {
        self.buckets.contains(playlist)
    }
}
