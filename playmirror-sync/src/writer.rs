//! Mirror writer: applies a reconciliation to the store.
//!
//! ## Retire guard
//!
//! 1. Re-read the row. Gone, or now linked to another playlist → skip.
//! 2. Already retired → skip, keeping its last-sync timestamp.
//! 3. Pick the status from the retire policy.
//! 4. Write status + last-sync timestamp only.
//!
//! Every store call goes through the retry policy. A call that still fails
//! becomes an `Error` outcome for that track; the batch carries on.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};

use playmirror_core::{
    MirrorRecord, PlaylistId, PlaylistInfo, RecordKey, RemoteError, RemoteTrack, RetirePolicy,
    RowId, Status, TrackId,
};
use playmirror_mirror::{BucketRow, MirrorSnapshot, MirrorStore, TrackRow};
use playmirror_source::SourceClient;

use crate::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAction {
    Add,
    Update,
    Retire,
    Skip,
    Error,
    /// Dry-run: the track *would* have been added.
    WouldAdd,
    WouldUpdate,
    WouldRetire,
}

impl TrackAction {
    pub fn label(self) -> &'static str {
        match self {
            TrackAction::Add => "add",
            TrackAction::Update => "update",
            TrackAction::Retire => "retire",
            TrackAction::Skip => "skip",
            TrackAction::Error => "error",
            TrackAction::WouldAdd => "would add",
            TrackAction::WouldUpdate => "would update",
            TrackAction::WouldRetire => "would retire",
        }
    }
}

impl fmt::Display for TrackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Report of one add, update or retire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    pub action: TrackAction,
    pub track_id: TrackId,
    pub name: String,
    /// 1-based position within the batch.
    pub position: usize,
    pub total: usize,
    pub status: Status,
    /// Skip reason or error message.
    pub detail: Option<String>,
}

impl fmt::Display for TrackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {}: {} - ID: {}, status: {}",
            self.position, self.total, self.action, self.name, self.track_id, self.status
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

/// Which reconciliation set an upsert comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Add,
    Update,
}

/// Result of making sure a playlist has its bucket row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOutcome {
    Existing,
    Created,
    WouldCreate,
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    pub retry: RetryPolicy,
    /// Offset of every timestamp written.
    pub offset: FixedOffset,
    pub retire_policy: RetirePolicy,
    pub dry_run: bool,
}

pub struct MirrorWriter<'s> {
    store: &'s dyn MirrorStore,
    /// Row id and stored status per key.
    index: HashMap<RecordKey, (RowId, Status)>,
    buckets: HashSet<PlaylistId>,
    options: WriterOptions,
}

impl<'s> MirrorWriter<'s> {
    /// Seed the row index from a snapshot. The first record of a duplicated
    /// key owns it.
    pub fn new(store: &'s dyn MirrorStore, snapshot: &MirrorSnapshot, options: WriterOptions) -> Self {
        let mut index = HashMap::new();
        for record in &snapshot.records {
            index
                .entry(record.key())
                .or_insert_with(|| (record.row_id.clone(), record.status));
        }
        Self {
            store,
            index,
            buckets: snapshot.buckets.clone(),
            options,
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.options.offset)
    }

    /// Create the playlist's bucket row unless the mirror already has one.
    pub fn ensure_playlist_bucket(&mut self, info: &PlaylistInfo) -> Result<BucketOutcome, RemoteError> {
        if self.buckets.contains(&info.id) {
            return Ok(BucketOutcome::Existing);
        }
        if self.options.dry_run {
            tracing::info!("[dry-run] would create playlist row for {} ({})", info.name, info.id);
            return Ok(BucketOutcome::WouldCreate);
        }
        let row = BucketRow::from_info(info, self.now());
        let row_id = self
            .options
            .retry
            .run("create playlist row", || self.store.create_bucket(&row))?;
        tracing::info!("created playlist row {row_id} for {} ({})", info.name, info.id);
        self.buckets.insert(info.id.clone());
        Ok(BucketOutcome::Created)
    }

    /// Write the full field set of `track`, updating its row in place when
    /// one is indexed and creating it otherwise.
    pub fn upsert(
        &mut self,
        track: &RemoteTrack,
        playlist: &PlaylistInfo,
        status: Status,
        position: usize,
        total: usize,
        kind: UpsertKind,
    ) -> TrackOutcome {
        let outcome = |action, status, detail| TrackOutcome {
            action,
            track_id: track.id.clone(),
            name: track.name.clone(),
            position,
            total,
            status,
            detail,
        };

        if self.options.dry_run {
            let action = match kind {
                UpsertKind::Add => TrackAction::WouldAdd,
                UpsertKind::Update => TrackAction::WouldUpdate,
            };
            return outcome(action, status, None);
        }

        let row = TrackRow::from_track(track, playlist, status, self.now());
        let key = row.key();
        let retry = self.options.retry;
        let store = self.store;
        // A failed write leaves the stored status; no row means Unknown.
        let result = match self.index.get_mut(&key) {
            Some((row_id, stored)) => {
                match retry.run("update row", || store.update_row(row_id, &row)) {
                    Ok(()) => {
                        *stored = status;
                        Ok(TrackAction::Update)
                    }
                    Err(e) => Err((e, *stored)),
                }
            }
            None => match retry.run("create row", || store.create_row(&row)) {
                Ok(row_id) => {
                    self.index.insert(key.clone(), (row_id, status));
                    Ok(TrackAction::Add)
                }
                Err(e) => Err((e, Status::Unknown)),
            },
        };

        match result {
            Ok(action) => {
                tracing::info!("{action} {key}: {status}");
                outcome(action, status, None)
            }
            Err((e, stored)) => {
                tracing::error!("writing {key} failed: {e}");
                outcome(TrackAction::Error, stored, Some(e.to_string()))
            }
        }
    }

    /// Mark a record whose track left `playlist`.
    pub fn retire(
        &mut self,
        record: &MirrorRecord,
        playlist: &PlaylistId,
        position: usize,
        total: usize,
        source: &dyn SourceClient,
    ) -> TrackOutcome {
        let outcome = |action, status, detail: Option<String>| TrackOutcome {
            action,
            track_id: record.track_id.clone(),
            name: record.name.clone(),
            position,
            total,
            status,
            detail,
        };
        let retry = self.options.retry;
        let store = self.store;

        let current = match retry.run("re-read row", || store.retrieve(&record.row_id)) {
            Ok(Some(current)) => current,
            Ok(None) => {
                tracing::warn!("row {} for {} no longer exists", record.row_id, record.key());
                return outcome(TrackAction::Skip, record.status, Some("row no longer exists".into()));
            }
            Err(e) => return outcome(TrackAction::Error, record.status, Some(e.to_string())),
        };
        if &current.playlist_id != playlist {
            tracing::warn!(
                "row {} now belongs to playlist {}, not {playlist}",
                record.row_id,
                current.playlist_id
            );
            return outcome(
                TrackAction::Skip,
                current.status,
                Some(format!("row now belongs to playlist {}", current.playlist_id)),
            );
        }
        if current.status.is_retired() {
            tracing::debug!("{} already {}", record.key(), current.status);
            return outcome(
                TrackAction::Skip,
                current.status,
                Some(format!("already {}", current.status)),
            );
        }

        let status = match self.options.retire_policy {
            RetirePolicy::Remove => Status::Removed,
            RetirePolicy::CatalogCheck => {
                match retry.run("catalog check", || source.track_available(&record.track_id)) {
                    Ok(true) => Status::Unlinked,
                    Ok(false) => Status::Unavailable,
                    Err(e) => return outcome(TrackAction::Error, current.status, Some(e.to_string())),
                }
            }
        };

        if self.options.dry_run {
            return outcome(TrackAction::WouldRetire, status, None);
        }

        let synced_at = self.now();
        match retry.run("retire row", || store.update_status(&record.row_id, status, synced_at)) {
            Ok(()) => {
                tracing::info!("retired {}: {status}", record.key());
                outcome(TrackAction::Retire, status, None)
            }
            Err(e) => {
                tracing::error!("retiring {} failed: {e}", record.key());
                outcome(TrackAction::Error, current.status, Some(e.to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
