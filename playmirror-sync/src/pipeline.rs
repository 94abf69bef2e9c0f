//! Multi-playlist sync pipeline shared by `playmirror sync` and `diff`.
//!
//! A run verifies the mirror schema, resolves the playlists, skips those the
//! progress file already records, and then syncs the rest one at a time:
//! fetch tracks, read the mirror, ensure the playlist row, reconcile, then
//! apply adds, updates and retires in that order.

use std::path::Path;

use playmirror_core::{
    MirrorRecord, PlaylistId, PlaylistInfo, RemoteError, RemoteTrack, Settings,
};
use playmirror_mirror::MirrorStore;
use playmirror_source::SourceClient;

use crate::error::SyncError;
use crate::progress::{self, SyncProgress};
use crate::reconcile::reconcile;
use crate::retry::RetryPolicy;
use crate::targets::Targets;
use crate::writer::{MirrorWriter, TrackAction, TrackOutcome, UpsertKind, WriterOptions};

// ---------------------------------------------------------------------------
// Events and reports
// ---------------------------------------------------------------------------

/// Track counts of one playlist, or of a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub retired: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl PlaylistSummary {
    pub fn count(&mut self, outcome: &TrackOutcome) {
        match outcome.action {
            TrackAction::Add | TrackAction::WouldAdd => self.added += 1,
            TrackAction::Update | TrackAction::WouldUpdate => self.updated += 1,
            TrackAction::Retire | TrackAction::WouldRetire => self.retired += 1,
            TrackAction::Skip => self.skipped += 1,
            TrackAction::Error => self.errors += 1,
        }
    }

    pub fn merge(&mut self, other: &PlaylistSummary) {
        self.added += other.added;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.retired += other.retired;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

/// Progress notifications delivered to the run's observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    PlaylistStarted {
        position: usize,
        total: usize,
        info: PlaylistInfo,
    },
    Track(TrackOutcome),
    PlaylistFinished {
        position: usize,
        total: usize,
        info: PlaylistInfo,
        summary: PlaylistSummary,
    },
    PlaylistFailed {
        position: usize,
        total: usize,
        playlist: PlaylistId,
        error: String,
    },
    /// Already completed by an earlier, interrupted run.
    PlaylistResumed {
        position: usize,
        total: usize,
        info: PlaylistInfo,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub playlists: usize,
    pub succeeded: usize,
    pub resumed: usize,
    pub failed: usize,
    pub summary: PlaylistSummary,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Owned reconciliation of one playlist, as reported by [`Pipeline::diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub info: PlaylistInfo,
    pub has_bucket: bool,
    pub to_add: Vec<RemoteTrack>,
    pub to_update: Vec<(RemoteTrack, MirrorRecord)>,
    pub unchanged: usize,
    pub to_retire: Vec<MirrorRecord>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline<'a> {
    source: &'a dyn SourceClient,
    store: &'a dyn MirrorStore,
    settings: Settings,
    retry: RetryPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn SourceClient, store: &'a dyn MirrorStore, settings: Settings) -> Self {
        let retry = RetryPolicy::from(&settings.retry);
        Self {
            source,
            store,
            settings,
            retry,
        }
    }

    /// Check the mirror layout. Returns the title field name.
    pub fn verify_schema(&self) -> Result<String, SyncError> {
        let schema = self.retry.run("read schema", || self.store.schema())?;
        let title = schema.verify()?;
        tracing::debug!("mirror schema ok; title field `{title}`");
        Ok(title)
    }

    /// The playlists of a run, in listing order. An explicit id that cannot
    /// be resolved keeps its slot as an error.
    pub fn resolve(
        &self,
        targets: &Targets,
    ) -> Result<Vec<(PlaylistId, Result<PlaylistInfo, RemoteError>)>, SyncError> {
        match targets {
            Targets::User(user_id) => {
                let listing = self
                    .retry
                    .run("list playlists", || self.source.user_playlists(user_id))?;
                Ok(listing.into_iter().map(|p| (p.id.clone(), Ok(p))).collect())
            }
            Targets::Playlists(ids) => Ok(ids
                .iter()
                .map(|id| {
                    let info = self
                        .retry
                        .run("read playlist", || self.source.playlist_info(id));
                    (id.clone(), info)
                })
                .collect()),
        }
    }

    fn writer_options(&self, dry_run: bool) -> WriterOptions {
        WriterOptions {
            retry: self.retry,
            offset: self.settings.sync.offset(),
            retire_policy: self.settings.sync.retire_policy,
            dry_run,
        }
    }

    /// Sync every target playlist.
    ///
    /// Progress is read from and written to `progress_path` when given;
    /// dry runs never write it.
    pub fn run(
        &self,
        targets: &Targets,
        progress_path: Option<&Path>,
        dry_run: bool,
        observer: &mut dyn FnMut(&SyncEvent),
    ) -> Result<RunReport, SyncError> {
        self.verify_schema()?;
        let listing = self.resolve(targets)?;

        let mut state = match progress_path {
            Some(path) => progress::load(path)?,
            None => SyncProgress::default(),
        };
        let save = |state: &SyncProgress| -> Result<(), SyncError> {
            match progress_path {
                Some(path) if !dry_run => progress::save(path, state),
                _ => Ok(()),
            }
        };

        let total = listing.len();
        let mut report = RunReport {
            playlists: total,
            ..RunReport::default()
        };

        for (index, (id, resolved)) in listing.into_iter().enumerate() {
            let position = index + 1;
            let info = match resolved {
                Ok(info) => info,
                Err(e) => {
                    tracing::error!("playlist {id} could not be read: {e}");
                    report.failed += 1;
                    observer(&SyncEvent::PlaylistFailed {
                        position,
                        total,
                        playlist: id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if state.is_done(&info.id) {
                tracing::info!("playlist {} already synced; skipping", info.id);
                report.resumed += 1;
                observer(&SyncEvent::PlaylistResumed {
                    position,
                    total,
                    info,
                });
                continue;
            }

            observer(&SyncEvent::PlaylistStarted {
                position,
                total,
                info: info.clone(),
            });
            match self.sync_playlist(&info, dry_run, observer) {
                Ok(summary) => {
                    report.succeeded += 1;
                    report.summary.merge(&summary);
                    state.record(&info.id, u32::try_from(position).unwrap_or(u32::MAX));
                    save(&state)?;
                    observer(&SyncEvent::PlaylistFinished {
                        position,
                        total,
                        info,
                        summary,
                    });
                }
                Err(e) => {
                    tracing::error!("playlist {} ({}) failed: {e}", info.name, info.id);
                    report.failed += 1;
                    observer(&SyncEvent::PlaylistFailed {
                        position,
                        total,
                        playlist: info.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if report.is_success() {
            state.clear();
            save(&state)?;
        }
        tracing::info!(
            "run finished: {} synced, {} resumed, {} failed",
            report.succeeded,
            report.resumed,
            report.failed
        );
        Ok(report)
    }

    /// Sync one playlist. Errors here are fetch or read failures that abort
    /// this playlist only; write failures become `Error` outcomes.
    pub fn sync_playlist(
        &self,
        info: &PlaylistInfo,
        dry_run: bool,
        observer: &mut dyn FnMut(&SyncEvent),
    ) -> Result<PlaylistSummary, RemoteError> {
        let tracks = self
            .retry
            .run("fetch tracks", || self.source.playlist_tracks(&info.id))?;
        let snapshot = self.retry.run("read mirror", || self.store.query_all())?;

        let mut writer = MirrorWriter::new(self.store, &snapshot, self.writer_options(dry_run));
        writer.ensure_playlist_bucket(info)?;

        let plan = reconcile(
            &tracks,
            &snapshot.records,
            &info.id,
            self.settings.sync.update_predicate,
        );
        let total = plan.to_add.len() + plan.to_update.len() + plan.to_retire.len();
        let mut summary = PlaylistSummary {
            unchanged: plan.unchanged.len(),
            ..PlaylistSummary::default()
        };
        let mut position = 0;
        let mut emit = |outcome: TrackOutcome, summary: &mut PlaylistSummary| {
            summary.count(&outcome);
            observer(&SyncEvent::Track(outcome));
        };

        for track in &plan.to_add {
            position += 1;
            let outcome = writer.upsert(track, info, track.status(), position, total, UpsertKind::Add);
            emit(outcome, &mut summary);
        }
        for (track, _) in &plan.to_update {
            position += 1;
            let outcome =
                writer.upsert(track, info, track.status(), position, total, UpsertKind::Update);
            emit(outcome, &mut summary);
        }
        for record in &plan.to_retire {
            position += 1;
            let outcome = writer.retire(record, &info.id, position, total, self.source);
            emit(outcome, &mut summary);
        }
        Ok(summary)
    }

    /// Reconcile one playlist without writing anything.
    pub fn diff(&self, playlist: &PlaylistId) -> Result<DiffReport, SyncError> {
        self.verify_schema()?;
        let info = self
            .retry
            .run("read playlist", || self.source.playlist_info(playlist))?;
        let tracks = self
            .retry
            .run("fetch tracks", || self.source.playlist_tracks(playlist))?;
        let snapshot = self.retry.run("read mirror", || self.store.query_all())?;

        let plan = reconcile(
            &tracks,
            &snapshot.records,
            playlist,
            self.settings.sync.update_predicate,
        );
        Ok(DiffReport {
            has_bucket: snapshot.has_bucket(playlist),
            to_add: plan.to_add.into_iter().cloned().collect(),
            to_update: plan
                .to_update
                .into_iter()
                .map(|(t, r)| (t.clone(), r.clone()))
                .collect(),
            unchanged: plan.unchanged.len(),
            to_retire: plan.to_retire.into_iter().cloned().collect(),
            info,
        })
    }
}
