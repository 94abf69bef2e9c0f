//! End-to-end sync scenarios over a scripted source and the in-memory store.

use std::cell::Cell;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use tempfile::TempDir;

use playmirror_core::{
    config::RetrySettings, MirrorRecord, PlaylistId, PlaylistInfo, RemoteError, RemoteTrack,
    RetirePolicy, RowId, Settings, Status, TrackId,
};
use playmirror_mirror::{
    BucketRow, MemoryStore, MirrorSchema, MirrorSnapshot, MirrorStore, StoreOp, TrackRow,
};
use playmirror_source::SourceClient;
use playmirror_sync::{
    progress, Pipeline, SyncError, SyncEvent, SyncProgress, Targets, TrackAction,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeSource {
    order: Vec<PlaylistId>,
    playlists: HashMap<PlaylistId, (PlaylistInfo, Vec<RemoteTrack>)>,
    /// Remaining failures of `playlist_tracks`, per playlist.
    failing_fetches: HashMap<PlaylistId, Cell<u32>>,
    fetches: Cell<u32>,
}

impl FakeSource {
    fn with_playlist(mut self, id: &str, tracks: Vec<RemoteTrack>) -> Self {
        let info = PlaylistInfo {
            id: PlaylistId::from(id),
            name: format!("list {id}"),
            track_count: tracks.len() as u64,
            creator: "mirror-user".into(),
            cover_url: String::new(),
        };
        self.order.push(info.id.clone());
        self.playlists.insert(info.id.clone(), (info, tracks));
        self
    }

    fn failing(mut self, id: &str, times: u32) -> Self {
        self.failing_fetches
            .insert(PlaylistId::from(id), Cell::new(times));
        self
    }
}

impl SourceClient for FakeSource {
    fn user_playlists(&self, _user_id: &str) -> Result<Vec<PlaylistInfo>, RemoteError> {
        Ok(self
            .order
            .iter()
            .map(|id| self.playlists[id].0.clone())
            .collect())
    }

    fn playlist_info(&self, id: &PlaylistId) -> Result<PlaylistInfo, RemoteError> {
        self.playlists
            .get(id)
            .map(|(info, _)| info.clone())
            .ok_or_else(|| RemoteError::Status {
                endpoint: "/api/v6/playlist/detail".into(),
                status: 404,
                message: format!("no playlist {id}"),
            })
    }

    fn playlist_tracks(&self, id: &PlaylistId) -> Result<Vec<RemoteTrack>, RemoteError> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(left) = self.failing_fetches.get(id) {
            if left.get() > 0 {
                left.set(left.get() - 1);
                return Err(RemoteError::transport("/api/v3/playlist/track/all", "timed out"));
            }
        }
        Ok(self.playlists[id].1.clone())
    }

    fn track_available(&self, _id: &TrackId) -> Result<bool, RemoteError> {
        Ok(true)
    }
}

fn track(id: &str, fee: i64) -> RemoteTrack {
    RemoteTrack {
        id: TrackId::from(id),
        name: format!("song {id}"),
        artist: "artist".into(),
        album: "album".into(),
        artwork_url: String::new(),
        published_at: None,
        fee,
        link: format!("https://music.163.com/#/song?id={id}"),
    }
}

fn seed(store: &MemoryStore, id: &str, playlist: &str, status: Status) -> RowId {
    let row_id = RowId(format!("seed-{id}-{playlist}"));
    let mut rec = MirrorRecord::with_defaults(
        row_id.clone(),
        TrackId::from(id),
        PlaylistId::from(playlist),
    );
    rec.name = format!("song {id}");
    rec.status = status;
    store.insert_record(rec);
    row_id
}

fn settings() -> Settings {
    Settings {
        retry: RetrySettings {
            attempts: 3,
            delay_secs: 0,
        },
        ..Settings::default()
    }
}

fn status_of(store: &MemoryStore, track: &str, playlist: &str) -> Option<Status> {
    store
        .records()
        .into_iter()
        .find(|r| r.track_id.0 == track && r.playlist_id.0 == playlist)
        .map(|r| r.status)
}

fn run(
    source: &FakeSource,
    store: &MemoryStore,
    targets: Targets,
    progress_path: Option<&std::path::Path>,
    dry_run: bool,
) -> (Result<playmirror_sync::RunReport, SyncError>, Vec<SyncEvent>) {
    let pipeline = Pipeline::new(source, store, settings());
    let mut events = Vec::new();
    let result = pipeline.run(&targets, progress_path, dry_run, &mut |e| events.push(e.clone()));
    (result, events)
}

fn track_lines(events: &[SyncEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Track(outcome) => Some(outcome.to_string()),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn adds_new_and_retires_missing_tracks() {
    let source = FakeSource::default().with_playlist("p", vec![track("A", 8), track("B", 1)]);
    let store = MemoryStore::new();
    store.insert_bucket(PlaylistId::from("p"));
    let a_row = seed(&store, "A", "p", Status::Available);
    seed(&store, "C", "p", Status::Available);

    let (report, events) = run(&source, &store, Targets::User("u".into()), None, false);
    let report = report.unwrap();

    assert!(report.is_success());
    assert_eq!(report.summary.added, 1);
    assert_eq!(report.summary.updated, 0);
    assert_eq!(report.summary.unchanged, 1);
    assert_eq!(report.summary.retired, 1);
    assert_eq!(
        track_lines(&events),
        vec![
            "[1/2] add: song B - ID: B, status: VIP".to_string(),
            "[2/2] retire: song C - ID: C, status: Removed".to_string(),
        ]
    );
    assert_eq!(status_of(&store, "B", "p"), Some(Status::VipRestricted));
    assert_eq!(status_of(&store, "C", "p"), Some(Status::Removed));
    assert!(!store.writes().contains(&StoreOp::Update(a_row)));
}

#[test]
fn fee_change_updates_status() {
    let source = FakeSource::default().with_playlist("p", vec![track("A", 1)]);
    let store = MemoryStore::new();
    store.insert_bucket(PlaylistId::from("p"));
    let row = seed(&store, "A", "p", Status::Available);

    let (report, _) = run(&source, &store, Targets::User("u".into()), None, false);
    assert_eq!(report.unwrap().summary.updated, 1);
    assert_eq!(store.record(&row).unwrap().status, Status::VipRestricted);
    assert_eq!(store.records().len(), 1);
}

#[test]
fn bucket_is_created_before_any_track_write() {
    let source = FakeSource::default().with_playlist("Q", vec![track("1", 8), track("2", 0)]);
    let store = MemoryStore::new();

    let (report, _) = run(&source, &store, Targets::User("u".into()), None, false);
    assert_eq!(report.unwrap().summary.added, 2);

    let writes = store.writes();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[0], StoreOp::CreateBucket(PlaylistId::from("Q")));
    assert!(matches!(writes[1], StoreOp::Create(_)));
    assert!(matches!(writes[2], StoreOp::Create(_)));
    assert_eq!(store.buckets()[0].name, "list Q");
    assert_eq!(store.buckets()[0].creator, "mirror-user");
}

#[test]
fn second_run_writes_nothing() {
    let source = FakeSource::default().with_playlist("p", vec![track("1", 8), track("2", 1)]);
    let store = MemoryStore::new();

    run(&source, &store, Targets::User("u".into()), None, false).0.unwrap();
    let writes_after_first = store.writes().len();
    let (report, _) = run(&source, &store, Targets::User("u".into()), None, false);

    let report = report.unwrap();
    assert_eq!(report.summary.unchanged, 2);
    assert_eq!(report.summary.added, 0);
    assert_eq!(store.writes().len(), writes_after_first);
    assert_eq!(store.records().len(), 2);
}

/// Moves a row to another playlist right after the snapshot is read, as a
/// concurrent edit would.
struct MovesAfterQuery<'a> {
    inner: &'a MemoryStore,
    row: RowId,
    to: PlaylistId,
}

impl MirrorStore for MovesAfterQuery<'_> {
    fn schema(&self) -> Result<MirrorSchema, RemoteError> {
        self.inner.schema()
    }
    fn query_all(&self) -> Result<MirrorSnapshot, RemoteError> {
        let snapshot = self.inner.query_all()?;
        self.inner.reassign(&self.row, self.to.clone());
        Ok(snapshot)
    }
    fn retrieve(&self, id: &RowId) -> Result<Option<MirrorRecord>, RemoteError> {
        self.inner.retrieve(id)
    }
    fn create_row(&self, row: &TrackRow) -> Result<RowId, RemoteError> {
        self.inner.create_row(row)
    }
    fn update_row(&self, id: &RowId, row: &TrackRow) -> Result<(), RemoteError> {
        self.inner.update_row(id, row)
    }
    fn update_status(
        &self,
        id: &RowId,
        status: Status,
        synced_at: DateTime<FixedOffset>,
    ) -> Result<(), RemoteError> {
        self.inner.update_status(id, status, synced_at)
    }
    fn create_bucket(&self, row: &BucketRow) -> Result<RowId, RemoteError> {
        self.inner.create_bucket(row)
    }
}

#[test]
fn retire_guard_skips_rows_moved_to_another_playlist() {
    let source = FakeSource::default().with_playlist("p", vec![]);
    let memory = MemoryStore::new();
    memory.insert_bucket(PlaylistId::from("p"));
    let row = seed(&memory, "C", "p", Status::Available);
    let store = MovesAfterQuery {
        inner: &memory,
        row: row.clone(),
        to: PlaylistId::from("other"),
    };

    let pipeline = Pipeline::new(&source, &store, settings());
    let mut events = Vec::new();
    let report = pipeline
        .run(&Targets::User("u".into()), None, false, &mut |e| events.push(e.clone()))
        .unwrap();

    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.retired, 0);
    let stored = memory.record(&row).unwrap();
    assert_eq!(stored.status, Status::Available);
    assert_eq!(stored.playlist_id, PlaylistId::from("other"));
    assert!(memory.writes().is_empty());
    assert_eq!(
        track_lines(&events),
        vec!["[1/1] skip: song C - ID: C, status: Available (row now belongs to playlist other)".to_string()]
    );
}

#[test]
fn write_failures_become_error_outcomes() {
    let source = FakeSource::default().with_playlist("p", vec![track("1", 8)]);
    let store = MemoryStore::new();
    store.insert_bucket(PlaylistId::from("p"));
    store.fail_next_writes(3);

    let (report, events) = run(&source, &store, Targets::User("u".into()), None, false);
    let report = report.unwrap();

    assert_eq!(report.summary.errors, 1);
    assert!(report.is_success(), "per-track errors do not fail the playlist");
    assert!(store.writes().is_empty());
    assert!(events.iter().any(|e| matches!(
        e,
        SyncEvent::Track(o) if o.action == TrackAction::Error
    )));
}

#[test]
fn fetch_exhaustion_fails_playlist_and_continues() {
    let source = FakeSource::default()
        .with_playlist("p", vec![track("1", 8)])
        .with_playlist("q", vec![track("2", 8)])
        .failing("p", 3);
    let store = MemoryStore::new();
    let home = TempDir::new().unwrap();
    let path = progress::path_at(home.path());

    let (report, events) = run(&source, &store, Targets::User("u".into()), Some(&path), false);
    let report = report.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 1);
    assert!(!report.is_success());
    assert!(matches!(
        &events[0],
        SyncEvent::PlaylistStarted { position: 1, .. }
    ));
    assert!(events.iter().any(|e| matches!(
        e,
        SyncEvent::PlaylistFailed { playlist, .. } if playlist == &PlaylistId::from("p")
    )));
    assert_eq!(status_of(&store, "1", "p"), None);
    assert_eq!(status_of(&store, "2", "q"), Some(Status::Available));

    let saved = progress::load(&path).unwrap();
    assert!(!saved.is_done(&PlaylistId::from("p")));
    assert_eq!(saved.position(&PlaylistId::from("q")), Some(2));
}

#[test]
fn mirror_read_failure_fails_only_that_playlist() {
    let source = FakeSource::default()
        .with_playlist("p", vec![track("1", 8)])
        .with_playlist("q", vec![track("2", 8)]);
    let store = MemoryStore::new();
    store.fail_queries(3);

    let (report, events) = run(&source, &store, Targets::User("u".into()), None, false);
    let report = report.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        SyncEvent::PlaylistFailed { position: 1, playlist, error, .. }
            if playlist == &PlaylistId::from("p") && error.contains("injected failure")
    )));
    assert_eq!(status_of(&store, "1", "p"), None);
    assert_eq!(status_of(&store, "2", "q"), Some(Status::Available));
    assert_eq!(
        store.writes().first(),
        Some(&StoreOp::CreateBucket(PlaylistId::from("q")))
    );
}

#[test]
fn bucket_failure_aborts_playlist_before_track_writes() {
    let source = FakeSource::default()
        .with_playlist("p", vec![track("1", 8), track("2", 1)])
        .with_playlist("q", vec![track("3", 8)]);
    let store = MemoryStore::new();
    store.fail_next_writes(3);

    let (report, events) = run(&source, &store, Targets::User("u".into()), None, false);
    let report = report.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        SyncEvent::PlaylistFailed { playlist, .. } if playlist == &PlaylistId::from("p")
    )));
    assert!(track_lines(&events).iter().all(|line| line.contains("song 3")));
    assert_eq!(status_of(&store, "1", "p"), None);
    assert_eq!(status_of(&store, "2", "p"), None);
    assert_eq!(status_of(&store, "3", "q"), Some(Status::Available));

    let buckets: Vec<_> = store.buckets().into_iter().map(|b| b.playlist_id).collect();
    assert_eq!(buckets, vec![PlaylistId::from("q")]);
}

#[test]
fn transient_fetch_failure_is_retried() {
    let source = FakeSource::default()
        .with_playlist("p", vec![track("1", 8)])
        .failing("p", 2);
    let store = MemoryStore::new();

    let (report, _) = run(&source, &store, Targets::User("u".into()), None, false);
    assert!(report.unwrap().is_success());
    assert_eq!(source.fetches.get(), 3);
    assert_eq!(status_of(&store, "1", "p"), Some(Status::Available));
}

#[test]
fn recorded_playlists_are_resumed_and_progress_cleared() {
    let source = FakeSource::default()
        .with_playlist("p", vec![track("1", 8)])
        .with_playlist("q", vec![track("2", 8)]);
    let store = MemoryStore::new();
    let home = TempDir::new().unwrap();
    let path = progress::path_at(home.path());
    let mut state = SyncProgress::default();
    state.record(&PlaylistId::from("p"), 1);
    progress::save(&path, &state).unwrap();

    let (report, events) = run(&source, &store, Targets::User("u".into()), Some(&path), false);
    let report = report.unwrap();

    assert_eq!(report.resumed, 1);
    assert_eq!(report.succeeded, 1);
    assert!(matches!(&events[0], SyncEvent::PlaylistResumed { position: 1, .. }));
    assert_eq!(source.fetches.get(), 1);
    assert!(progress::load(&path).unwrap().is_empty());
}

#[test]
fn schema_mismatch_aborts_before_any_read() {
    let source = FakeSource::default().with_playlist("p", vec![track("1", 8)]);
    let store = MemoryStore::with_schema(MirrorSchema::default());

    let (result, events) = run(&source, &store, Targets::User("u".into()), None, false);
    assert!(matches!(result, Err(SyncError::Schema(_))));
    assert!(events.is_empty());
    assert_eq!(source.fetches.get(), 0);
    assert_eq!(store.ops(), vec![StoreOp::Schema]);
}

#[test]
fn dry_run_reports_without_writing() {
    let source = FakeSource::default().with_playlist("p", vec![track("1", 8)]);
    let store = MemoryStore::new();
    seed(&store, "9", "p", Status::Available);
    let home = TempDir::new().unwrap();
    let path = progress::path_at(home.path());

    let (report, events) = run(&source, &store, Targets::User("u".into()), Some(&path), true);
    let report = report.unwrap();

    assert_eq!(report.summary.added, 1);
    assert_eq!(report.summary.retired, 1);
    assert!(store.writes().is_empty());
    assert!(!path.exists());
    assert_eq!(
        track_lines(&events),
        vec![
            "[1/2] would add: song 1 - ID: 1, status: Available".to_string(),
            "[2/2] would retire: song 9 - ID: 9, status: Removed".to_string(),
        ]
    );
}

#[test]
fn explicit_ids_keep_their_slots() {
    let source = FakeSource::default().with_playlist("p", vec![track("1", 8)]);
    let store = MemoryStore::new();
    let targets = Targets::Playlists(vec![PlaylistId::from("missing"), PlaylistId::from("p")]);

    let (report, events) = run(&source, &store, targets, None, false);
    let report = report.unwrap();

    assert_eq!(report.playlists, 2);
    assert_eq!(report.failed, 1);
    assert!(matches!(
        &events[0],
        SyncEvent::PlaylistFailed { position: 1, total: 2, .. }
    ));
    assert_eq!(status_of(&store, "1", "p"), Some(Status::Available));
}

#[test]
fn catalog_check_policy_marks_unlinked() {
    let source = FakeSource::default().with_playlist("p", vec![]);
    let store = MemoryStore::new();
    store.insert_bucket(PlaylistId::from("p"));
    seed(&store, "1", "p", Status::Available);
    let mut settings = settings();
    settings.sync.retire_policy = RetirePolicy::CatalogCheck;

    let pipeline = Pipeline::new(&source, &store, settings);
    pipeline
        .run(&Targets::User("u".into()), None, false, &mut |_| {})
        .unwrap();
    assert_eq!(status_of(&store, "1", "p"), Some(Status::Unlinked));
}

#[test]
fn diff_reports_without_writing() {
    let source = FakeSource::default().with_playlist("p", vec![track("A", 1), track("B", 8)]);
    let store = MemoryStore::new();
    seed(&store, "A", "p", Status::Available);
    seed(&store, "C", "p", Status::Available);

    let pipeline = Pipeline::new(&source, &store, settings());
    let diff = pipeline.diff(&PlaylistId::from("p")).unwrap();

    assert!(!diff.has_bucket);
    assert_eq!(diff.to_add.len(), 1);
    assert_eq!(diff.to_add[0].id, TrackId::from("B"));
    assert_eq!(diff.to_update.len(), 1);
    assert_eq!(diff.to_retire.len(), 1);
    assert_eq!(diff.unchanged, 0);
    assert!(store.writes().is_empty());
}
