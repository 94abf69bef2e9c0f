//! In-memory [`MirrorStore`] for tests and dry experiments.
//!
//! Records every call in an operation log and can be told to fail the next
//! N writes or queries, which is how retry exhaustion is exercised.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use playmirror_core::{MirrorRecord, PlaylistId, RemoteError, RowId, Status};

use crate::row::{BucketRow, MirrorSnapshot, TrackRow};
use crate::schema::MirrorSchema;
use crate::store::MirrorStore;

/// One call made against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Schema,
    Query,
    Retrieve(RowId),
    Create(RowId),
    Update(RowId),
    UpdateStatus(RowId, Status),
    CreateBucket(PlaylistId),
}

#[derive(Default)]
pub struct MemoryStore {
    schema: RefCell<MirrorSchema>,
    records: RefCell<Vec<MirrorRecord>>,
    buckets: RefCell<Vec<BucketRow>>,
    /// Full rows as last written, by row id.
    rows: RefCell<Vec<(RowId, TrackRow)>>,
    ops: RefCell<Vec<StoreOp>>,
    next_id: Cell<u64>,
    failing_writes: Cell<u32>,
    failing_queries: Cell<u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            schema: RefCell::new(MirrorSchema::expected()),
            ..Self::default()
        }
    }

    pub fn with_schema(schema: MirrorSchema) -> Self {
        Self {
            schema: RefCell::new(schema),
            ..Self::default()
        }
    }

    /// Seed an existing record.
    pub fn insert_record(&self, record: MirrorRecord) {
        self.records.borrow_mut().push(record);
    }

    /// Seed an existing playlist bucket.
    pub fn insert_bucket(&self, playlist: PlaylistId) {
        self.buckets.borrow_mut().push(BucketRow {
            playlist_id: playlist,
            name: String::new(),
            creator: String::new(),
            track_count: 0,
            cover_url: String::new(),
            synced_at: DateTime::<FixedOffset>::default(),
        });
    }

    /// Move a stored row to another playlist, as a concurrent edit would.
    pub fn reassign(&self, id: &RowId, playlist: PlaylistId) {
        if let Some(rec) = self.records.borrow_mut().iter_mut().find(|r| &r.row_id == id) {
            rec.playlist_id = playlist;
        }
    }

    /// Delete a stored row.
    pub fn delete(&self, id: &RowId) {
        self.records.borrow_mut().retain(|r| &r.row_id != id);
    }

    /// Fail the next `n` write calls with a transport error.
    pub fn fail_next_writes(&self, n: u32) {
        self.failing_writes.set(n);
    }

    /// Fail the next `n` `query_all` calls with a transport error.
    pub fn fail_queries(&self, n: u32) {
        self.failing_queries.set(n);
    }

    pub fn records(&self) -> Vec<MirrorRecord> {
        self.records.borrow().clone()
    }

    pub fn buckets(&self) -> Vec<BucketRow> {
        self.buckets.borrow().clone()
    }

    pub fn record(&self, id: &RowId) -> Option<MirrorRecord> {
        self.records.borrow().iter().find(|r| &r.row_id == id).cloned()
    }

    /// The full row most recently written under `id`.
    pub fn last_row(&self, id: &RowId) -> Option<TrackRow> {
        self.rows
            .borrow()
            .iter()
            .rev()
            .find(|(row_id, _)| row_id == id)
            .map(|(_, row)| row.clone())
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.borrow().clone()
    }

    /// Operations that changed stored state.
    pub fn writes(&self) -> Vec<StoreOp> {
        self.ops
            .borrow()
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    StoreOp::Create(_)
                        | StoreOp::Update(_)
                        | StoreOp::UpdateStatus(..)
                        | StoreOp::CreateBucket(_)
                )
            })
            .cloned()
            .collect()
    }

    fn log(&self, op: StoreOp) {
        self.ops.borrow_mut().push(op);
    }

    fn take_failure(counter: &Cell<u32>, endpoint: &str) -> Result<(), RemoteError> {
        let left = counter.get();
        if left == 0 {
            return Ok(());
        }
        counter.set(left - 1);
        Err(RemoteError::transport(endpoint, "injected failure"))
    }

    fn fresh_id(&self) -> RowId {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        RowId(format!("mem-{n}"))
    }
}

impl MirrorStore for MemoryStore {
    fn schema(&self) -> Result<MirrorSchema, RemoteError> {
        self.log(StoreOp::Schema);
        Ok(self.schema.borrow().clone())
    }

    fn query_all(&self) -> Result<MirrorSnapshot, RemoteError> {
        self.log(StoreOp::Query);
        Self::take_failure(&self.failing_queries, "query")?;
        let buckets: HashSet<PlaylistId> = self
            .buckets
            .borrow()
            .iter()
            .map(|b| b.playlist_id.clone())
            .collect();
        Ok(MirrorSnapshot {
            records: self.records(),
            buckets,
            skipped: 0,
        })
    }

    fn retrieve(&self, id: &RowId) -> Result<Option<MirrorRecord>, RemoteError> {
        self.log(StoreOp::Retrieve(id.clone()));
        Ok(self.record(id))
    }

    fn create_row(&self, row: &TrackRow) -> Result<RowId, RemoteError> {
        Self::take_failure(&self.failing_writes, "create")?;
        let id = self.fresh_id();
        self.log(StoreOp::Create(id.clone()));
        self.records.borrow_mut().push(row.to_record(id.clone()));
        self.rows.borrow_mut().push((id.clone(), row.clone()));
        Ok(id)
    }

    fn update_row(&self, id: &RowId, row: &TrackRow) -> Result<(), RemoteError> {
        Self::take_failure(&self.failing_writes, "update")?;
        let mut records = self.records.borrow_mut();
        let slot = records
            .iter_mut()
            .find(|r| &r.row_id == id)
            .ok_or_else(|| RemoteError::Status {
                endpoint: "update".to_string(),
                status: 404,
                message: format!("no row {id}"),
            })?;
        *slot = row.to_record(id.clone());
        self.log(StoreOp::Update(id.clone()));
        self.rows.borrow_mut().push((id.clone(), row.clone()));
        Ok(())
    }

    fn update_status(
        &self,
        id: &RowId,
        status: Status,
        synced_at: DateTime<FixedOffset>,
    ) -> Result<(), RemoteError> {
        Self::take_failure(&self.failing_writes, "update_status")?;
        let mut records = self.records.borrow_mut();
        let slot = records
            .iter_mut()
            .find(|r| &r.row_id == id)
            .ok_or_else(|| RemoteError::Status {
                endpoint: "update_status".to_string(),
                status: 404,
                message: format!("no row {id}"),
            })?;
        slot.status = status;
        slot.last_synced = Some(synced_at);
        self.log(StoreOp::UpdateStatus(id.clone(), status));
        Ok(())
    }

    fn create_bucket(&self, row: &BucketRow) -> Result<RowId, RemoteError> {
        Self::take_failure(&self.failing_writes, "create_bucket")?;
        let id = self.fresh_id();
        self.log(StoreOp::CreateBucket(row.playlist_id.clone()));
        self.buckets.borrow_mut().push(row.clone());
        Ok(id)
    }
}
