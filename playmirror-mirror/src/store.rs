//! Access to the mirror store.
//!
//! [`MirrorStore`] is the seam the writer and pipeline depend on;
//! [`NotionStore`] talks to the page-store HTTP API, and
//! [`crate::MemoryStore`] backs tests.

use std::cell::RefCell;

use chrono::{DateTime, FixedOffset};
use serde_json::{json, Map, Value};

use playmirror_core::{config::MirrorSettings, MirrorRecord, RemoteError, RowId, Status};

use crate::fields::FieldKind;
use crate::properties::{
    bucket_properties, decode_page, status_properties, track_properties, DecodedRow,
};
use crate::row::{BucketRow, MirrorSnapshot, TrackRow};
use crate::schema::MirrorSchema;

/// Rows requested per query page; the store's maximum.
const QUERY_PAGE_SIZE: u32 = 100;

/// Read and write access to the mirror.
///
/// No method retries; the caller wraps each call in a retry policy.
pub trait MirrorStore {
    fn schema(&self) -> Result<MirrorSchema, RemoteError>;

    /// Every row of the database, classified.
    fn query_all(&self) -> Result<MirrorSnapshot, RemoteError>;

    /// Re-read one row. `None` when it no longer exists or is not a track
    /// record.
    fn retrieve(&self, id: &RowId) -> Result<Option<MirrorRecord>, RemoteError>;

    fn create_row(&self, row: &TrackRow) -> Result<RowId, RemoteError>;

    /// Overwrite every field of an existing row.
    fn update_row(&self, id: &RowId, row: &TrackRow) -> Result<(), RemoteError>;

    /// Overwrite status and last-sync timestamp only.
    fn update_status(
        &self,
        id: &RowId,
        status: Status,
        synced_at: DateTime<FixedOffset>,
    ) -> Result<(), RemoteError>;

    fn create_bucket(&self, row: &BucketRow) -> Result<RowId, RemoteError>;
}

/// Add one decoded page to a snapshot, warning on skipped rows.
pub(crate) fn absorb(snapshot: &mut MirrorSnapshot, decoded: DecodedRow) {
    match decoded {
        DecodedRow::Record(rec) => snapshot.records.push(rec),
        DecodedRow::Bucket(playlist) => {
            snapshot.buckets.insert(playlist);
        }
        DecodedRow::Skipped(reason) => {
            tracing::warn!("skipping mirror row: {reason}");
            snapshot.skipped += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub token: String,
    pub database_id: String,
    pub settings: MirrorSettings,
}

/// [`MirrorStore`] over the page-store HTTP API.
pub struct NotionStore {
    agent: ureq::Agent,
    config: MirrorConfig,
    /// Name of the database's title field, looked up once.
    title_field: RefCell<Option<String>>,
}

impl NotionStore {
    pub fn new(config: MirrorConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.settings.timeout())
            .build();
        Self {
            agent,
            config,
            title_field: RefCell::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1{}",
            self.config.settings.base_url.trim_end_matches('/'),
            path
        )
    }

    fn send(&self, method: &str, path: &str, body: Option<Value>) -> Result<Value, RemoteError> {
        let request = self
            .agent
            .request(method, &self.url(path))
            .set("Authorization", &format!("Bearer {}", self.config.token))
            .set("Notion-Version", &self.config.settings.api_version);
        tracing::debug!("{method} {path}");
        let response = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        }
        .map_err(|e| RemoteError::from_http(path, e))?;
        response
            .into_json::<Value>()
            .map_err(|e| RemoteError::malformed(path, e.to_string()))
    }

    fn title_field(&self) -> Result<String, RemoteError> {
        if let Some(name) = self.title_field.borrow().as_ref() {
            return Ok(name.clone());
        }
        let schema = self.schema()?;
        self.title_field
            .borrow()
            .clone()
            .or_else(|| title_of(&schema))
            .ok_or_else(|| RemoteError::malformed("database", "no title field"))
    }

    fn create_page(&self, properties: Map<String, Value>) -> Result<RowId, RemoteError> {
        let body = json!({
            "parent": { "database_id": self.config.database_id },
            "properties": properties,
        });
        let page = self.send("POST", "/pages", Some(body))?;
        page.get("id")
            .and_then(Value::as_str)
            .map(RowId::from)
            .ok_or_else(|| RemoteError::malformed("/pages", "created page has no id"))
    }

    fn patch_page(&self, id: &RowId, properties: Map<String, Value>) -> Result<(), RemoteError> {
        let path = format!("/pages/{id}");
        self.send("PATCH", &path, Some(json!({ "properties": properties })))?;
        Ok(())
    }
}

fn title_of(schema: &MirrorSchema) -> Option<String> {
    schema
        .fields
        .iter()
        .find(|(_, kind)| kind.as_str() == FieldKind::Title.tag())
        .map(|(name, _)| name.clone())
}

impl MirrorStore for NotionStore {
    fn schema(&self) -> Result<MirrorSchema, RemoteError> {
        let path = format!("/databases/{}", self.config.database_id);
        let body = self.send("GET", &path, None)?;
        let schema = MirrorSchema::from_database(&body)?;
        if let Some(title) = title_of(&schema) {
            *self.title_field.borrow_mut() = Some(title);
        }
        Ok(schema)
    }

    fn query_all(&self) -> Result<MirrorSnapshot, RemoteError> {
        let path = format!("/databases/{}/query", self.config.database_id);
        let mut snapshot = MirrorSnapshot::default();
        let mut cursor: Option<String> = None;
        loop {
            let mut body = json!({ "page_size": QUERY_PAGE_SIZE });
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }
            let page = self.send("POST", &path, Some(body))?;
            let results = page
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| RemoteError::malformed(path.as_str(), "missing `results`"))?;
            for row in results {
                absorb(&mut snapshot, decode_page(row));
            }
            let has_more = page.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = page
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                break;
            }
        }
        tracing::info!(
            "read {} records and {} playlist rows from the mirror ({} skipped)",
            snapshot.records.len(),
            snapshot.buckets.len(),
            snapshot.skipped
        );
        Ok(snapshot)
    }

    fn retrieve(&self, id: &RowId) -> Result<Option<MirrorRecord>, RemoteError> {
        let page = match self.send("GET", &format!("/pages/{id}"), None) {
            Ok(page) => page,
            Err(RemoteError::Status { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if page.get("archived").and_then(Value::as_bool) == Some(true) {
            return Ok(None);
        }
        match decode_page(&page) {
            DecodedRow::Record(rec) => Ok(Some(rec)),
            _ => Ok(None),
        }
    }

    fn create_row(&self, row: &TrackRow) -> Result<RowId, RemoteError> {
        let title = self.title_field()?;
        self.create_page(track_properties(&title, row))
    }

    fn update_row(&self, id: &RowId, row: &TrackRow) -> Result<(), RemoteError> {
        let title = self.title_field()?;
        self.patch_page(id, track_properties(&title, row))
    }

    fn update_status(
        &self,
        id: &RowId,
        status: Status,
        synced_at: DateTime<FixedOffset>,
    ) -> Result<(), RemoteError> {
        self.patch_page(id, status_properties(status, synced_at))
    }

    fn create_bucket(&self, row: &BucketRow) -> Result<RowId, RemoteError> {
        let title = self.title_field()?;
        self.create_page(bucket_properties(&title, row))
    }
}
