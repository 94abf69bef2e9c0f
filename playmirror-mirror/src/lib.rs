//! playmirror-mirror — reading and writing the mirror database.
//!
//! - [`store`] — the [`MirrorStore`] trait and the HTTP [`NotionStore`]
//! - [`schema`] — [`MirrorSchema`] verification
//! - [`properties`] — row ⇄ page property conversion
//! - [`memory`] — [`MemoryStore`], an in-memory store with an operation log

pub mod fields;
pub mod memory;
pub mod properties;
pub mod row;
pub mod schema;
pub mod store;

pub use memory::{MemoryStore, StoreOp};
pub use row::{BucketRow, MirrorSnapshot, TrackRow};
pub use schema::{MirrorSchema, SchemaError};
pub use store::{MirrorConfig, MirrorStore, NotionStore};
