//! playmirror core library — domain types, settings, errors.
//!
//! - [`types`] — id newtypes, [`RemoteTrack`], [`MirrorRecord`], [`PlaylistInfo`], [`Status`]
//! - [`error`] — [`RemoteError`], [`ConfigError`]
//! - [`config`] — [`Settings`] loaded from `~/.playmirror/config.yaml`

pub mod config;
pub mod error;
pub mod types;

pub use config::{RetirePolicy, Settings, UpdatePredicate};
pub use error::{ConfigError, RemoteError};
pub use types::{
    MirrorRecord, PlaylistId, PlaylistInfo, RecordKey, RemoteTrack, RowId, Status, TrackId,
};
