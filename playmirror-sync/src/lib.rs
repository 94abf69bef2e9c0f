//! # playmirror-sync
//!
//! Reconciliation of remote playlists against the mirror, and the pipeline
//! that applies it.
//!
//! Call [`Pipeline::run`] to sync a set of playlists, or [`Pipeline::diff`]
//! to see what a sync of one playlist would do.

pub mod error;
pub mod pipeline;
pub mod progress;
pub mod reconcile;
pub mod retry;
pub mod targets;
pub mod writer;

pub use error::SyncError;
pub use pipeline::{DiffReport, Pipeline, PlaylistSummary, RunReport, SyncEvent};
pub use progress::SyncProgress;
pub use reconcile::{reconcile, Reconciliation};
pub use retry::RetryPolicy;
pub use targets::Targets;
pub use writer::{MirrorWriter, TrackAction, TrackOutcome};
