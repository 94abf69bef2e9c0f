//! Error types for playmirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use playmirror_core::RemoteError;
use playmirror_mirror::SchemaError;

/// Errors that stop a whole run. Per-track and per-playlist failures are
/// reported as outcomes and events instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The mirror database does not have the expected fields.
    #[error("schema check failed: {0}")]
    Schema(#[from] SchemaError),

    /// A remote call failed after every retry.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON error reading or writing the progress file.
    #[error("progress JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
