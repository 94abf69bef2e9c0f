//! Error types for playmirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a call to a remote service (source API or mirror store).
///
/// The retry wrapper treats every variant the same way.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network failure, timeout, or unreadable body.
    #[error("transport error calling {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// Non-success HTTP status or API-level error code.
    #[error("{endpoint} returned status {status}: {message}")]
    Status {
        endpoint: String,
        status: i64,
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed response from {endpoint}: {detail}")]
    Malformed { endpoint: String, detail: String },
}

impl RemoteError {
    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        RemoteError::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Map a `ureq` failure, keeping at most 200 bytes of an error body.
    pub fn from_http(endpoint: impl Into<String>, err: ureq::Error) -> Self {
        let endpoint = endpoint.into();
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                RemoteError::Status {
                    endpoint,
                    status: i64::from(status),
                    message: truncate(&body, 200),
                }
            }
            ureq::Error::Transport(transport) => RemoteError::transport(endpoint, transport),
        }
    }

    pub fn malformed(endpoint: impl Into<String>, detail: impl Into<String>) -> Self {
        RemoteError::Malformed {
            endpoint: endpoint.into(),
            detail: detail.into(),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

/// Errors from loading the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the offending path.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 200), "short");
        assert_eq!(truncate("ééé", 3), "é…");
    }

    #[test]
    fn remote_error_messages_name_endpoint() {
        let err = RemoteError::malformed("/api/playlist", "missing `songs`");
        assert!(err.to_string().contains("/api/playlist"));
        assert!(err.to_string().contains("songs"));
    }
}
