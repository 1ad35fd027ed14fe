//! Error types for habitlock-hosts.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// All errors that can arise from hosts-file management.
///
/// Privilege failures are a distinct variant because the hosts file is
/// normally root-owned: callers surface them differently from a plain
/// I/O failure.
#[derive(Debug, Error)]
pub enum HostsError {
    /// Writing (or reading) the resource was denied — typically the
    /// daemon is running without the elevation the hosts path needs.
    #[error("permission denied at {path}; the hosts file requires elevated privileges")]
    PermissionDenied { path: PathBuf },

    /// The resource or snapshot did not exist.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Snapshot creation failed. Raised *before* any mutation so a
    /// failed backup never leaves the live file without a rollback point.
    #[error("backup failed for {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure (disk full, transient errors, …).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Classify an `io::Error` for `path` into the taxonomy above.
pub(crate) fn classify(path: impl AsRef<Path>, source: std::io::Error) -> HostsError {
    let path = path.as_ref().to_path_buf();
    match source.kind() {
        std::io::ErrorKind::PermissionDenied => HostsError::PermissionDenied { path },
        std::io::ErrorKind::NotFound => HostsError::NotFound { path },
        _ => HostsError::Io { path, source },
    }
}
