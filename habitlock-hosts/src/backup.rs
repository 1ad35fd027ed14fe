//! Timestamped hosts-file snapshots and the 30-day retention sweep.
//!
//! One snapshot is taken before every mutation; nothing else ever
//! deletes them except the sweep, and sweep failures are logged, never
//! fatal.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;

use crate::error::{classify, HostsError};

/// Snapshots older than this are deleted by the sweep.
pub const RETENTION_DAYS: u64 = 30;

const SNAPSHOT_PREFIX: &str = "hosts-";

/// Copy the live hosts file into `backup_dir` under a timestamped name.
///
/// Any failure here maps to [`HostsError::Backup`] so the caller aborts
/// before mutating the live file.
pub fn snapshot(hosts_path: &Path, backup_dir: &Path) -> Result<PathBuf, HostsError> {
    fs::create_dir_all(backup_dir).map_err(|e| HostsError::Backup {
        path: backup_dir.to_path_buf(),
        source: e,
    })?;

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
    // Back-to-back mutations can land in the same millisecond; suffix
    // the name rather than overwrite an earlier snapshot.
    let mut dest = backup_dir.join(format!("{SNAPSHOT_PREFIX}{stamp}"));
    let mut n = 1;
    while dest.exists() {
        dest = backup_dir.join(format!("{SNAPSHOT_PREFIX}{stamp}-{n}"));
        n += 1;
    }
    fs::copy(hosts_path, &dest).map_err(|e| HostsError::Backup {
        path: hosts_path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!("snapshot created: {}", dest.display());
    Ok(dest)
}

/// Delete snapshots in `backup_dir` older than `retention_days`.
///
/// Returns the number of snapshots removed. Per-file failures are
/// logged as warnings and do not stop the sweep; a missing backup
/// directory is a no-op.
pub fn prune_older_than(backup_dir: &Path, retention_days: u64) -> usize {
    let cutoff = SystemTime::now() - Duration::from_secs(retention_days * 24 * 60 * 60);

    let entries = match fs::read_dir(backup_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(err) => {
            tracing::warn!("backup sweep could not read {}: {err}", backup_dir.display());
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(SNAPSHOT_PREFIX) {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                tracing::warn!("backup sweep skipping {}: {err}", entry.path().display());
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => {
                tracing::warn!("failed to prune {}: {err}", entry.path().display());
            }
        }
    }

    if removed > 0 {
        tracing::info!("pruned {removed} hosts backup(s) older than {retention_days} days");
    }
    removed
}

/// Copy `snapshot` verbatim over `hosts_path`.
///
/// Manual/emergency recovery only; the scheduler never calls this.
pub fn restore(snapshot: &Path, hosts_path: &Path) -> Result<(), HostsError> {
    if !snapshot.exists() {
        return Err(HostsError::NotFound {
            path: snapshot.to_path_buf(),
        });
    }
    fs::copy(snapshot, hosts_path)
        .map(|_| ())
        .map_err(|e| classify(hosts_path, e))
}
