//! Hosts-file manager: the only code that reads or writes the shared
//! resolution file.
//!
//! ## `apply` — mutation protocol
//!
//! 1. Read the current file.
//! 2. Snapshot it to a timestamped backup (abort on failure — never
//!    mutate without a rollback point).
//! 3. Strip any existing managed section wholesale.
//! 4. Append a fresh section when the domain list is non-empty.
//! 5. Write to a `.tmp` sibling, rename over the live file.
//! 6. Best-effort resolver cache flush (logged, never fatal).
//! 7. Opportunistic 30-day backup sweep (logged, never fatal).

pub mod backup;
mod error;
pub mod section;

use std::fs;
use std::path::{Path, PathBuf};

pub use error::HostsError;
use error::classify;

/// Default path of the shared resolution file.
pub const DEFAULT_HOSTS_PATH: &str = "/etc/hosts";

/// Manager for one hosts file and its backup directory.
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
    backup_dir: PathBuf,
}

impl HostsFile {
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Domains currently present in the managed section.
    pub fn managed_domains(&self) -> Result<Vec<String>, HostsError> {
        let content = self.read()?;
        Ok(section::managed_domains(&content))
    }

    /// Rewrite the managed section to exactly `domains`.
    ///
    /// An empty list removes the section entirely. Content outside the
    /// sentinels is preserved byte-for-byte.
    pub fn apply(&self, domains: &[String]) -> Result<(), HostsError> {
        let content = self.read()?;

        let snapshot = backup::snapshot(&self.path, &self.backup_dir)?;
        tracing::info!(
            "applying {} domain(s) to {} (backup: {})",
            domains.len(),
            self.path.display(),
            snapshot.display(),
        );

        let updated = section::replace_section(&content, domains);
        self.write(&updated)?;

        flush_dns_cache();
        backup::prune_older_than(&self.backup_dir, backup::RETENTION_DAYS);
        Ok(())
    }

    /// Copy a prior snapshot verbatim over the live file and flush.
    ///
    /// Manual/emergency recovery only.
    pub fn restore(&self, snapshot: &Path) -> Result<(), HostsError> {
        backup::restore(snapshot, &self.path)?;
        flush_dns_cache();
        Ok(())
    }

    fn read(&self) -> Result<String, HostsError> {
        fs::read_to_string(&self.path).map_err(|e| classify(&self.path, e))
    }

    /// Write via `.tmp` sibling + rename so a crash mid-write never
    /// leaves a truncated hosts file.
    fn write(&self, content: &str) -> Result<(), HostsError> {
        let tmp = PathBuf::from(format!("{}.habitlock.tmp", self.path.display()));
        fs::write(&tmp, content).map_err(|e| classify(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(classify(&self.path, e));
        }
        Ok(())
    }
}

/// Ask the OS resolver to drop its cache. Best-effort: failures are
/// logged and the mutation is still considered successful.
pub fn flush_dns_cache() {
    for (program, args) in flush_commands() {
        match std::process::Command::new(program).args(args).output() {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                tracing::warn!("{program} exited with {}: {stderr}", output.status);
            }
            Err(err) => {
                tracing::warn!("failed to run {program}: {err}");
            }
        }
    }
}

#[cfg(target_os = "macos")]
fn flush_commands() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        ("dscacheutil", vec!["-flushcache"]),
        ("killall", vec!["-HUP", "mDNSResponder"]),
    ]
}

#[cfg(target_os = "linux")]
fn flush_commands() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![("resolvectl", vec!["flush-caches"])]
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn flush_commands() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![]
}
