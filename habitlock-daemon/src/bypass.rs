//! Bypass state: a single time-boxed override that suppresses blocking.
//!
//! Persisted as one small JSON object so it survives daemon restarts.
//! Expiry is lazy: `status` is pure computation against the wall clock
//! and never rewrites the file — the next `activate`/`cancel` does.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, DaemonError};

/// Inclusive bounds for an activation request, in minutes.
pub const MIN_BYPASS_MINUTES: u32 = 1;
pub const MAX_BYPASS_MINUTES: u32 = 120;

/// Persisted bypass state: `{ "bypassUntil": RFC3339 | null }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BypassState {
    pub bypass_until: Option<DateTime<Utc>>,
}

impl BypassState {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        matches!(self.bypass_until, Some(until) if now < until)
    }

    /// Whole minutes remaining, rounded up; 0 when inactive.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        match self.bypass_until {
            Some(until) if now < until => {
                let secs = (until - now).num_seconds();
                (secs + 59) / 60
            }
            _ => 0,
        }
    }

    /// Wire payload for `bypass` / `bypass-status` responses.
    pub fn status(&self, now: DateTime<Utc>) -> BypassStatus {
        BypassStatus {
            bypass_until: self.bypass_until,
            is_active: self.is_active(now),
            remaining_minutes: self.remaining_minutes(now),
        }
    }
}

/// Serialized bypass status sent over the control socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BypassStatus {
    pub bypass_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub remaining_minutes: i64,
}

/// File-backed store for the bypass override.
#[derive(Debug)]
pub struct BypassStore {
    path: PathBuf,
    warned_corrupt: AtomicBool,
}

impl BypassStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            warned_corrupt: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state. Missing or corrupt files are "no bypass
    /// active"; corruption is logged once per process, never an error.
    pub fn state(&self) -> BypassState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return BypassState::default();
            }
            Err(err) => {
                self.warn_once(&format!("unreadable bypass state: {err}"));
                return BypassState::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(err) => {
                self.warn_once(&format!("corrupt bypass state: {err}"));
                BypassState::default()
            }
        }
    }

    /// Activate a bypass for `minutes` starting at `now`.
    ///
    /// Duration bounds are enforced by the protocol layer; this persists
    /// whatever window it is given.
    pub fn activate(&self, minutes: u32, now: DateTime<Utc>) -> Result<BypassState, DaemonError> {
        let state = BypassState {
            bypass_until: Some(now + Duration::minutes(i64::from(minutes))),
        };
        self.save(&state)?;
        tracing::info!(minutes, "bypass activated");
        Ok(state)
    }

    /// Clear any bypass, active or expired.
    pub fn cancel(&self) -> Result<(), DaemonError> {
        self.save(&BypassState::default())?;
        tracing::info!("bypass cancelled");
        Ok(())
    }

    fn save(&self, state: &BypassState) -> Result<(), DaemonError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string(state)?;
        fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }

    fn warn_once(&self, message: &str) {
        if !self.warned_corrupt.swap(true, Ordering::Relaxed) {
            tracing::warn!(path = %self.path.display(), "{message}; treating as no bypass");
        }
    }
}
