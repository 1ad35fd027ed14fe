//! File-backed habit/log/settings store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.habitlock/
//!   habits/<habit_id>.yaml   (one file per habit — mode 0600)
//!   logs/<YYYY-MM-DD>.yaml   (habit id → status map for that UTC date)
//!   settings.yaml            (blocked-domain list)
//! ```
//!
//! Habits and settings are written by the web CRUD layer; the daemon
//! reads them and writes exactly one thing: `missed` log entries.
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::types::{Habit, HabitId, LogStatus, Settings};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.habitlock/` — pure, no I/O.
pub fn habitlock_root(home: &Path) -> PathBuf {
    home.join(".habitlock")
}

/// `<home>/.habitlock/habits/` — pure, no I/O.
pub fn habits_dir_at(home: &Path) -> PathBuf {
    habitlock_root(home).join("habits")
}

/// `<home>/.habitlock/logs/` — pure, no I/O.
pub fn logs_dir_at(home: &Path) -> PathBuf {
    habitlock_root(home).join("logs")
}

/// `<home>/.habitlock/logs/<YYYY-MM-DD>.yaml` — pure, no I/O.
pub fn log_path_at(home: &Path, date: NaiveDate) -> PathBuf {
    logs_dir_at(home).join(format!("{}.yaml", date.format("%Y-%m-%d")))
}

/// `<home>/.habitlock/settings.yaml` — pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    habitlock_root(home).join("settings.yaml")
}

fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// 2. Habits (read side; save exists for the CRUD layer and tests)
// ---------------------------------------------------------------------------

/// Load every active habit under `<home>/.habitlock/habits/`.
///
/// Results are sorted by habit id for deterministic evaluation order.
/// A missing habits directory yields an empty list, not an error.
pub fn list_active_habits_at(home: &Path) -> Result<Vec<Habit>, StoreError> {
    let dir = habits_dir_at(home);
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut entries: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .ends_with(".yaml")
        })
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut habits = Vec::new();
    for entry in entries {
        let contents = std::fs::read_to_string(entry.path())?;
        let habit: Habit = serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse {
            path: entry.path(),
            source: e,
        })?;
        if habit.active {
            habits.push(habit);
        }
    }
    Ok(habits)
}

/// `list_active_habits_at` convenience wrapper.
pub fn list_active_habits() -> Result<Vec<Habit>, StoreError> {
    list_active_habits_at(&home()?)
}

/// Atomically save a habit to `<home>/.habitlock/habits/<id>.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_habit_at(home: &Path, habit: &Habit) -> Result<(), StoreError> {
    let dir = habits_dir_at(home);
    ensure_dir(&dir)?;
    let path = dir.join(format!("{}.yaml", habit.id.0));
    atomic_write_yaml(&path, habit)
}

/// `save_habit_at` convenience wrapper.
pub fn save_habit(habit: &Habit) -> Result<(), StoreError> {
    save_habit_at(&home()?, habit)
}

// ---------------------------------------------------------------------------
// 3. Logs
// ---------------------------------------------------------------------------

/// Load the habit-id → status map for one UTC date.
///
/// A missing log file means no logs exist for that date yet.
pub fn logs_for_date_at(
    home: &Path,
    date: NaiveDate,
) -> Result<BTreeMap<HabitId, LogStatus>, StoreError> {
    let path = log_path_at(home, date);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// `logs_for_date_at` convenience wrapper.
pub fn logs_for_date(date: NaiveDate) -> Result<BTreeMap<HabitId, LogStatus>, StoreError> {
    logs_for_date_at(&home()?, date)
}

/// Record a status for (habit, date), overwriting any existing entry.
///
/// This is the CRUD layer's write path (completed/skipped); the daemon
/// itself goes through [`record_missed_at`].
pub fn set_log_at(
    home: &Path,
    date: NaiveDate,
    habit_id: &HabitId,
    status: LogStatus,
) -> Result<(), StoreError> {
    let mut logs = logs_for_date_at(home, date)?;
    logs.insert(habit_id.clone(), status);
    save_logs_at(home, date, &logs)
}

/// Insert a `missed` log for (habit, date) if and only if no log exists.
///
/// Returns `true` if a log was inserted. Idempotent: a second call in
/// the same day is a no-op, and an existing completed/skipped/missed
/// entry is never overwritten.
pub fn record_missed_at(
    home: &Path,
    date: NaiveDate,
    habit_id: &HabitId,
) -> Result<bool, StoreError> {
    let mut logs = logs_for_date_at(home, date)?;
    if logs.contains_key(habit_id) {
        return Ok(false);
    }
    logs.insert(habit_id.clone(), LogStatus::Missed);
    save_logs_at(home, date, &logs)?;
    Ok(true)
}

/// `record_missed_at` convenience wrapper.
pub fn record_missed(date: NaiveDate, habit_id: &HabitId) -> Result<bool, StoreError> {
    record_missed_at(&home()?, date, habit_id)
}

fn save_logs_at(
    home: &Path,
    date: NaiveDate,
    logs: &BTreeMap<HabitId, LogStatus>,
) -> Result<(), StoreError> {
    let dir = logs_dir_at(home);
    ensure_dir(&dir)?;
    atomic_write_yaml(&log_path_at(home, date), logs)
}

// ---------------------------------------------------------------------------
// 4. Settings
// ---------------------------------------------------------------------------

/// Load the blocked-domain list from `settings.yaml`.
///
/// A missing settings file means an empty blocklist; the daemon treats
/// the list as opaque input and re-reads it on every cycle.
pub fn blocked_domains_at(home: &Path) -> Result<Vec<String>, StoreError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(vec![]);
    }
    let contents = std::fs::read_to_string(&path)?;
    let settings: Settings =
        serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })?;
    Ok(settings.blocked_domains)
}

/// `blocked_domains_at` convenience wrapper.
pub fn blocked_domains() -> Result<Vec<String>, StoreError> {
    blocked_domains_at(&home()?)
}

/// Atomically save settings to `<home>/.habitlock/settings.yaml`.
pub fn save_settings_at(home: &Path, settings: &Settings) -> Result<(), StoreError> {
    ensure_dir(&habitlock_root(home))?;
    atomic_write_yaml(&settings_path_at(home), settings)
}

/// `save_settings_at` convenience wrapper.
pub fn save_settings(settings: &Settings) -> Result<(), StoreError> {
    save_settings_at(&home()?, settings)
}

// ---------------------------------------------------------------------------
// 5. Atomic write + permissions
// ---------------------------------------------------------------------------

/// Serialize → `.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem).
fn atomic_write_yaml<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(value)?;
    std::fs::write(&tmp, yaml)?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Create `dir` (mode `0700`) if it does not yet exist.
fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        set_dir_permissions(dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(dir: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}
