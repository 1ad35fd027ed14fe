//! Domain types for the habitlock store.
//!
//! All types are serializable/deserializable via serde + serde_yaml.
//! Habits are owned by the CRUD layer; the daemon only reads them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a habit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HabitId(pub String);

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for HabitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HabitId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Status of a habit log for one UTC calendar date.
///
/// `Completed` and `Skipped` come from user actions through the web API;
/// the daemon only ever writes `Missed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Completed,
    Skipped,
    Missed,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStatus::Completed => write!(f, "completed"),
            LogStatus::Skipped => write!(f, "skipped"),
            LogStatus::Missed => write!(f, "missed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A habit as stored by the CRUD layer. Read-only from the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    /// Deadline time-of-day in UTC, `HH:MM`. Habits without a deadline
    /// never contribute to blocking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    /// Weekdays the habit applies to, 0 = Sunday .. 6 = Saturday.
    /// Absent means every day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_days: Option<Vec<u8>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Whether this habit applies on the given UTC date.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match &self.active_days {
            None => true,
            Some(days) => days.contains(&weekday_number(date)),
        }
    }
}

/// One log row: a habit's status for a single UTC calendar date.
///
/// Invariant: at most one log per (habit, date); the per-date map file
/// in the store enforces this structurally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitLog {
    pub habit_id: HabitId,
    pub date: NaiveDate,
    pub status: LogStatus,
}

/// Blocking-related settings owned by the excluded settings storage.
/// Re-read on every decision cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub blocked_domains: Vec<String>,
}

/// Weekday number for a date, 0 = Sunday .. 6 = Saturday.
///
/// Matches the numbering the web layer stores (JS `getUTCDay()`).
pub fn weekday_number(date: NaiveDate) -> u8 {
    use chrono::Datelike;
    date.weekday().num_days_from_sunday() as u8
}
