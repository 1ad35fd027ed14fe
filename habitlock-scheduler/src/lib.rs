//! Blocking-decision scheduler for habitlock.
//!
//! `evaluate_at(home, now, bypass_active)` inspects active habits and
//! today's logs and decides which domains should be blocked right now.
//! The only write it performs is inserting `missed` log entries for
//! overdue habits that have no log yet (idempotent per UTC day).
//!
//! Deadlines are `HH:MM` UTC strings compared lexicographically — this
//! is deliberate: zero-padded 24-hour times order correctly as strings,
//! and it avoids timezone/date arithmetic entirely.

use chrono::{DateTime, NaiveDate, Timelike, Utc};

use habitlock_core::{
    store,
    types::{Habit, LogStatus},
    StoreError,
};
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Outcome of one scheduling cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Evaluation {
    /// Domains the hosts-file manager should block. Empty when every
    /// overdue habit is resolved, or when a bypass is active.
    pub domains_to_block: Vec<String>,
    /// Overdue habits that still count against the user today.
    pub incomplete: Vec<Habit>,
    /// Habits whose `missed` log was inserted by this evaluation.
    pub missed: Vec<Habit>,
}

/// Errors from scheduling.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Run one scheduling cycle at `now`.
///
/// Algorithm:
/// 1. Load active habits; keep those with a deadline that apply today
///    (UTC weekday).
/// 2. A habit is overdue iff `HH:MM(now) >= deadline`.
/// 3. Overdue + completed/skipped log → contributes nothing.
///    Overdue + no log → insert `missed` once, counts as incomplete.
///    Overdue + existing `missed` log → counts as incomplete.
/// 4. Any incomplete habit pulls in the full blocked-domain list.
/// 5. An active bypass forces the domain list empty regardless.
pub fn evaluate_at(
    home: &std::path::Path,
    now: DateTime<Utc>,
    bypass_active: bool,
) -> Result<Evaluation, ScheduleError> {
    let today = now.date_naive();
    let current = hhmm(now);

    let mut logs = store::logs_for_date_at(home, today)?;
    let mut evaluation = Evaluation::default();

    for habit in store::list_active_habits_at(home)? {
        let Some(deadline) = habit.deadline.as_deref() else {
            continue;
        };
        if !habit.applies_on(today) {
            continue;
        }
        // Deadline exactly equal to the current minute counts as overdue.
        if current.as_str() < deadline {
            continue;
        }

        match logs.get(&habit.id) {
            Some(LogStatus::Completed) | Some(LogStatus::Skipped) => {}
            Some(LogStatus::Missed) => {
                evaluation.incomplete.push(habit);
            }
            None => {
                if store::record_missed_at(home, today, &habit.id)? {
                    logs.insert(habit.id.clone(), LogStatus::Missed);
                    evaluation.missed.push(habit.clone());
                }
                evaluation.incomplete.push(habit);
            }
        }
    }

    if !evaluation.incomplete.is_empty() && !bypass_active {
        evaluation.domains_to_block = store::blocked_domains_at(home)?;
    }

    Ok(evaluation)
}

/// `evaluate_at` convenience wrapper (derives home from the environment).
pub fn evaluate(now: DateTime<Utc>, bypass_active: bool) -> Result<Evaluation, ScheduleError> {
    let home = dirs_home()?;
    evaluate_at(&home, now, bypass_active)
}

// ---------------------------------------------------------------------------
// Next deadline
// ---------------------------------------------------------------------------

/// Milliseconds until the next not-yet-passed deadline today, among
/// active habits that apply on the current UTC date.
///
/// Returns `None` when no upcoming deadline exists (callers fall back
/// to the fixed poll interval).
pub fn ms_until_next_deadline_at(
    home: &std::path::Path,
    now: DateTime<Utc>,
) -> Result<Option<i64>, ScheduleError> {
    let today = now.date_naive();
    let current = hhmm(now);

    let mut next_ms: Option<i64> = None;
    for habit in store::list_active_habits_at(home)? {
        let Some(deadline) = habit.deadline.as_deref() else {
            continue;
        };
        if !habit.applies_on(today) || deadline <= current.as_str() {
            continue;
        }
        let Some(target) = deadline_instant(today, deadline) else {
            continue;
        };
        let ms = (target - now).num_milliseconds();
        if ms > 0 {
            next_ms = Some(next_ms.map_or(ms, |best| best.min(ms)));
        }
    }
    Ok(next_ms)
}

/// `ms_until_next_deadline_at` convenience wrapper.
pub fn ms_until_next_deadline(now: DateTime<Utc>) -> Result<Option<i64>, ScheduleError> {
    let home = dirs_home()?;
    ms_until_next_deadline_at(&home, now)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn hhmm(now: DateTime<Utc>) -> String {
    format!("{:02}:{:02}", now.hour(), now.minute())
}

/// Resolve an `HH:MM` deadline to a UTC instant on `date`.
/// Malformed deadlines yield `None` and are skipped by the caller.
fn deadline_instant(date: NaiveDate, deadline: &str) -> Option<DateTime<Utc>> {
    let (h, m) = deadline.split_once(':')?;
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn dirs_home() -> Result<std::path::PathBuf, ScheduleError> {
    dirs_home_inner().map_err(ScheduleError::Store)
}

fn dirs_home_inner() -> Result<std::path::PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}
