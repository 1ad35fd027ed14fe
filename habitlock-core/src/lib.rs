//! habitlock core library — domain types, store persistence, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`StoreError`]
//! - [`store`] — habit / log / settings load & save

pub mod error;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use types::{weekday_number, Habit, HabitId, HabitLog, LogStatus, Settings};
