//! StarPlan Core Library
//!
//! This library provides a client for the StarPlan university timetable
//! service: session login, the saved view preferences, reference data
//! (semesters, study programs, groups) and the calendar export converted
//! into ordered lesson events.

pub mod client;
pub mod cookie;
pub mod error;
pub mod ics;
pub mod ordering;
pub mod types;
pub mod view;

// Re-export core types and error handling
pub use client::StarPlanClient;
pub use error::{CalendarError, Error, Result};
pub use types::*;
pub use view::SavedView;

/// Commonly used items
pub mod prelude {
    pub use crate::{client::*, ics::*, ordering::*, types::*, view::*};
}
