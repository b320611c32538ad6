//! `cadence-campaigns` — campaign domain model, recurrence expansion, and
//! the SQLite-backed store facade.
//!
//! # Overview
//!
//! A [`Campaign`](types::Campaign) carries an optional
//! [`RecurrenceRule`](types::RecurrenceRule). Saving a campaign expands the
//! rule into concrete [`CalendarEvent`](types::CalendarEvent)s and replaces
//! the campaign's previous events inside a single transaction, so readers
//! never observe a partial expansion.
//!
//! # Recurrence variants
//!
//! | Frequency | Behaviour                                                  |
//! |-----------|------------------------------------------------------------|
//! | `daily`   | Advance by `interval` days                                 |
//! | `weekly`  | Advance by `interval` weeks; with `by_day`, emit matching  |
//! |           | weekdays inside each window                                |
//! | `monthly` | Advance by `interval` months, day-of-month clamped         |
//! | `yearly`  | Advance by `interval` years, same clamp rule               |

pub mod db;
pub mod error;
pub mod recurrence;
pub mod store;
pub mod types;

pub use error::{CampaignError, Result};
pub use recurrence::{expand, MAX_OCCURRENCES};
pub use store::CampaignStore;
pub use types::{Campaign, CalendarEvent, Frequency, Post, PostStatus, RecurrenceRule, Weekday};
