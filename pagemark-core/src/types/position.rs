//! The normalized reading position

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized, comparable reading position.
///
/// Transient: this is the position-related subset of a
/// [`BookRecord`](super::BookRecord), produced by the locator codec from raw
/// engine snapshots and merged back into the record on persist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingPosition {
    /// Whole-percentage progress through the book, `0..=100`.
    ///
    /// The one canonical scale in this crate; engine-side `0..1` fractions
    /// are converted exactly once, at the codec boundary.
    pub progress_percent: u8,

    /// Page within the engine's current pagination (advisory)
    pub page: u32,

    /// Content-fragment locator addressing the exact resume point
    pub locator: String,

    /// When the underlying snapshot was observed
    pub captured_at: DateTime<Utc>,
}

impl ReadingPosition {
    pub fn new(progress_percent: u8, page: u32, locator: impl Into<String>) -> Self {
        Self {
            progress_percent,
            page,
            locator: locator.into(),
            captured_at: Utc::now(),
        }
    }
}
