//! Progress reconciliation state machine
//!
//! Every position candidate a session produces flows through here before it
//! may touch storage. The reconciler is pure state transition: it never
//! performs I/O itself, it only tells the caller whether to accept the
//! candidate and whether an accepted one warrants a persist. The single
//! `save_in_flight` flag is the only write-ordering primitive in the crate;
//! at most one save may be outstanding at any time.

use crate::codec::PositionCandidate;
use crate::types::ReadingPosition;
use tracing::trace;

/// Why a candidate was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Candidate sits on a contents/front-matter page
    FrontMatter,
    /// Same locator as the previous accepted observation
    DuplicateLocator,
    /// Zero progress reported after real progress was made
    Regression,
}

/// Outcome of feeding one candidate through the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Reject(RejectReason),
    Accept {
        /// Position to write through to storage, when the candidate moved
        /// far enough from the last persisted value and no save is already
        /// outstanding. `None` means accept in memory only.
        persist: Option<ReadingPosition>,
    },
}

/// Tracks accepted and persisted progress for one reading session.
#[derive(Debug)]
pub struct ProgressReconciler {
    /// Minimum whole-percentage movement before an accepted candidate is
    /// written through
    threshold: u8,
    last_accepted_progress: u8,
    last_persisted_progress: u8,
    last_locator: Option<String>,
    save_in_flight: bool,
    last_position: Option<ReadingPosition>,
}

impl ProgressReconciler {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            last_accepted_progress: 0,
            last_persisted_progress: 0,
            last_locator: None,
            save_in_flight: false,
            last_position: None,
        }
    }

    /// Seed the reconciler from a stored record at session start.
    ///
    /// The stored progress counts as both accepted and persisted, so the
    /// first in-session observation is measured against it and a restore
    /// re-report of the same locator is deduplicated.
    pub fn resume_from(&mut self, progress: u8, locator: Option<String>) {
        self.last_accepted_progress = progress;
        self.last_persisted_progress = progress;
        self.last_locator = locator;
        self.last_position = None;
    }

    /// Feed one candidate through the transition rules.
    pub fn observe(&mut self, candidate: &PositionCandidate) -> Decision {
        if candidate.front_matter {
            return Decision::Reject(RejectReason::FrontMatter);
        }

        let position = &candidate.position;

        if self.last_locator.as_deref() == Some(position.locator.as_str()) {
            return Decision::Reject(RejectReason::DuplicateLocator);
        }

        // Real progress never collapses back to zero on its own; only an
        // explicit reset may do that. Backward navigation to a non-zero
        // point remains legitimate.
        if position.progress_percent == 0 && self.last_accepted_progress > 0 {
            return Decision::Reject(RejectReason::Regression);
        }

        self.last_accepted_progress = position.progress_percent;
        self.last_locator = Some(position.locator.clone());
        self.last_position = Some(position.clone());

        let moved = position
            .progress_percent
            .abs_diff(self.last_persisted_progress);
        let persist = if !self.save_in_flight && moved >= self.threshold {
            self.save_in_flight = true;
            Some(position.clone())
        } else {
            trace!(
                progress = position.progress_percent,
                moved,
                in_flight = self.save_in_flight,
                "accepted without persist"
            );
            None
        };

        Decision::Accept { persist }
    }

    /// Record that an issued save finished, successfully or not.
    ///
    /// Failed saves count too: retrying the same value immediately would
    /// just fail again, and the teardown flush picks up whatever the
    /// session last accepted.
    pub fn save_completed(&mut self, progress: u8) {
        self.last_persisted_progress = progress;
        self.save_in_flight = false;
    }

    /// Drop all accepted progress, returning the machine to the unread
    /// state. Subsequent zero-progress observations are accepted again.
    pub fn reset(&mut self) {
        self.last_accepted_progress = 0;
        self.last_persisted_progress = 0;
        self.last_locator = None;
        self.last_position = None;
    }

    /// Newest accepted position, for the forced teardown flush.
    ///
    /// Ignores both the threshold and `save_in_flight`: an in-flight save
    /// carries older data than this.
    pub fn final_position(&self) -> Option<ReadingPosition> {
        self.last_position.clone()
    }

    pub fn current_progress(&self) -> u8 {
        self.last_accepted_progress
    }

    pub fn save_in_flight(&self) -> bool {
        self.save_in_flight
    }
}
