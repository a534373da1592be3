//! Raw location snapshots as reported by the rendering engine

use serde::{Deserialize, Serialize};

/// The engine's report of the currently displayed range.
///
/// Owned by the rendering engine and read-only to this crate. Every field is
/// best-effort: engines routinely omit whatever they have not computed yet,
/// so consumers go through the locator codec rather than reading fields
/// directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationSnapshot {
    /// First visible point of the displayed range
    pub start: SnapshotEdge,

    /// Last visible point of the displayed range. Preferred for progress:
    /// the user has read up to here.
    pub end: SnapshotEdge,

    /// Total location count for the whole book, when the engine has
    /// generated it
    pub total_locations: Option<u32>,
}

/// One edge (start or end) of the displayed range.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEdge {
    /// Content-fragment locator for this point
    pub cfi: Option<String>,

    /// Fraction of the book before this point, `0..=1`
    pub percentage: Option<f64>,

    /// Spine position of the containing document
    pub index: Option<u32>,

    /// Global location counter for this point
    pub location: Option<u32>,

    /// Position within the current pagination
    pub displayed: Option<PageSpread>,

    /// Archive path of the containing document
    pub href: Option<String>,
}

/// Page number and page count within the engine's current pagination.
///
/// Both values are relative to the current display size and chapter layout,
/// not to the book as a whole.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSpread {
    pub page: u32,
    pub total: u32,
}
