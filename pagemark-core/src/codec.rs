//! Locator codec: raw engine snapshots to normalized reading positions
//!
//! Pure translation, no storage or engine side effects. Everything noisy
//! about the engine's reports is absorbed here: missing fields, coarse
//! pagination, out-of-range readings, front-matter pseudo-pages.

use crate::resolver::NavigationResolver;
use crate::types::{LocationSnapshot, ReadingPosition, SnapshotEdge};
use chrono::Utc;
use tracing::debug;

/// Document-reference substrings treated as front matter.
///
/// A path-substring heuristic carried over from the engine's conventions,
/// not a structural signal: a chapter legitimately named `contents.xhtml`
/// is misclassified. The engine exposes nothing better.
const FRONT_MATTER_MARKERS: &[&str] = &["toc", "contents"];

/// A normalized position candidate awaiting reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionCandidate {
    pub position: ReadingPosition,

    /// The observation sits on a contents/front-matter pseudo-page and must
    /// never update reading progress
    pub front_matter: bool,
}

/// Normalize an engine snapshot into a position candidate.
///
/// Returns `None` when no locator can be extracted from either edge (no
/// observation) or when the progress reading is out of range (corrupt
/// snapshot). A candidate with `progress_percent == 0` may still carry a
/// perfectly valid locator: "no confident progress" is not "no position".
pub fn normalize(snapshot: &LocationSnapshot) -> Option<PositionCandidate> {
    let locator = snapshot
        .end
        .cfi
        .clone()
        .or_else(|| snapshot.start.cfi.clone())?;

    let progress_percent = match raw_progress(&snapshot.end, snapshot.total_locations) {
        Some(raw) => {
            let rounded = raw.round() as i64;
            if !(0..=100).contains(&rounded) {
                debug!(raw, "dropping corrupt snapshot with out-of-range progress");
                return None;
            }
            rounded as u8
        }
        None => 0,
    };

    let page = snapshot
        .end
        .displayed
        .map(|d| d.page)
        .or(snapshot.end.location)
        .unwrap_or(0);

    let href = snapshot
        .end
        .href
        .as_deref()
        .or(snapshot.start.href.as_deref());

    Some(PositionCandidate {
        position: ReadingPosition {
            progress_percent,
            page,
            locator,
            captured_at: Utc::now(),
        },
        front_matter: href.is_some_and(is_front_matter_reference),
    })
}

/// Progress for an edge, as a raw percentage, in descending order of
/// confidence. `None` when no source applies.
fn raw_progress(edge: &SnapshotEdge, total_locations: Option<u32>) -> Option<f64> {
    if let Some(fraction) = edge.percentage {
        return Some(fraction * 100.0);
    }

    if let Some(total) = total_locations.filter(|t| *t > 0) {
        if let Some(index) = edge.index {
            return Some(f64::from(index) / f64::from(total) * 100.0);
        }
        if let Some(location) = edge.location {
            return Some(f64::from(location) / f64::from(total) * 100.0);
        }
    }

    // Pagination-relative ratio only when the pagination is fine enough to
    // mean anything; a 3-page chapter view would otherwise report giant jumps.
    if let Some(displayed) = edge.displayed.filter(|d| d.total > 4) {
        return Some(f64::from(displayed.page) / f64::from(displayed.total) * 100.0);
    }

    None
}

/// Whether a document reference looks like a contents/front-matter page.
pub fn is_front_matter_reference(reference: &str) -> bool {
    let lowered = reference.to_ascii_lowercase();
    FRONT_MATTER_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Whether a string is already in the engine's native locator syntax.
pub fn is_native_locator(locator: &str) -> bool {
    locator.starts_with("epubcfi(") && locator.ends_with(')')
}

/// Locator addressing the start of the document at a spine position.
///
/// Follows the engine's packaging convention: the spine is the third child
/// of the package root (step 6) and item steps are even-numbered.
pub fn spine_start_locator(spine_index: usize) -> String {
    format!("epubcfi(/6/{}!/4/1:0)", (spine_index + 1) * 2)
}

/// Turn a stored locator back into something the engine can jump to.
///
/// Native locators pass through untouched. Anything else is treated as a
/// document reference and handed to the resolver's synthesis path; `None`
/// means the stored value is unusable and the caller should leave the
/// engine at its default position.
pub fn denormalize(locator: &str, resolver: &NavigationResolver) -> Option<String> {
    if is_native_locator(locator) {
        return Some(locator.to_string());
    }
    resolver.synthesize_from_reference(locator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageSpread;

    fn snapshot_with_end(end: SnapshotEdge) -> LocationSnapshot {
        LocationSnapshot {
            end,
            ..LocationSnapshot::default()
        }
    }

    fn edge_with_cfi(cfi: &str) -> SnapshotEdge {
        SnapshotEdge {
            cfi: Some(cfi.to_string()),
            ..SnapshotEdge::default()
        }
    }

    #[test]
    fn test_percentage_takes_precedence_and_scales() {
        let snapshot = snapshot_with_end(SnapshotEdge {
            percentage: Some(0.42),
            location: Some(1),
            ..edge_with_cfi("epubcfi(/6/8!/4/2/1:0)")
        });

        let candidate = normalize(&snapshot).unwrap();
        assert_eq!(candidate.position.progress_percent, 42);
        assert!(!candidate.front_matter);
    }

    #[test]
    fn test_percentage_rounds_to_nearest_point() {
        let snapshot = snapshot_with_end(SnapshotEdge {
            percentage: Some(0.426),
            ..edge_with_cfi("epubcfi(/6/8!/4/2/1:0)")
        });
        assert_eq!(normalize(&snapshot).unwrap().position.progress_percent, 43);
    }

    #[test]
    fn test_spine_index_over_total_is_second_choice() {
        let mut snapshot = snapshot_with_end(SnapshotEdge {
            index: Some(5),
            ..edge_with_cfi("epubcfi(/6/12!/4/2/1:0)")
        });
        snapshot.total_locations = Some(20);

        assert_eq!(normalize(&snapshot).unwrap().position.progress_percent, 25);
    }

    #[test]
    fn test_location_counter_used_when_index_absent() {
        let mut snapshot = snapshot_with_end(SnapshotEdge {
            location: Some(150),
            ..edge_with_cfi("epubcfi(/6/12!/4/2/1:0)")
        });
        snapshot.total_locations = Some(200);

        assert_eq!(normalize(&snapshot).unwrap().position.progress_percent, 75);
    }

    #[test]
    fn test_unknown_total_skips_index_and_location() {
        let snapshot = snapshot_with_end(SnapshotEdge {
            index: Some(5),
            location: Some(150),
            ..edge_with_cfi("epubcfi(/6/12!/4/2/1:0)")
        });

        assert_eq!(normalize(&snapshot).unwrap().position.progress_percent, 0);
    }

    #[test]
    fn test_displayed_ratio_needs_fine_pagination() {
        let coarse = snapshot_with_end(SnapshotEdge {
            displayed: Some(PageSpread { page: 2, total: 3 }),
            ..edge_with_cfi("epubcfi(/6/2!/4/2/1:0)")
        });
        assert_eq!(normalize(&coarse).unwrap().position.progress_percent, 0);

        let fine = snapshot_with_end(SnapshotEdge {
            displayed: Some(PageSpread { page: 5, total: 10 }),
            ..edge_with_cfi("epubcfi(/6/2!/4/2/1:0)")
        });
        assert_eq!(normalize(&fine).unwrap().position.progress_percent, 50);
    }

    #[test]
    fn test_no_locator_means_no_observation() {
        let snapshot = snapshot_with_end(SnapshotEdge {
            percentage: Some(0.5),
            ..SnapshotEdge::default()
        });
        assert!(normalize(&snapshot).is_none());
    }

    #[test]
    fn test_start_cfi_fills_in_for_missing_end() {
        let snapshot = LocationSnapshot {
            start: edge_with_cfi("epubcfi(/6/4!/4/2/1:0)"),
            ..LocationSnapshot::default()
        };
        let candidate = normalize(&snapshot).unwrap();
        assert_eq!(candidate.position.locator, "epubcfi(/6/4!/4/2/1:0)");
        assert_eq!(candidate.position.progress_percent, 0);
    }

    #[test]
    fn test_out_of_range_progress_is_corrupt() {
        let over = snapshot_with_end(SnapshotEdge {
            percentage: Some(1.2),
            ..edge_with_cfi("epubcfi(/6/8!/4/2/1:0)")
        });
        assert!(normalize(&over).is_none());

        let under = snapshot_with_end(SnapshotEdge {
            percentage: Some(-0.25),
            ..edge_with_cfi("epubcfi(/6/8!/4/2/1:0)")
        });
        assert!(normalize(&under).is_none());
    }

    #[test]
    fn test_float_noise_at_the_boundaries_is_tolerated() {
        let snapshot = snapshot_with_end(SnapshotEdge {
            percentage: Some(1.000001),
            ..edge_with_cfi("epubcfi(/6/80!/4/2/1:0)")
        });
        assert_eq!(normalize(&snapshot).unwrap().position.progress_percent, 100);
    }

    #[test]
    fn test_contents_page_is_flagged_front_matter() {
        let snapshot = snapshot_with_end(SnapshotEdge {
            percentage: Some(0.0),
            href: Some("OEBPS/toc.xhtml".to_string()),
            ..edge_with_cfi("epubcfi(/6/2!/4/2/1:0)")
        });
        let candidate = normalize(&snapshot).unwrap();
        assert!(candidate.front_matter);

        let upper = snapshot_with_end(SnapshotEdge {
            href: Some("OEBPS/Contents.xhtml".to_string()),
            ..edge_with_cfi("epubcfi(/6/2!/4/2/1:0)")
        });
        assert!(normalize(&upper).unwrap().front_matter);
    }

    #[test]
    fn test_chapter_page_is_not_front_matter() {
        let snapshot = snapshot_with_end(SnapshotEdge {
            percentage: Some(0.3),
            href: Some("OEBPS/chapter3.xhtml".to_string()),
            ..edge_with_cfi("epubcfi(/6/8!/4/2/1:0)")
        });
        assert!(!normalize(&snapshot).unwrap().front_matter);
    }

    #[test]
    fn test_page_prefers_displayed_over_location() {
        let snapshot = snapshot_with_end(SnapshotEdge {
            percentage: Some(0.1),
            location: Some(99),
            displayed: Some(PageSpread { page: 12, total: 40 }),
            ..edge_with_cfi("epubcfi(/6/8!/4/2/1:0)")
        });
        assert_eq!(normalize(&snapshot).unwrap().position.page, 12);
    }

    #[test]
    fn test_native_locator_syntax_detection() {
        assert!(is_native_locator("epubcfi(/6/8!/4/2/1:0)"));
        assert!(!is_native_locator("chapter3.xhtml"));
        assert!(!is_native_locator("epubcfi(/6/8"));
    }

    #[test]
    fn test_spine_start_locators_use_even_steps() {
        assert_eq!(spine_start_locator(0), "epubcfi(/6/2!/4/1:0)");
        assert_eq!(spine_start_locator(4), "epubcfi(/6/10!/4/1:0)");
    }

    #[test]
    fn test_denormalize_passes_native_locators_through() {
        let resolver = NavigationResolver::new(vec!["a.xhtml".to_string()]);
        assert_eq!(
            denormalize("epubcfi(/6/8!/4/2/1:0)", &resolver).as_deref(),
            Some("epubcfi(/6/8!/4/2/1:0)")
        );
    }

    #[test]
    fn test_denormalize_synthesizes_for_document_references() {
        let resolver = NavigationResolver::new(vec![
            "cover.xhtml".to_string(),
            "chapter1.xhtml".to_string(),
        ]);
        assert_eq!(
            denormalize("chapter1.xhtml", &resolver).as_deref(),
            Some(spine_start_locator(1).as_str())
        );
        assert!(denormalize("missing.xhtml", &resolver).is_none());
    }
}
