//! Navigation target resolution for table-of-contents entries
//!
//! TOC entries arrive in mixed states of repair: some carry a native
//! locator, some only a document href, some nothing but an internal anchor
//! id. The resolver walks a fixed fallback chain so navigation degrades to
//! chapter-start granularity instead of failing outright.

use crate::codec;
use crate::types::TocEntry;
use tracing::debug;

/// Resolves document references against a book's spine order.
#[derive(Debug, Clone)]
pub struct NavigationResolver {
    spine: Vec<String>,
}

impl NavigationResolver {
    pub fn new(spine: Vec<String>) -> Self {
        Self { spine }
    }

    /// Resolve a TOC entry to a locator the engine can jump to.
    ///
    /// Tries, in order: the entry's own locator, its href matched against
    /// the spine, the same two rules on the entry's first child, and last
    /// the raw href or anchor id unchanged. The raw form is a degraded
    /// jump target; the engine may no-op on it. `None` only when the entry
    /// carries nothing at all.
    pub fn resolve(&self, entry: &TocEntry) -> Option<String> {
        if let Some(target) = self.resolve_direct(entry) {
            return Some(target);
        }
        if let Some(target) = entry.children.first().and_then(|c| self.resolve_direct(c)) {
            return Some(target);
        }

        match entry.href.clone().or_else(|| entry.fallback_id.clone()) {
            Some(reference) => {
                debug!(title = %entry.title, %reference, "degrading to raw reference jump");
                Some(reference)
            }
            None => {
                debug!(title = %entry.title, "TOC entry has no resolvable target");
                None
            }
        }
    }

    /// The confident half of the chain: an explicit locator, or an href that
    /// maps into the spine.
    fn resolve_direct(&self, entry: &TocEntry) -> Option<String> {
        if let Some(locator) = &entry.locator {
            return Some(locator.clone());
        }
        entry
            .href
            .as_deref()
            .and_then(|href| self.synthesize_from_reference(href))
    }

    /// Synthesize a chapter-start locator for a document reference.
    pub fn synthesize_from_reference(&self, reference: &str) -> Option<String> {
        self.spine_position(reference)
            .map(codec::spine_start_locator)
    }

    /// Spine index of the document a reference points into.
    ///
    /// Fragments are ignored and paths may be relative on either side, so
    /// `chapter1.xhtml#s2` matches a spine entry of `OEBPS/chapter1.xhtml`.
    pub fn spine_position(&self, reference: &str) -> Option<usize> {
        let wanted = strip_fragment(reference);
        if wanted.is_empty() {
            return None;
        }

        self.spine.iter().position(|item| {
            let item = strip_fragment(item);
            item == wanted
                || item.ends_with(&format!("/{wanted}"))
                || wanted.ends_with(&format!("/{item}"))
        })
    }

    /// Start locator of the first spine item that is not front matter.
    ///
    /// Falls back to the very first item when the whole spine looks like
    /// front matter, so navigation always has somewhere to land.
    pub fn first_content_locator(&self) -> Option<String> {
        if self.spine.is_empty() {
            return None;
        }
        let index = self
            .spine
            .iter()
            .position(|item| !codec::is_front_matter_reference(item))
            .unwrap_or(0);
        Some(codec::spine_start_locator(index))
    }
}

fn strip_fragment(reference: &str) -> &str {
    reference.split('#').next().unwrap_or(reference)
}
