//! Table of contents entries as exposed by the rendering engine

use serde::{Deserialize, Serialize};

/// A single entry in the table of contents.
///
/// Entries are frequently underspecified: a precise `locator` when the
/// engine computed one, otherwise just a document `href`, sometimes only
/// nested children. The navigation resolver turns any of these shapes into
/// a jump target.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TocEntry {
    /// Display title
    pub title: String,

    /// Precise content-fragment locator, when the engine provides one
    pub locator: Option<String>,

    /// Document reference (archive path) of the target section
    pub href: Option<String>,

    /// Engine-internal anchor id; last-resort jump target
    pub fallback_id: Option<String>,

    /// Nesting level (0 = top level)
    pub level: u32,

    /// Child entries for nested TOC
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    /// Create a new TOC entry targeting a document reference
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: Some(href.into()),
            ..Self::default()
        }
    }

    /// Set the precise locator
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    /// Set the nesting level
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Add child entries
    pub fn with_children(mut self, children: Vec<TocEntry>) -> Self {
        self.children = children;
        self
    }

    /// Set the fallback anchor id
    pub fn with_fallback_id(mut self, id: impl Into<String>) -> Self {
        self.fallback_id = Some(id.into());
        self
    }
}
