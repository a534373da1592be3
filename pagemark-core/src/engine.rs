//! The rendering-engine seam
//!
//! The engine that parses EPUB archives and displays content is a black box
//! to this crate. Everything the core needs from it (navigation, location
//! reports, the spine and TOC) goes through the [`RenderingEngine`] trait,
//! and the handle is passed explicitly into sessions at construction time.
//! There is no ambient or global engine access.

use crate::error::EngineError;
use crate::types::{LocationSnapshot, TocEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Notifications emitted by the rendering engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Initial parsing completed; fires exactly once per mount
    Ready,

    /// The displayed location changed. May fire zero times for small
    /// within-page navigation, which is why sessions also poll.
    LocationChanged(LocationSnapshot),
}

/// A single search hit inside the rendered book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    /// Locator addressing the hit
    pub locator: String,

    /// Surrounding text excerpt
    pub excerpt: String,
}

/// Capability object for the rendering engine.
///
/// Matching, ranking and display are engine concerns; this crate only
/// sequences calls and interprets the location reports.
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Load and parse the document at the given blob path.
    ///
    /// [`EngineEvent::Ready`] is emitted when initial parsing completes.
    async fn render(&self, file_path: &str) -> Result<(), EngineError>;

    /// Current displayed location. Synchronous, idempotent and safe to
    /// poll; `None` before the first render settles.
    fn current_location(&self) -> Option<LocationSnapshot>;

    /// Jump to a locator.
    ///
    /// Silently no-ops on an unrecognized locator; fails with
    /// [`EngineError::NotReady`] when parsing has not completed yet.
    async fn go_to(&self, locator: &str) -> Result<(), EngineError>;

    /// Table of contents; empty before the document is parsed
    fn table_of_contents(&self) -> Vec<TocEntry>;

    /// Archive paths of the linear reading order, in spine order
    fn spine(&self) -> Vec<String>;

    /// Full-text search, delegated entirely to the engine
    async fn search(&self, query: &str) -> Result<Vec<SearchMatch>, EngineError>;

    /// Subscribe to engine notifications
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}
