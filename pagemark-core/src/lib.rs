//! Pagemark Core Library
//!
//! This crate provides the reading-position and library-persistence core of
//! the Pagemark ebook reader. Raw location reports from a rendering engine
//! are normalized into canonical positions, reconciled against what the
//! reader has already seen, and written through to durable storage; opening
//! a book restores the reader to wherever they left off.

pub mod codec;
pub mod engine;
pub mod error;
pub mod library;
pub mod reconciler;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod types;

pub use codec::PositionCandidate;
pub use engine::{EngineEvent, RenderingEngine, SearchMatch};
pub use error::{EngineError, PagemarkError, Result, StoreError};
pub use library::LibraryStore;
pub use reconciler::{Decision, ProgressReconciler, RejectReason};
pub use resolver::NavigationResolver;
pub use session::{ReadingSession, SessionOptions, SessionPhase};
pub use types::{
    BookId, BookMetadata, BookRecord, LocationSnapshot, PageSpread, ReaderPreferences,
    ReadingPosition, SnapshotEdge, TocEntry,
};
