//! Core types for the Pagemark reading-position and library model

mod book;
mod position;
mod snapshot;
mod toc;

pub use book::{BookId, BookMetadata, BookRecord, ReaderPreferences};
pub use position::ReadingPosition;
pub use snapshot::{LocationSnapshot, PageSpread, SnapshotEdge};
pub use toc::TocEntry;
