//! The persisted library record and its import-time inputs

use super::ReadingPosition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identifier for a library entry, assigned once at import.
pub type BookId = Uuid;

/// One library entry: descriptive metadata plus the durable reading state.
///
/// The record exclusively owns the blobs behind `file_path` and `cover_path`;
/// deleting the record deletes the blobs. Position fields are only written
/// through [`BookRecord::apply_position`] so the position-related subset stays
/// consistent as a unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookRecord {
    /// Unique identifier, immutable after import
    pub id: BookId,

    /// Display title (defaulted at import when the source has none)
    pub title: String,

    pub author: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub rights: Option<String>,

    /// Store path of the book file, owned by this record
    pub file_path: String,

    /// Store path of the cover image, owned by this record
    pub cover_path: Option<String>,

    /// Size of the book file in bytes, immutable once set
    pub file_size: u64,

    /// Import timestamp, immutable once set
    pub added_at: DateTime<Utc>,

    /// User-assigned tags; insertion order is irrelevant
    pub categories: BTreeSet<String>,

    /// Reading progress as a whole percentage, `0..=100`
    pub reading_progress: u8,

    /// Last known page within the engine's pagination. Advisory only:
    /// pagination depends on display size and is not stable across sessions.
    pub current_page: u32,

    /// Last persisted content-fragment locator. The authoritative resume
    /// point, more precise than `reading_progress`. Only ever resolvable
    /// against this record's own book file.
    pub locator: Option<String>,

    /// Updated on every accepted, persisted position change
    pub last_read: Option<DateTime<Utc>>,

    /// Display preferences; independent lifecycle from the reading position
    pub preferences: ReaderPreferences,
}

impl BookRecord {
    /// Create a record at import time.
    ///
    /// All defaulting of optional metadata happens here and nowhere else;
    /// progress fields start zeroed and the locator empty.
    pub fn from_import(
        id: BookId,
        metadata: BookMetadata,
        file_path: impl Into<String>,
        cover_path: Option<String>,
        file_size: u64,
    ) -> Self {
        Self {
            id,
            title: metadata.title.unwrap_or_else(|| "Untitled".to_string()),
            author: metadata.author,
            publisher: metadata.publisher,
            language: metadata.language,
            description: metadata.description,
            rights: metadata.rights,
            file_path: file_path.into(),
            cover_path,
            file_size,
            added_at: Utc::now(),
            categories: BTreeSet::new(),
            reading_progress: 0,
            current_page: 0,
            locator: None,
            last_read: None,
            preferences: ReaderPreferences::default(),
        }
    }

    /// Merge an accepted position into the record.
    ///
    /// Touches only the position-related fields; metadata, categories and
    /// preferences are left untouched so concurrent mutators of those field
    /// sets cannot clobber each other.
    pub fn apply_position(&mut self, position: &ReadingPosition) {
        self.reading_progress = position.progress_percent;
        self.current_page = position.page;
        self.locator = Some(position.locator.clone());
        self.last_read = Some(position.captured_at);
    }

    /// Clear the reading position back to the start of the book.
    ///
    /// An explicit reset is a legitimate forward action, not a regression;
    /// `last_read` is kept as reading history.
    pub fn clear_position(&mut self) {
        self.reading_progress = 0;
        self.current_page = 0;
        self.locator = None;
    }
}

/// Descriptive metadata captured at import, before a record exists.
///
/// Every field is optional; [`BookRecord::from_import`] applies the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub rights: Option<String>,
}

impl BookMetadata {
    /// Metadata carrying only a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Per-book display preferences.
///
/// Defaults live in the `Default` impl and nowhere else; call sites never
/// fill in their own fallback values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderPreferences {
    /// Font size in points
    pub font_size: u16,

    /// Font family name; `None` means the engine's default face
    pub font_family: Option<String>,

    /// Line height multiplier
    pub line_height: f32,

    /// Whether pages turn automatically while reading
    pub auto_page_turn: bool,

    /// Seconds between automatic page turns
    pub auto_page_turn_interval_secs: u32,
}

impl Default for ReaderPreferences {
    fn default() -> Self {
        Self {
            font_size: 16,
            font_family: None,
            line_height: 1.5,
            auto_page_turn: false,
            auto_page_turn_interval_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_zeroes_position_fields() {
        let record = BookRecord::from_import(
            Uuid::new_v4(),
            BookMetadata::titled("Wuthering Heights").with_author("Emily Brontë"),
            "books/a.epub",
            None,
            1024,
        );

        assert_eq!(record.title, "Wuthering Heights");
        assert_eq!(record.reading_progress, 0);
        assert_eq!(record.current_page, 0);
        assert!(record.locator.is_none());
        assert!(record.last_read.is_none());
        assert!(record.categories.is_empty());
    }

    #[test]
    fn test_import_defaults_missing_title() {
        let record =
            BookRecord::from_import(Uuid::new_v4(), BookMetadata::default(), "b.epub", None, 1);
        assert_eq!(record.title, "Untitled");
    }

    #[test]
    fn test_apply_position_leaves_other_field_sets_alone() {
        let mut record = BookRecord::from_import(
            Uuid::new_v4(),
            BookMetadata::titled("T"),
            "books/t.epub",
            None,
            10,
        );
        record.categories.insert("fiction".to_string());

        let position = ReadingPosition {
            progress_percent: 42,
            page: 7,
            locator: "epubcfi(/6/8!/4/2/1:0)".to_string(),
            captured_at: Utc::now(),
        };
        record.apply_position(&position);

        assert_eq!(record.reading_progress, 42);
        assert_eq!(record.current_page, 7);
        assert_eq!(record.locator.as_deref(), Some("epubcfi(/6/8!/4/2/1:0)"));
        assert_eq!(record.last_read, Some(position.captured_at));
        assert!(record.categories.contains("fiction"));
        assert_eq!(record.preferences, ReaderPreferences::default());
    }

    #[test]
    fn test_clear_position_keeps_history() {
        let mut record = BookRecord::from_import(
            Uuid::new_v4(),
            BookMetadata::titled("T"),
            "books/t.epub",
            None,
            10,
        );
        let position = ReadingPosition {
            progress_percent: 90,
            page: 300,
            locator: "epubcfi(/6/40!/4/2/1:0)".to_string(),
            captured_at: Utc::now(),
        };
        record.apply_position(&position);
        record.clear_position();

        assert_eq!(record.reading_progress, 0);
        assert_eq!(record.current_page, 0);
        assert!(record.locator.is_none());
        assert!(record.last_read.is_some());
    }
}
