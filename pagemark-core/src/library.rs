//! The book library: in-memory index with write-through persistence
//!
//! All record mutation happens in memory under one `RwLock`; every mutation
//! is followed by a flush of the whole index through the metadata store.
//! Flushes are serialized by a single gate so concurrent writers cannot
//! interleave partial snapshots, and each flush serializes the index as it
//! stands at that moment. Two tasks updating different fields of the same
//! record therefore both survive: whichever flush runs last carries both
//! in-memory changes.

use crate::error::{Result, StoreError};
use crate::storage::{BlobStore, MetadataStore};
use crate::types::{BookId, BookMetadata, BookRecord, ReaderPreferences, ReadingPosition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Key of the serialized index in the metadata store.
const LIBRARY_KEY: &str = "library.json";

/// On-disk shape of the index.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    books: HashMap<BookId, BookRecord>,
}

/// Handle to the library. Cheap to clone; clones share the same index.
#[derive(Clone)]
pub struct LibraryStore {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    index: Arc<RwLock<HashMap<BookId, BookRecord>>>,
    flush_gate: Arc<Mutex<()>>,
}

impl LibraryStore {
    /// Open the library, loading the persisted index if one exists.
    ///
    /// A missing index starts empty; a corrupt one is logged and discarded
    /// rather than blocking the whole library.
    pub async fn open(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Result<Self> {
        let books = match metadata.get(LIBRARY_KEY).await? {
            Some(data) => match serde_json::from_slice::<IndexFile>(&data) {
                Ok(file) => file.books,
                Err(e) => {
                    warn!("library index unreadable, starting fresh: {}", e);
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        debug!(books = books.len(), "library opened");

        Ok(Self {
            metadata,
            blobs,
            index: Arc::new(RwLock::new(books)),
            flush_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Write the full index through to the metadata store.
    ///
    /// The gate admits one flush at a time; the snapshot is taken after the
    /// gate is held, so a flush that wins the gate carries every in-memory
    /// change made before it.
    pub async fn flush(&self) -> Result<()> {
        let _gate = self.flush_gate.lock().await;

        let snapshot = {
            let index = self.index.read().await;
            IndexFile {
                books: index.clone(),
            }
        };
        let data = serde_json::to_vec_pretty(&snapshot).map_err(StoreError::from)?;
        self.metadata.put(LIBRARY_KEY, data).await?;

        debug!(books = snapshot.books.len(), "library index flushed");
        Ok(())
    }

    pub async fn get(&self, id: BookId) -> Option<BookRecord> {
        self.index.read().await.get(&id).cloned()
    }

    /// Like [`get`](Self::get), but a missing record is an error.
    pub async fn require(&self, id: BookId) -> Result<BookRecord> {
        self.get(id)
            .await
            .ok_or_else(|| StoreError::RecordNotFound(id).into())
    }

    pub async fn contains(&self, id: BookId) -> bool {
        self.index.read().await.contains_key(&id)
    }

    /// All records, sorted by title.
    pub async fn list(&self) -> Vec<BookRecord> {
        let mut books: Vec<BookRecord> = self.index.read().await.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        books
    }

    /// Records whose title or author contains the query, case-insensitively.
    pub async fn search(&self, query: &str) -> Vec<BookRecord> {
        let needle = query.to_lowercase();
        let mut books: Vec<BookRecord> = self
            .index
            .read()
            .await
            .values()
            .filter(|record| {
                record.title.to_lowercase().contains(&needle)
                    || record
                        .author
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        books
    }

    /// Import a book file (and optional cover) into the library.
    ///
    /// Blobs are written before the record becomes visible, so a crash
    /// mid-import leaves orphaned blobs, never a record without its file.
    pub async fn import(
        &self,
        data: Vec<u8>,
        metadata: BookMetadata,
        cover: Option<Vec<u8>>,
    ) -> Result<BookRecord> {
        let id = Uuid::new_v4();
        let file_size = data.len() as u64;
        let file_path = Self::book_blob_path(id);
        self.blobs.write(&file_path, data).await?;

        let cover_path = match cover {
            Some(bytes) => {
                let path = Self::cover_blob_path(id);
                self.blobs.write(&path, bytes).await?;
                Some(path)
            }
            None => None,
        };

        let record = BookRecord::from_import(id, metadata, file_path, cover_path, file_size);
        self.index.write().await.insert(id, record.clone());
        self.flush().await?;

        info!(%id, title = %record.title, "book imported");
        Ok(record)
    }

    /// Merge an accepted reading position into a record.
    ///
    /// Returns `false` without flushing when the record no longer exists;
    /// a save racing a delete must not resurrect the book.
    pub async fn update_position(&self, id: BookId, position: &ReadingPosition) -> Result<bool> {
        {
            let mut index = self.index.write().await;
            match index.get_mut(&id) {
                Some(record) => record.apply_position(position),
                None => return Ok(false),
            }
        }
        self.flush().await?;
        Ok(true)
    }

    /// Clear a record's position back to unread.
    pub async fn reset_position(&self, id: BookId) -> Result<bool> {
        {
            let mut index = self.index.write().await;
            match index.get_mut(&id) {
                Some(record) => record.clear_position(),
                None => return Ok(false),
            }
        }
        self.flush().await?;
        info!(%id, "reading position reset");
        Ok(true)
    }

    pub async fn update_preferences(
        &self,
        id: BookId,
        preferences: ReaderPreferences,
    ) -> Result<bool> {
        {
            let mut index = self.index.write().await;
            match index.get_mut(&id) {
                Some(record) => record.preferences = preferences,
                None => return Ok(false),
            }
        }
        self.flush().await?;
        Ok(true)
    }

    /// Replace a record's whole category set in one serialized write.
    ///
    /// Categories are their own field family: a concurrent position or
    /// preference update to the same record survives alongside the replace.
    pub async fn upsert_categories(&self, id: BookId, categories: BTreeSet<String>) -> Result<bool> {
        {
            let mut index = self.index.write().await;
            match index.get_mut(&id) {
                Some(record) => record.categories = categories,
                None => return Ok(false),
            }
        }
        self.flush().await?;
        Ok(true)
    }

    pub async fn add_category(&self, id: BookId, category: &str) -> Result<bool> {
        {
            let mut index = self.index.write().await;
            match index.get_mut(&id) {
                Some(record) => {
                    record.categories.insert(category.to_string());
                }
                None => return Ok(false),
            }
        }
        self.flush().await?;
        Ok(true)
    }

    pub async fn remove_category(&self, id: BookId, category: &str) -> Result<bool> {
        {
            let mut index = self.index.write().await;
            match index.get_mut(&id) {
                Some(record) => {
                    record.categories.remove(category);
                }
                None => return Ok(false),
            }
        }
        self.flush().await?;
        Ok(true)
    }

    /// Remove a book and its blobs.
    ///
    /// The index flush happens before blob deletion; if the flush fails the
    /// record is restored so the index never references files it already
    /// forgot. Blob deletion itself is best effort.
    pub async fn delete(&self, id: BookId) -> Result<bool> {
        let removed = self.index.write().await.remove(&id);
        let record = match removed {
            Some(record) => record,
            None => return Ok(false),
        };

        if let Err(e) = self.flush().await {
            self.index.write().await.insert(id, record);
            return Err(e);
        }

        if let Err(e) = self.blobs.delete(&record.file_path).await {
            warn!(%id, "book file not removed: {}", e);
        }
        if let Some(cover_path) = &record.cover_path {
            if let Err(e) = self.blobs.delete(cover_path).await {
                warn!(%id, "cover not removed: {}", e);
            }
        }

        info!(%id, title = %record.title, "book deleted");
        Ok(true)
    }

    /// Whether the record's book file is actually present in blob storage.
    pub async fn has_book_file(&self, record: &BookRecord) -> Result<bool> {
        Ok(self.blobs.exists(&record.file_path).await?)
    }

    pub async fn read_book_file(&self, record: &BookRecord) -> Result<Vec<u8>> {
        Ok(self.blobs.read(&record.file_path).await?)
    }

    fn book_blob_path(id: BookId) -> String {
        format!("books/{id}.epub")
    }

    fn cover_blob_path(id: BookId) -> String {
        format!("covers/{id}.img")
    }
}
