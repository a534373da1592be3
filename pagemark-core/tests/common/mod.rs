//! Shared fixtures for the integration tests

use async_trait::async_trait;
use pagemark_core::engine::{EngineEvent, RenderingEngine, SearchMatch};
use pagemark_core::error::{EngineError, StoreError};
use pagemark_core::storage::{MemoryStorage, MetadataStore, StorageResult};
use pagemark_core::types::{BookId, LocationSnapshot, SnapshotEdge, TocEntry};
use pagemark_core::LibraryStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Rendering engine driven entirely by the test.
///
/// Jumps are recorded but never move the reported location; tests script
/// the location explicitly so event and poll paths can be exercised
/// independently.
pub struct ScriptedEngine {
    events: broadcast::Sender<EngineEvent>,
    location: Mutex<Option<LocationSnapshot>>,
    spine: Vec<String>,
    toc: Vec<TocEntry>,
    search_results: Vec<SearchMatch>,
    goto_log: Mutex<Vec<String>>,
    fail_gotos: AtomicUsize,
    fail_render: AtomicBool,
    silent_mount: bool,
    rendered: Mutex<Option<String>>,
}

impl ScriptedEngine {
    pub fn new(spine: &[&str]) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            location: Mutex::new(None),
            spine: spine.iter().map(|s| s.to_string()).collect(),
            toc: Vec::new(),
            search_results: Vec::new(),
            goto_log: Mutex::new(Vec::new()),
            fail_gotos: AtomicUsize::new(0),
            fail_render: AtomicBool::new(false),
            silent_mount: false,
            rendered: Mutex::new(None),
        }
    }

    pub fn with_toc(mut self, toc: Vec<TocEntry>) -> Self {
        self.toc = toc;
        self
    }

    pub fn with_search_results(mut self, results: Vec<SearchMatch>) -> Self {
        self.search_results = results;
        self
    }

    /// Never emit the ready signal on render.
    pub fn without_ready_signal(mut self) -> Self {
        self.silent_mount = true;
        self
    }

    /// Make the next `count` jumps fail.
    pub fn fail_next_gotos(&self, count: usize) {
        self.fail_gotos.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_render(&self) {
        self.fail_render.store(true, Ordering::SeqCst);
    }

    /// Every locator passed to `go_to`, in call order.
    pub fn goto_log(&self) -> Vec<String> {
        self.goto_log.lock().unwrap().clone()
    }

    pub fn rendered_path(&self) -> Option<String> {
        self.rendered.lock().unwrap().clone()
    }

    /// Set the current location and notify subscribers.
    pub fn emit_location(&self, snapshot: LocationSnapshot) {
        *self.location.lock().unwrap() = Some(snapshot.clone());
        let _ = self.events.send(EngineEvent::LocationChanged(snapshot));
    }

    /// Set the current location without an event; only polling sees it.
    pub fn set_location_silently(&self, snapshot: LocationSnapshot) {
        *self.location.lock().unwrap() = Some(snapshot);
    }
}

#[async_trait]
impl RenderingEngine for ScriptedEngine {
    async fn render(&self, file_path: &str) -> Result<(), EngineError> {
        if self.fail_render.load(Ordering::SeqCst) {
            return Err(EngineError::Failed("scripted render failure".to_string()));
        }
        *self.rendered.lock().unwrap() = Some(file_path.to_string());
        if !self.silent_mount {
            let _ = self.events.send(EngineEvent::Ready);
        }
        Ok(())
    }

    fn current_location(&self) -> Option<LocationSnapshot> {
        self.location.lock().unwrap().clone()
    }

    async fn go_to(&self, locator: &str) -> Result<(), EngineError> {
        self.goto_log.lock().unwrap().push(locator.to_string());
        let remaining = self.fail_gotos.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_gotos.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::Failed("scripted jump failure".to_string()));
        }
        Ok(())
    }

    fn table_of_contents(&self) -> Vec<TocEntry> {
        self.toc.clone()
    }

    fn spine(&self) -> Vec<String> {
        self.spine.clone()
    }

    async fn search(&self, _query: &str) -> Result<Vec<SearchMatch>, EngineError> {
        Ok(self.search_results.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

/// Metadata store wrapper that counts writes and can be told to fail.
pub struct CountingStore {
    inner: Arc<MemoryStorage>,
    puts: AtomicUsize,
    fail_puts: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<MemoryStorage>) -> Self {
        Self {
            inner,
            puts: AtomicUsize::new(0),
            fail_puts: AtomicUsize::new(0),
        }
    }

    /// Number of writes attempted so far, failed ones included.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn fail_next_puts(&self, count: usize) {
        self.fail_puts.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetadataStore for CountingStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_puts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_puts.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Persistence("scripted write failure".to_string()));
        }
        self.inner.put(key, data).await
    }
}

/// A location report with a percentage reading and a document href.
pub fn snapshot_at(cfi: &str, fraction: f64, href: &str) -> LocationSnapshot {
    LocationSnapshot {
        end: SnapshotEdge {
            cfi: Some(cfi.to_string()),
            percentage: Some(fraction),
            href: Some(href.to_string()),
            ..SnapshotEdge::default()
        },
        ..LocationSnapshot::default()
    }
}

/// A location report from the contents page at zero progress.
pub fn contents_page_snapshot(cfi: &str) -> LocationSnapshot {
    snapshot_at(cfi, 0.0, "OEBPS/toc.xhtml")
}

/// Poll a condition until it holds or two seconds pass.
pub async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Wait for a record's persisted progress to reach the given value.
pub async fn wait_for_saved_progress(store: &LibraryStore, id: BookId, want: u8) {
    for _ in 0..200 {
        if let Some(record) = store.get(id).await {
            if record.reading_progress == want {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("progress {want} was never persisted");
}
