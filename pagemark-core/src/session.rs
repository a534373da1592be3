//! Reading session lifecycle
//!
//! A session ties one book, one rendering engine and the library together
//! for the duration of a reading sitting. Opening a session loads and
//! restores the stored position, then hands off to a background worker that
//! consumes both engine location events and a periodic poll of the engine's
//! current location. Both producers funnel into the same reconciler, so a
//! missed event is recovered by the next poll and a duplicate observation
//! is dropped no matter which path delivered it. Closing the session stops
//! the worker and forces a final position flush.

use crate::codec;
use crate::engine::{EngineEvent, RenderingEngine, SearchMatch};
use crate::error::{Result, StoreError};
use crate::library::LibraryStore;
use crate::reconciler::{Decision, ProgressReconciler};
use crate::resolver::NavigationResolver;
use crate::types::{BookId, LocationSnapshot, ReadingPosition, TocEntry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Tuning knobs for a session. `Default` matches the reader UI's behavior.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// How often the worker polls the engine's current location. Must be
    /// non-zero.
    pub poll_interval: Duration,

    /// Pause before the single retry of a failed restore jump
    pub restore_retry_delay: Duration,

    /// How long to wait for the engine's ready signal before proceeding
    /// anyway
    pub ready_timeout: Duration,

    /// Minimum whole-percentage movement before an accepted position is
    /// written through mid-session
    pub persist_threshold: u8,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            restore_retry_delay: Duration::from_millis(500),
            ready_timeout: Duration::from_secs(5),
            persist_threshold: 1,
        }
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Book is being loaded into the engine
    Loading,
    /// Stored position is being restored
    Restoring,
    /// Worker is consuming observations
    Active,
    /// Session closed, final flush done
    Unmounted,
}

/// Messages into the worker from save tasks and the session handle.
#[derive(Debug)]
enum SessionMsg {
    SaveDone { progress: u8 },
    Reset,
}

/// Handle to an open reading session.
///
/// Dropping the handle without [`close`](Self::close) also shuts the worker
/// down and flushes, but `close` waits until the flush has happened.
pub struct ReadingSession {
    book_id: BookId,
    store: LibraryStore,
    engine: Arc<dyn RenderingEngine>,
    resolver: NavigationResolver,
    msg_tx: mpsc::Sender<SessionMsg>,
    shutdown_tx: watch::Sender<bool>,
    phase_tx: watch::Sender<SessionPhase>,
    phase_rx: watch::Receiver<SessionPhase>,
    progress_rx: watch::Receiver<u8>,
    task: JoinHandle<()>,
}

impl ReadingSession {
    /// Open a session: load the book into the engine, restore the stored
    /// position, start the observation worker.
    ///
    /// Fails when the record does not exist or its book file is gone from
    /// blob storage. Engine readiness and restore failures degrade instead:
    /// the session comes up at the engine's default position.
    pub async fn open(
        store: LibraryStore,
        engine: Arc<dyn RenderingEngine>,
        book_id: BookId,
        options: SessionOptions,
    ) -> Result<Self> {
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Loading);

        let record = store.require(book_id).await?;
        if !store.has_book_file(&record).await? {
            return Err(StoreError::BlobMissing(record.file_path).into());
        }

        // Subscribe before render so the ready signal cannot slip past.
        let mut events = engine.subscribe();
        engine.render(&record.file_path).await?;

        let ready_wait = tokio::time::timeout(options.ready_timeout, async {
            loop {
                match events.recv().await {
                    Ok(EngineEvent::Ready) => break,
                    // Location reports before restore are default-position
                    // noise and must not reach the reconciler.
                    Ok(EngineEvent::LocationChanged(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        if ready_wait.await.is_err() {
            warn!(book = %book_id, "no ready signal from engine, continuing");
        }

        let resolver = NavigationResolver::new(engine.spine());

        let _ = phase_tx.send(SessionPhase::Restoring);
        if let Some(stored) = &record.locator {
            match codec::denormalize(stored, &resolver) {
                Some(target) => {
                    if let Err(e) = engine.go_to(&target).await {
                        debug!(book = %book_id, "restore jump failed, retrying: {}", e);
                        tokio::time::sleep(options.restore_retry_delay).await;
                        if let Err(e) = engine.go_to(&target).await {
                            warn!(
                                book = %book_id,
                                "restore failed twice, reading from default position: {}", e
                            );
                        }
                    }
                }
                None => {
                    debug!(book = %book_id, locator = %stored, "stored locator unusable");
                }
            }
        }

        let mut reconciler = ProgressReconciler::new(options.persist_threshold);
        reconciler.resume_from(record.reading_progress, record.locator.clone());

        let (progress_tx, progress_rx) = watch::channel(record.reading_progress);
        let (msg_tx, msg_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = SessionWorker {
            book_id,
            store: store.clone(),
            engine: engine.clone(),
            resolver: resolver.clone(),
            reconciler,
            progress_tx,
            msg_tx: msg_tx.clone(),
            // A fresh book lands wherever the engine defaults to, which is
            // often the contents page. Armed exactly once per session.
            auto_skip_armed: record.locator.is_none(),
            save_task: None,
        };
        let task = tokio::spawn(worker.run(events, msg_rx, shutdown_rx, options.poll_interval));

        let _ = phase_tx.send(SessionPhase::Active);
        info!(book = %book_id, progress = record.reading_progress, "reading session opened");

        Ok(Self {
            book_id,
            store,
            engine,
            resolver,
            msg_tx,
            shutdown_tx,
            phase_tx,
            phase_rx,
            progress_rx,
            task,
        })
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase_rx.borrow()
    }

    /// Watch phase transitions, including the final `Unmounted` after
    /// [`close`](Self::close).
    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_rx.clone()
    }

    /// Last accepted progress, as shown to the reader.
    pub fn progress(&self) -> u8 {
        *self.progress_rx.borrow()
    }

    /// Watch progress updates as they are accepted.
    pub fn watch_progress(&self) -> watch::Receiver<u8> {
        self.progress_rx.clone()
    }

    pub fn table_of_contents(&self) -> Vec<TocEntry> {
        self.engine.table_of_contents()
    }

    /// Navigate to a TOC entry. An entry with no resolvable target is
    /// ignored.
    pub async fn jump_to(&self, entry: &TocEntry) -> Result<()> {
        match self.resolver.resolve(entry) {
            Some(locator) => Ok(self.engine.go_to(&locator).await?),
            None => Ok(()),
        }
    }

    /// Navigate to a locator or document reference, as returned by search
    /// results or stored elsewhere. Unusable references are ignored.
    pub async fn jump_to_locator(&self, locator: &str) -> Result<()> {
        match codec::denormalize(locator, &self.resolver) {
            Some(target) => Ok(self.engine.go_to(&target).await?),
            None => Ok(()),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchMatch>> {
        Ok(self.engine.search(query).await?)
    }

    /// Throw away all progress and return to the start of the book.
    ///
    /// The stored record is cleared first, then the reconciler, so the
    /// zero-progress observations that follow are accepted rather than
    /// rejected as regressions. An observation racing the reset may be
    /// rejected once; the next poll re-delivers it.
    pub async fn restart_from_beginning(&self) -> Result<()> {
        self.store.reset_position(self.book_id).await?;
        let _ = self.msg_tx.send(SessionMsg::Reset).await;
        self.engine.go_to(&codec::spine_start_locator(0)).await?;
        Ok(())
    }

    /// Close the session: stop the worker and wait for the final flush.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(book = %self.book_id, "session worker ended abnormally: {}", e);
        }
        let _ = self.phase_tx.send(SessionPhase::Unmounted);
        info!(book = %self.book_id, "reading session closed");
    }
}

/// Background owner of the reconciler. All observation and save-completion
/// handling is single-threaded through here.
struct SessionWorker {
    book_id: BookId,
    store: LibraryStore,
    engine: Arc<dyn RenderingEngine>,
    resolver: NavigationResolver,
    reconciler: ProgressReconciler,
    progress_tx: watch::Sender<u8>,
    msg_tx: mpsc::Sender<SessionMsg>,
    auto_skip_armed: bool,
    /// The in-flight save task, if any. The reconciler admits one save at a
    /// time, so a new save only ever replaces a task whose store write has
    /// already completed.
    save_task: Option<JoinHandle<()>>,
}

impl SessionWorker {
    async fn run(
        mut self,
        mut events: broadcast::Receiver<EngineEvent>,
        mut messages: mpsc::Receiver<SessionMsg>,
        mut shutdown: watch::Receiver<bool>,
        poll_interval: Duration,
    ) {
        let mut poll = tokio::time::interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        loop {
            tokio::select! {
                event = events.recv(), if events_open => match event {
                    Ok(EngineEvent::LocationChanged(snapshot)) => {
                        self.handle_observation(snapshot).await;
                    }
                    Ok(EngineEvent::Ready) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "engine event stream lagged, poll will catch up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        events_open = false;
                    }
                },
                _ = poll.tick() => {
                    if let Some(snapshot) = self.engine.current_location() {
                        self.handle_observation(snapshot).await;
                    }
                }
                Some(msg) = messages.recv() => match msg {
                    SessionMsg::SaveDone { progress } => {
                        self.reconciler.save_completed(progress);
                    }
                    SessionMsg::Reset => {
                        self.reconciler.reset();
                        let _ = self.progress_tx.send(0);
                    }
                },
                _ = shutdown.changed() => break,
            }
        }

        // A straggling save carries an older position than the reconciler's
        // final state; it has to reach the store before the final flush, or
        // the store's write gate would apply it second and roll the record
        // back.
        if let Some(save) = self.save_task.take() {
            let _ = save.await;
        }
        self.final_flush().await;
    }

    async fn handle_observation(&mut self, snapshot: LocationSnapshot) {
        let Some(candidate) = codec::normalize(&snapshot) else {
            return;
        };

        if self.auto_skip_armed {
            self.auto_skip_armed = false;
            if candidate.front_matter && candidate.position.progress_percent == 0 {
                if let Some(target) = self.resolver.first_content_locator() {
                    info!(book = %self.book_id, "skipping front matter to first content");
                    if let Err(e) = self.engine.go_to(&target).await {
                        warn!(book = %self.book_id, "front matter skip failed: {}", e);
                    }
                }
            }
        }

        match self.reconciler.observe(&candidate) {
            Decision::Reject(reason) => {
                trace!(?reason, locator = %candidate.position.locator, "observation rejected");
            }
            Decision::Accept { persist } => {
                let _ = self.progress_tx.send(candidate.position.progress_percent);
                if let Some(position) = persist {
                    self.spawn_save(position);
                }
            }
        }
    }

    /// Issue an asynchronous save. Completion is reported back through the
    /// message channel whatever the outcome, so the in-flight gate always
    /// clears. The handle is retained so shutdown can order the write before
    /// the final flush.
    fn spawn_save(&mut self, position: ReadingPosition) {
        let store = self.store.clone();
        let msg_tx = self.msg_tx.clone();
        let book_id = self.book_id;
        self.save_task = Some(tokio::spawn(async move {
            let progress = position.progress_percent;
            match store.update_position(book_id, &position).await {
                Ok(true) => trace!(book = %book_id, progress, "position saved"),
                Ok(false) => debug!(book = %book_id, "record gone, position save dropped"),
                Err(e) => warn!(book = %book_id, "position save failed: {}", e),
            }
            let _ = msg_tx.send(SessionMsg::SaveDone { progress }).await;
        }));
    }

    async fn final_flush(&self) {
        let Some(position) = self.reconciler.final_position() else {
            return;
        };
        match self.store.update_position(self.book_id, &position).await {
            Ok(true) => {
                debug!(
                    book = %self.book_id,
                    progress = position.progress_percent,
                    "final position flushed"
                );
            }
            Ok(false) => debug!(book = %self.book_id, "record gone, final position dropped"),
            Err(e) => warn!(book = %self.book_id, "final position flush failed: {}", e),
        }
    }
}
