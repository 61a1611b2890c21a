//! Scanner - single-flight background scan with cooperative cancellation
//!
//! This module contains the scan loop that coordinates:
//! - Connecting to the mailbox and walking the requested folders
//! - Feeding messages through link extraction into the article store
//! - Publishing progress snapshots under one lock
//! - Honoring cancellation at folder boundaries and every few messages
//! - Recording each finished scan in the scan history

use super::state::{percent, ScanState};
use super::{ScanError, ScanProgress, ScanRunSummary, ScanSettings, ScanStatus};
use super::{CANCELLED_MESSAGE, CANCEL_CHECK_INTERVAL};
use crate::extract::LinkExtractor;
use crate::mailbox::{MailboxConnector, MailboxSession};
use crate::message::{walk, NormalizedMessage};
use crate::storage::{ArticleStore, NewArticle, ScanRunRecord};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Handle to the scan engine
///
/// Cloning is cheap; all clones control the same scan state.
#[derive(Clone)]
pub struct Scanner {
    inner: Arc<ScannerInner>,
}

struct ScannerInner {
    state: Mutex<ScanState>,
    cancel_tx: mpsc::Sender<()>,
    cancel_rx: Mutex<mpsc::Receiver<()>>,
    connector: Arc<dyn MailboxConnector>,
    store: Arc<Mutex<dyn ArticleStore>>,
    extractor: LinkExtractor,
    settings: ScanSettings,
}

/// Acknowledgement of a started scan
///
/// Dropping the handle does not stop the scan.
pub struct ScanHandle {
    folders: Vec<String>,
    task: JoinHandle<ScanStatus>,
}

impl ScanHandle {
    /// Always `"started"`; a rejected scan never produces a handle
    pub fn status(&self) -> &'static str {
        "started"
    }

    /// Folders the scan walks, in order
    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    /// Waits for the scan to finish and returns its terminal status
    pub async fn join(self) -> ScanStatus {
        match self.task.await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!("Scan task failed: {}", e);
                ScanStatus::Error
            }
        }
    }
}

/// How a scan ended, before it is written to the shared state
enum Outcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl Scanner {
    /// Creates a scanner over a mailbox and an article store
    pub fn new(
        connector: Arc<dyn MailboxConnector>,
        store: Arc<Mutex<dyn ArticleStore>>,
        extractor: LinkExtractor,
        settings: ScanSettings,
    ) -> Self {
        let (cancel_tx, cancel_rx) = mpsc::channel(1);

        Self {
            inner: Arc::new(ScannerInner {
                state: Mutex::new(ScanState::default()),
                cancel_tx,
                cancel_rx: Mutex::new(cancel_rx),
                connector,
                store,
                extractor,
                settings,
            }),
        }
    }

    /// Starts a scan of `folders` on a background task
    ///
    /// An empty list scans the configured default folders. Progress is reset
    /// and any cancellation left over from a previous scan is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::AlreadyRunning`] if a scan is in flight; the
    /// running scan and its progress are left untouched. Returns
    /// [`ScanError::NoRuntime`] when called outside a Tokio runtime.
    pub fn start_scan(&self, folders: Vec<String>) -> Result<ScanHandle, ScanError> {
        let runtime = Handle::try_current().map_err(|_| ScanError::NoRuntime)?;

        let folders = if folders.is_empty() {
            self.inner.settings.default_folders.clone()
        } else {
            folders
        };

        {
            let mut state = self.inner.lock_state();
            if state.summary.is_running {
                return Err(ScanError::AlreadyRunning);
            }

            state.summary.is_running = true;
            state.progress = ScanProgress::starting(folders.len());
            self.inner.drain_cancellations();
        }

        let inner = Arc::clone(&self.inner);
        let task_folders = folders.clone();
        let task = runtime.spawn_blocking(move || inner.run(&task_folders));

        Ok(ScanHandle { folders, task })
    }

    /// Requests cancellation of the running scan
    ///
    /// The scan stops at the next folder boundary or cancel checkpoint. A
    /// second request while one is pending has no further effect.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotRunning`] when no scan is in flight.
    pub fn cancel_scan(&self) -> Result<(), ScanError> {
        let state = self.inner.lock_state();
        if !state.summary.is_running {
            return Err(ScanError::NotRunning);
        }

        match self.inner.cancel_tx.try_send(()) {
            Ok(()) => tracing::info!("Scan cancellation requested"),
            Err(TrySendError::Full(())) => tracing::debug!("Scan cancellation already pending"),
            Err(TrySendError::Closed(())) => tracing::warn!("Cancel channel closed"),
        }

        Ok(())
    }

    /// Returns a snapshot of the last scan outcome
    pub fn scan_status(&self) -> ScanRunSummary {
        self.inner.lock_state().summary.clone()
    }

    /// Returns a snapshot of the current scan progress
    pub fn scan_progress(&self) -> ScanProgress {
        self.inner.lock_state().progress.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_state().summary.is_running
    }
}

impl ScannerInner {
    fn lock_state(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut ScanProgress)) {
        f(&mut self.lock_state().progress);
    }

    fn drain_cancellations(&self) {
        let mut rx = self.cancel_rx.lock().unwrap_or_else(PoisonError::into_inner);
        while rx.try_recv().is_ok() {
            tracing::debug!("Discarded stale cancellation");
        }
    }

    fn cancel_requested(&self) -> bool {
        self.cancel_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .is_ok()
    }

    /// Runs one scan to its terminal state
    fn run(&self, folders: &[String]) -> ScanStatus {
        let mut guard = RunningGuard { inner: self, armed: true };
        let started_at = Utc::now();

        tracing::info!("Starting scan of {} folder(s): {}", folders.len(), folders.join(", "));

        let session = match self.connector.connect() {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Failed to connect to mailbox: {}", e);
                let outcome = Outcome::Failed(format!("failed to connect to mailbox: {}", e));
                return self.finish(&mut guard, outcome, folders, started_at);
            }
        };

        let mut session = SessionGuard(session);
        self.update(|p| p.status = ScanStatus::Scanning);

        let outcome = self.scan_folders(session.0.as_mut(), folders);
        drop(session);

        self.finish(&mut guard, outcome, folders, started_at)
    }

    fn scan_folders(&self, session: &mut dyn MailboxSession, folders: &[String]) -> Outcome {
        let total = folders.len();

        for (i, folder) in folders.iter().enumerate() {
            if self.cancel_requested() {
                return Outcome::Cancelled;
            }

            self.update(|p| {
                p.current_folder = folder.clone();
                p.folders_processed = i;
                p.percent_complete = percent(i, total);
            });
            tracing::info!("Scanning folder {} ({}/{})", folder, i + 1, total);

            let messages = match walk(
                session,
                folder,
                self.settings.message_limit,
                &self.extractor,
            ) {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!("Skipping folder {}: {}", folder, e);
                    continue;
                }
            };

            let fetched = messages.fetched();
            self.update(|p| p.emails_total += fetched);

            for (j, message) in messages.enumerate() {
                if j % CANCEL_CHECK_INTERVAL == 0 && self.cancel_requested() {
                    return Outcome::Cancelled;
                }

                let inserted = self.store_links(&message);
                self.update(|p| {
                    p.emails_processed += 1;
                    p.articles_found += inserted;
                });
            }
        }

        Outcome::Completed
    }

    /// Stores every link of a message and returns how many were new
    fn store_links(&self, message: &NormalizedMessage) -> usize {
        if message.links.is_empty() {
            return 0;
        }

        tracing::debug!(
            "Message '{}' from {} has {} link(s)",
            message.subject,
            message.sender,
            message.links.len()
        );

        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let mut inserted = 0;

        for link in &message.links {
            match store.insert_if_absent(&NewArticle::from_link(link, message)) {
                Ok(true) => inserted += 1,
                Ok(false) => tracing::trace!("Already indexed: {}", link.url),
                Err(e) => tracing::warn!("Failed to store {}: {}", link.url, e),
            }
        }

        inserted
    }

    /// Writes the terminal state, records the run and clears the running flag
    fn finish(
        &self,
        guard: &mut RunningGuard<'_>,
        outcome: Outcome,
        folders: &[String],
        started_at: DateTime<Utc>,
    ) -> ScanStatus {
        let finished_at = Utc::now();

        let (status, error) = match outcome {
            Outcome::Completed => (ScanStatus::Completed, None),
            Outcome::Cancelled => (ScanStatus::Cancelled, Some(CANCELLED_MESSAGE.to_string())),
            Outcome::Failed(message) => (ScanStatus::Error, Some(message)),
        };

        let progress = {
            let mut state = self.lock_state();
            state.progress.status = status;

            match status {
                ScanStatus::Completed => {
                    state.progress.percent_complete = 100;
                    state.progress.folders_processed = state.progress.folders_total;
                    state.summary.last_emails_scanned = state.progress.emails_processed;
                    state.summary.last_error = None;
                    state.summary.last_scan_time = Some(finished_at);
                }
                ScanStatus::Cancelled => {
                    state.summary.last_error = error.clone();
                    state.summary.last_scan_time = Some(finished_at);
                }
                _ => {
                    state.summary.last_error = error.clone();
                }
            }

            state.progress.clone()
        };

        tracing::info!(
            "Scan {}: {} email(s) scanned, {} new article(s)",
            status,
            progress.emails_processed,
            progress.articles_found
        );

        self.record_run(ScanRunRecord {
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            status,
            folders: folders.join(","),
            emails_scanned: progress.emails_processed as u64,
            articles_found: progress.articles_found as u64,
            error,
            config_hash: self.settings.config_hash.clone(),
        });

        self.lock_state().summary.is_running = false;
        guard.armed = false;

        status
    }

    fn record_run(&self, run: ScanRunRecord) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = store.record_scan_run(&run) {
            tracing::warn!("Failed to record scan run: {}", e);
        }
    }
}

/// Clears the running flag if the scan task unwinds before finishing
struct RunningGuard<'a> {
    inner: &'a ScannerInner,
    armed: bool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        tracing::error!("Scan task aborted");
        let mut state = self.inner.lock_state();
        state.progress.status = ScanStatus::Error;
        state.summary.last_error = Some("scan aborted unexpectedly".to_string());
        state.summary.is_running = false;
    }
}

/// Closes the mailbox session however the scan ends
struct SessionGuard(Box<dyn MailboxSession>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            tracing::warn!("Failed to close mailbox session: {}", e);
        }
    }
}
