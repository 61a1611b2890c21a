//! In-memory mailbox
//!
//! Folders and messages live in a shared map. Individual folders can be made
//! to fail on select and the whole mailbox can be made unreachable, which is
//! how scan behavior under partial failure is exercised.

use super::{MailboxConnector, MailboxError, MailboxResult, MailboxSession, RawMessage};
use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    folders: BTreeMap<String, Vec<RawMessage>>,
    failing: HashSet<String>,
    unreachable: bool,
}

/// Connector for a mailbox held in memory
///
/// Clones share the same folders, so a test can keep one handle while the
/// scanner owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailbox {
    state: Arc<Mutex<MemoryState>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to a folder, creating the folder if needed
    pub fn add_message(&self, folder: &str, message: RawMessage) {
        self.lock()
            .folders
            .entry(folder.to_string())
            .or_default()
            .push(message);
    }

    /// Creates an empty folder
    pub fn add_folder(&self, folder: &str) {
        self.lock().folders.entry(folder.to_string()).or_default();
    }

    /// Makes selecting `folder` fail with a fetch error
    pub fn fail_folder(&self, folder: &str) {
        self.lock().failing.insert(folder.to_string());
    }

    /// Makes every connection attempt fail
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Number of sessions opened so far
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of sessions closed so far
    pub fn sessions_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MailboxConnector for MemoryMailbox {
    fn connect(&self) -> MailboxResult<Box<dyn MailboxSession>> {
        if self.lock().unreachable {
            return Err(MailboxError::Connect("mailbox unreachable".to_string()));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemorySession {
            mailbox: self.clone(),
            selected: None,
            closed: false,
        }))
    }
}

struct MemorySession {
    mailbox: MemoryMailbox,
    selected: Option<String>,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> MailboxResult<()> {
        if self.closed {
            Err(MailboxError::Closed)
        } else {
            Ok(())
        }
    }
}

impl MailboxSession for MemorySession {
    fn list_folders(&mut self) -> MailboxResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.mailbox.lock().folders.keys().cloned().collect())
    }

    fn select_folder(&mut self, folder: &str) -> MailboxResult<u32> {
        self.ensure_open()?;
        let state = self.mailbox.lock();

        if state.failing.contains(folder) {
            return Err(MailboxError::Fetch {
                folder: folder.to_string(),
                message: "select rejected".to_string(),
            });
        }

        let messages = state
            .folders
            .get(folder)
            .ok_or_else(|| MailboxError::FolderNotFound(folder.to_string()))?;

        let total = u32::try_from(messages.len()).unwrap_or(u32::MAX);
        self.selected = Some(folder.to_string());
        Ok(total)
    }

    fn fetch_range(&mut self, range: RangeInclusive<u32>) -> MailboxResult<Vec<RawMessage>> {
        self.ensure_open()?;

        let folder = self.selected.as_deref().ok_or_else(|| MailboxError::Fetch {
            folder: String::new(),
            message: "no folder selected".to_string(),
        })?;

        let state = self.mailbox.lock();
        let messages = state
            .folders
            .get(folder)
            .ok_or_else(|| MailboxError::FolderNotFound(folder.to_string()))?;

        Ok(range
            .filter_map(|seq| (seq as usize).checked_sub(1))
            .filter_map(|idx| messages.get(idx).cloned())
            .collect())
    }

    fn close(&mut self) -> MailboxResult<()> {
        if !self.closed {
            self.closed = true;
            self.mailbox.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
