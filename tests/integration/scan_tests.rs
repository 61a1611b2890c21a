//! Integration tests for the scan pipeline
//!
//! These tests drive the scanner end-to-end against in-memory and on-disk
//! mailboxes, using gated collaborators to hold the scan task at a known
//! point while the test inspects or cancels it.

use mailsift::extract::LinkExtractor;
use mailsift::mailbox::{
    DirectoryMailbox, MailboxConnector, MailboxResult, MailboxSession, MemoryMailbox, RawMessage,
};
use mailsift::scan::{ScanError, ScanSettings, ScanStatus, Scanner};
use mailsift::storage::{
    ArticleStore, NewArticle, SqliteArticleStore, StorageError, StorageResult,
};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const GATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates a newsletter message with one article link
fn newsletter(folder: &str, n: usize) -> RawMessage {
    RawMessage::parse(
        format!(
            "From: Systems Weekly <weekly@example.com>\r\n\
             Subject: Issue {n}\r\n\
             Date: Mon, 4 Mar 2024 09:00:00 +0000\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             \r\n\
             <table><tr><td><h2>Lessons From Running Databases Part {n}</h2>\
             <a href=\"https://blog.example.com/{folder}/{n}?utm_source=weekly#top\">Read more</a></td></tr></table>"
        )
        .into_bytes(),
    )
}

fn scanner_with(
    connector: Arc<dyn MailboxConnector>,
    store: Arc<Mutex<dyn ArticleStore>>,
) -> Scanner {
    Scanner::new(
        connector,
        store,
        LinkExtractor::default(),
        ScanSettings::default(),
    )
}

fn memory_store() -> Arc<Mutex<SqliteArticleStore>> {
    Arc::new(Mutex::new(SqliteArticleStore::open_in_memory().unwrap()))
}

/// Connector that blocks inside `connect` until released
struct GatedConnector {
    mailbox: MemoryMailbox,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl MailboxConnector for GatedConnector {
    fn connect(&self) -> MailboxResult<Box<dyn MailboxSession>> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv_timeout(GATE_TIMEOUT);
        self.mailbox.connect()
    }
}

/// Store that blocks on its first insert until released
struct GatedStore {
    inner: SqliteArticleStore,
    gated: bool,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl ArticleStore for GatedStore {
    fn insert_if_absent(&mut self, article: &NewArticle) -> StorageResult<bool> {
        if self.gated {
            self.gated = false;
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(GATE_TIMEOUT);
        }
        self.inner.insert_if_absent(article)
    }

    fn count(&self) -> StorageResult<u64> {
        self.inner.count()
    }
}

/// Store whose inserts always panic
struct PanickingStore;

impl ArticleStore for PanickingStore {
    fn insert_if_absent(&mut self, _article: &NewArticle) -> StorageResult<bool> {
        panic!("store exploded");
    }

    fn count(&self) -> StorageResult<u64> {
        Ok(0)
    }
}

/// Store whose first insert fails
struct FailFirstStore {
    inner: SqliteArticleStore,
    failed: bool,
}

impl ArticleStore for FailFirstStore {
    fn insert_if_absent(&mut self, article: &NewArticle) -> StorageResult<bool> {
        if !self.failed {
            self.failed = true;
            return Err(StorageError::Database("disk I/O error".to_string()));
        }
        self.inner.insert_if_absent(article)
    }

    fn count(&self) -> StorageResult<u64> {
        self.inner.count()
    }
}

#[tokio::test]
async fn test_full_scan_multiple_folders() {
    let mailbox = MemoryMailbox::new();
    for n in 0..4 {
        mailbox.add_message("INBOX", newsletter("inbox", n));
    }
    for n in 0..2 {
        mailbox.add_message("Newsletters", newsletter("news", n));
    }
    let store = memory_store();
    let scanner = scanner_with(Arc::new(mailbox.clone()), store.clone());

    let status = scanner
        .start_scan(vec!["INBOX".to_string(), "Newsletters".to_string()])
        .unwrap()
        .join()
        .await;

    assert_eq!(status, ScanStatus::Completed);

    let progress = scanner.scan_progress();
    assert_eq!(progress.folders_total, 2);
    assert_eq!(progress.folders_processed, 2);
    assert_eq!(progress.current_folder, "Newsletters");
    assert_eq!(progress.emails_total, 6);
    assert_eq!(progress.emails_processed, 6);
    assert_eq!(progress.articles_found, 6);
    assert_eq!(progress.percent_complete, 100);

    let articles = store.lock().unwrap().recent_articles(10).unwrap();
    assert_eq!(articles.len(), 6);
    let first = articles
        .iter()
        .find(|a| a.url == "https://blog.example.com/inbox/0")
        .unwrap();
    assert_eq!(first.title, "Lessons From Running Databases Part 0");
    assert_eq!(first.newsletter, "Systems Weekly <weekly@example.com>");
    assert_eq!(first.email_date, "2024-03-04T09:00:00+00:00");
    assert_eq!(first.folder, "INBOX");
    assert_eq!(first.domain, "blog.example.com");
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let mailbox = MemoryMailbox::new();
    mailbox.add_message("INBOX", newsletter("inbox", 1));
    mailbox.add_folder("Archive");

    let (entered_tx, entered_rx) = channel();
    let (release_tx, release_rx) = channel();
    let connector = GatedConnector {
        mailbox,
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let scanner = scanner_with(Arc::new(connector), memory_store());

    let handle = scanner
        .start_scan(vec!["INBOX".to_string(), "Archive".to_string()])
        .unwrap();
    entered_rx.recv_timeout(GATE_TIMEOUT).unwrap();

    let second = scanner.start_scan(vec![
        "A".to_string(),
        "B".to_string(),
        "C".to_string(),
    ]);
    assert!(matches!(second, Err(ScanError::AlreadyRunning)));

    // The running scan's progress was not reset by the rejected start
    let progress = scanner.scan_progress();
    assert_eq!(progress.folders_total, 2);
    assert_eq!(progress.status, ScanStatus::Connecting);
    assert!(scanner.scan_status().is_running);

    release_tx.send(()).unwrap();
    assert_eq!(handle.join().await, ScanStatus::Completed);
    assert!(!scanner.is_running());
}

#[tokio::test]
async fn test_failing_folder_does_not_stop_scan() {
    let mailbox = MemoryMailbox::new();
    mailbox.add_folder("Broken");
    mailbox.fail_folder("Broken");
    for n in 0..2 {
        mailbox.add_message("Good", newsletter("good", n));
    }
    let scanner = scanner_with(Arc::new(mailbox), memory_store());

    let status = scanner
        .start_scan(vec!["Broken".to_string(), "Good".to_string()])
        .unwrap()
        .join()
        .await;

    assert_eq!(status, ScanStatus::Completed);
    assert_eq!(scanner.scan_progress().emails_processed, 2);
    assert_eq!(scanner.scan_progress().articles_found, 2);
    assert!(scanner.scan_status().last_error.is_none());
}

#[tokio::test]
async fn test_cancellation_stops_within_ten_messages() {
    let mailbox = MemoryMailbox::new();
    for n in 0..25 {
        mailbox.add_message("INBOX", newsletter("inbox", n));
    }

    let (entered_tx, entered_rx) = channel();
    let (release_tx, release_rx) = channel();
    let store = GatedStore {
        inner: SqliteArticleStore::open_in_memory().unwrap(),
        gated: true,
        entered: entered_tx,
        release: release_rx,
    };
    let scanner = scanner_with(Arc::new(mailbox.clone()), Arc::new(Mutex::new(store)));

    let handle = scanner.start_scan(vec!["INBOX".to_string()]).unwrap();
    entered_rx.recv_timeout(GATE_TIMEOUT).unwrap();

    assert_eq!(scanner.cancel_scan(), Ok(()));
    // A second request while one is pending is accepted and has no effect
    assert_eq!(scanner.cancel_scan(), Ok(()));
    release_tx.send(()).unwrap();

    assert_eq!(handle.join().await, ScanStatus::Cancelled);

    let progress = scanner.scan_progress();
    assert_eq!(progress.status, ScanStatus::Cancelled);
    assert!(progress.emails_processed <= 13);
    assert!(progress.emails_processed < 25);

    let summary = scanner.scan_status();
    assert!(!summary.is_running);
    assert!(summary.last_error.unwrap().contains("cancelled"));
    assert!(summary.last_scan_time.is_some());
    assert_eq!(mailbox.sessions_closed(), 1);
}

#[tokio::test]
async fn test_stale_cancel_does_not_affect_next_scan() {
    let mailbox = MemoryMailbox::new();
    mailbox.add_message("INBOX", newsletter("inbox", 1));

    let (entered_tx, entered_rx) = channel();
    let (release_tx, release_rx) = channel();
    let connector = GatedConnector {
        mailbox: mailbox.clone(),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let scanner = scanner_with(Arc::new(connector), memory_store());

    // Cancel during connect; the scan stops before the first folder
    let handle = scanner.start_scan(Vec::new()).unwrap();
    entered_rx.recv_timeout(GATE_TIMEOUT).unwrap();
    scanner.cancel_scan().unwrap();
    release_tx.send(()).unwrap();
    assert_eq!(handle.join().await, ScanStatus::Cancelled);
    assert_eq!(scanner.scan_progress().emails_processed, 0);

    // The next scan starts clean
    let handle = scanner.start_scan(Vec::new()).unwrap();
    entered_rx.recv_timeout(GATE_TIMEOUT).unwrap();
    release_tx.send(()).unwrap();
    assert_eq!(handle.join().await, ScanStatus::Completed);
    assert_eq!(scanner.scan_progress().emails_processed, 1);
    assert!(scanner.scan_status().last_error.is_none());
}

#[tokio::test]
async fn test_connection_failure_clears_running_flag() {
    let mailbox = MemoryMailbox::new();
    mailbox.set_unreachable(true);
    let scanner = scanner_with(Arc::new(mailbox.clone()), memory_store());

    let status = scanner.start_scan(Vec::new()).unwrap().join().await;
    assert_eq!(status, ScanStatus::Error);
    assert!(!scanner.is_running());
    assert!(scanner
        .scan_status()
        .last_error
        .unwrap()
        .contains("failed to connect to mailbox"));

    // The scanner is usable again once the mailbox is reachable
    mailbox.set_unreachable(false);
    mailbox.add_message("INBOX", newsletter("inbox", 1));
    let status = scanner.start_scan(Vec::new()).unwrap().join().await;
    assert_eq!(status, ScanStatus::Completed);
}

#[tokio::test]
async fn test_panicking_scan_is_recovered() {
    let mailbox = MemoryMailbox::new();
    mailbox.add_message("INBOX", newsletter("inbox", 1));
    let scanner = scanner_with(
        Arc::new(mailbox.clone()),
        Arc::new(Mutex::new(PanickingStore)),
    );

    let status = scanner.start_scan(Vec::new()).unwrap().join().await;
    assert_eq!(status, ScanStatus::Error);

    let summary = scanner.scan_status();
    assert!(!summary.is_running);
    assert!(summary.last_error.is_some());
    assert_eq!(scanner.scan_progress().status, ScanStatus::Error);
    assert_eq!(mailbox.sessions_closed(), 1);
}

#[tokio::test]
async fn test_rescan_is_idempotent() {
    let mailbox = MemoryMailbox::new();
    for n in 0..3 {
        mailbox.add_message("INBOX", newsletter("inbox", n));
    }
    let store = memory_store();
    let scanner = scanner_with(Arc::new(mailbox), store.clone());

    scanner.start_scan(Vec::new()).unwrap().join().await;
    assert_eq!(scanner.scan_progress().articles_found, 3);

    scanner.start_scan(Vec::new()).unwrap().join().await;
    assert_eq!(scanner.scan_progress().articles_found, 0);
    assert_eq!(scanner.scan_status().last_emails_scanned, 3);
    assert_eq!(store.lock().unwrap().count().unwrap(), 3);
}

#[tokio::test]
async fn test_directory_mailbox_end_to_end() {
    let mail = TempDir::new().unwrap();
    let inbox = mail.path().join("INBOX");
    std::fs::create_dir(&inbox).unwrap();
    for n in 0..3 {
        std::fs::write(
            inbox.join(format!("{:04}.eml", n)),
            newsletter("disk", n).body,
        )
        .unwrap();
    }

    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("articles.db");
    let store = Arc::new(Mutex::new(SqliteArticleStore::new(&db_path).unwrap()));

    let settings = ScanSettings {
        message_limit: 2,
        config_hash: Some("cafebabe".to_string()),
        ..ScanSettings::default()
    };
    let scanner = Scanner::new(
        Arc::new(DirectoryMailbox::new(mail.path())),
        store.clone(),
        LinkExtractor::default(),
        settings,
    );

    let status = scanner.start_scan(Vec::new()).unwrap().join().await;
    assert_eq!(status, ScanStatus::Completed);
    assert_eq!(scanner.scan_progress().emails_total, 2);

    let store = store.lock().unwrap();
    assert_eq!(store.count().unwrap(), 2);
    let run = store.latest_scan_run().unwrap().unwrap();
    assert_eq!(run.config_hash.as_deref(), Some("cafebabe"));
    assert_eq!(run.emails_scanned, 2);
}

#[tokio::test]
async fn test_failed_insert_skips_only_that_article() {
    let mailbox = MemoryMailbox::new();
    mailbox.add_message(
        "INBOX",
        RawMessage::parse(
            b"From: Systems Weekly <weekly@example.com>\r\n\
              Subject: Two Links\r\n\
              Content-Type: text/html\r\n\
              \r\n\
              <div><h2>First Article That Fails To Store</h2>\
              <a href=\"https://blog.example.com/first\">Read</a></div>\
              <div><h2>Second Article That Is Stored</h2>\
              <a href=\"https://blog.example.com/second\">Read</a></div>"
                .to_vec(),
        ),
    );
    let store = Arc::new(Mutex::new(FailFirstStore {
        inner: SqliteArticleStore::open_in_memory().unwrap(),
        failed: false,
    }));
    let scanner = scanner_with(Arc::new(mailbox), store.clone());

    let status = scanner
        .start_scan(vec!["INBOX".to_string()])
        .unwrap()
        .join()
        .await;

    assert_eq!(status, ScanStatus::Completed);
    assert_eq!(scanner.scan_progress().emails_processed, 1);
    assert_eq!(scanner.scan_progress().articles_found, 1);

    let store = store.lock().unwrap();
    assert_eq!(store.count().unwrap(), 1);
    let stored = store.inner.recent_articles(10).unwrap();
    assert_eq!(stored[0].url, "https://blog.example.com/second");
    assert_eq!(stored[0].title, "Second Article That Is Stored");
}
