//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ArticleStore trait.

use crate::scan::ScanStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, StorageResult};
use crate::storage::{ArticleRecord, NewArticle, ScanRunRecord};
use crate::SiftError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite article store
pub struct SqliteArticleStore {
    conn: Connection,
}

impl SqliteArticleStore {
    /// Creates a new SqliteArticleStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteArticleStore)` - Successfully opened/created database
    /// * `Err(SiftError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SiftError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, SiftError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Gets the most recently stored articles
    pub fn recent_articles(&self, limit: usize) -> StorageResult<Vec<ArticleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, title, description, domain, newsletter, email_date, folder, created_at
             FROM articles ORDER BY email_date DESC, id DESC LIMIT ?1",
        )?;

        let articles = stmt
            .query_map(params![limit as i64], |row| {
                Ok(ArticleRecord {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    domain: row.get(4)?,
                    newsletter: row.get(5)?,
                    email_date: row.get(6)?,
                    folder: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(articles)
    }

    /// Counts articles per domain, most frequent first
    pub fn top_domains(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        self.grouped_counts("domain", limit)
    }

    /// Counts articles per newsletter, most frequent first
    pub fn top_newsletters(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        self.grouped_counts("newsletter", limit)
    }

    fn grouped_counts(&self, column: &str, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let sql = format!(
            "SELECT {column}, COUNT(*) AS n FROM articles GROUP BY {column} ORDER BY n DESC, {column} ASC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let counts = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    /// Counts distinct newsletters in the index
    pub fn newsletter_count(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT newsletter) FROM articles", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    /// Gets the most recent scan run
    pub fn latest_scan_run(&self) -> StorageResult<Option<ScanRunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT started_at, finished_at, status, folders, emails_scanned, articles_found, error, config_hash
             FROM scan_runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(ScanRunRecord {
                    started_at: row.get(0)?,
                    finished_at: row.get(1)?,
                    status: ScanStatus::from_db_string(&row.get::<_, String>(2)?)
                        .unwrap_or(ScanStatus::Error),
                    folders: row.get(3)?,
                    emails_scanned: row.get::<_, i64>(4)? as u64,
                    articles_found: row.get::<_, i64>(5)? as u64,
                    error: row.get(6)?,
                    config_hash: row.get(7)?,
                })
            })
            .optional()?;

        Ok(run)
    }

    /// Counts recorded scan runs
    pub fn scan_run_count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scan_runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl ArticleStore for SqliteArticleStore {
    fn insert_if_absent(&mut self, article: &NewArticle) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO articles
                (url, title, description, domain, newsletter, email_date, folder, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                article.url,
                article.title,
                article.description,
                article.domain,
                article.newsletter,
                article.email_date,
                article.folder,
                now
            ],
        )?;
        Ok(changed == 1)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn record_scan_run(&mut self, run: &ScanRunRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO scan_runs
                (started_at, finished_at, status, folders, emails_scanned, articles_found, error, config_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run.started_at,
                run.finished_at,
                run.status.to_db_string(),
                run.folders,
                run.emails_scanned as i64,
                run.articles_found as i64,
                run.error,
                run.config_hash
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn article(url: &str, domain: &str, newsletter: &str) -> NewArticle {
        NewArticle {
            url: url.to_string(),
            title: "A Title Long Enough To Keep".to_string(),
            description: String::new(),
            domain: domain.to_string(),
            newsletter: newsletter.to_string(),
            email_date: "2024-01-01T00:00:00+00:00".to_string(),
            folder: "INBOX".to_string(),
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut store = SqliteArticleStore::open_in_memory().unwrap();
        let a = article("https://a.example.com/x", "a.example.com", "n1");

        assert!(store.insert_if_absent(&a).unwrap());
        assert!(!store.insert_if_absent(&a).unwrap());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_first_insert_wins() {
        let mut store = SqliteArticleStore::open_in_memory().unwrap();
        let first = article("https://a.example.com/x", "a.example.com", "first");
        let second = article("https://a.example.com/x", "a.example.com", "second");

        store.insert_if_absent(&first).unwrap();
        store.insert_if_absent(&second).unwrap();

        let stored = store.recent_articles(10).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].newsletter, "first");
    }

    #[test]
    fn test_grouped_counts() {
        let mut store = SqliteArticleStore::open_in_memory().unwrap();
        store
            .insert_if_absent(&article("https://a.example.com/1", "a.example.com", "n1"))
            .unwrap();
        store
            .insert_if_absent(&article("https://a.example.com/2", "a.example.com", "n2"))
            .unwrap();
        store
            .insert_if_absent(&article("https://b.example.com/1", "b.example.com", "n2"))
            .unwrap();

        assert_eq!(
            store.top_domains(5).unwrap(),
            vec![
                ("a.example.com".to_string(), 2),
                ("b.example.com".to_string(), 1)
            ]
        );
        assert_eq!(store.top_newsletters(1).unwrap(), vec![("n2".to_string(), 2)]);
        assert_eq!(store.newsletter_count().unwrap(), 2);
    }

    #[test]
    fn test_scan_run_history() {
        let mut store = SqliteArticleStore::open_in_memory().unwrap();
        assert!(store.latest_scan_run().unwrap().is_none());

        let run = ScanRunRecord {
            started_at: "2024-01-01T00:00:00+00:00".to_string(),
            finished_at: "2024-01-01T00:01:00+00:00".to_string(),
            status: ScanStatus::Cancelled,
            folders: "INBOX,Archive".to_string(),
            emails_scanned: 12,
            articles_found: 3,
            error: Some("scan cancelled by user".to_string()),
            config_hash: Some("abc".to_string()),
        };
        store.record_scan_run(&run).unwrap();

        let latest = store.latest_scan_run().unwrap().unwrap();
        assert_eq!(latest.status, ScanStatus::Cancelled);
        assert_eq!(latest.emails_scanned, 12);
        assert_eq!(latest.folders, "INBOX,Archive");
        assert_eq!(store.scan_run_count().unwrap(), 1);
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("articles.db");

        {
            let mut store = SqliteArticleStore::new(&path).unwrap();
            store
                .insert_if_absent(&article("https://a.example.com/1", "a.example.com", "n1"))
                .unwrap();
        }

        let store = SqliteArticleStore::new(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
