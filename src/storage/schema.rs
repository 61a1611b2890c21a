//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the article index.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Deduplicated article index
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    domain TEXT NOT NULL,
    newsletter TEXT NOT NULL DEFAULT '',
    email_date TEXT NOT NULL DEFAULT '',
    folder TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_url ON articles(url);
CREATE INDEX IF NOT EXISTS idx_articles_domain ON articles(domain);
CREATE INDEX IF NOT EXISTS idx_articles_newsletter ON articles(newsletter);
CREATE INDEX IF NOT EXISTS idx_articles_email_date ON articles(email_date);

-- Track finished scans
CREATE TABLE IF NOT EXISTS scan_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    status TEXT NOT NULL,
    folders TEXT NOT NULL,
    emails_scanned INTEGER NOT NULL DEFAULT 0,
    articles_found INTEGER NOT NULL DEFAULT 0,
    error TEXT,
    config_hash TEXT
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
