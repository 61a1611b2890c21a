//! Mailsift: a newsletter link harvester
//!
//! This crate walks the folders of a mailbox, picks the readable body of every
//! message, extracts the article links buried in newsletter markup and stores
//! them in a deduplicated reading index.

pub mod config;
pub mod extract;
pub mod mailbox;
pub mod message;
pub mod output;
pub mod scan;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Mailsift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] mailbox::MailboxError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Scan error: {0}")]
    Scan(#[from] scan::ScanError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Mailsift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{extract_links, ExtractRules, ExtractedLink, LinkExtractor};
pub use message::{normalize_body, walk, NormalizedMessage};
pub use scan::{ScanProgress, ScanRunSummary, ScanStatus, Scanner};
pub use crate::url::{extract_domain, normalize_url};
