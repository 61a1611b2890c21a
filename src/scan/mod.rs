//! Scan orchestration
//!
//! A scan walks the requested mailbox folders on a background task, feeds
//! every message through link extraction and adds new articles to the
//! index. At most one scan runs at a time; progress can be polled and the
//! scan can be cancelled cooperatively.

mod orchestrator;
mod state;

pub use orchestrator::{ScanHandle, Scanner};
pub use state::{ScanProgress, ScanRunSummary, ScanStatus};

use crate::config::Config;
use thiserror::Error;

/// Message recorded as the last error of a cancelled scan
pub const CANCELLED_MESSAGE: &str = "scan cancelled by user";

/// The cancel signal is checked before every message whose index is a
/// multiple of this value
pub const CANCEL_CHECK_INTERVAL: usize = 10;

/// Errors returned by scan control operations
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("a scan is already running")]
    AlreadyRunning,

    #[error("no scan is running")]
    NotRunning,

    #[error("scans must be started from within a Tokio runtime")]
    NoRuntime,
}

/// Settings applied to every scan of a [`Scanner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Most recent messages fetched per folder; 0 fetches all
    pub message_limit: u32,

    /// Folders scanned when a scan is started without any
    pub default_folders: Vec<String>,

    /// Hash of the configuration, stored with the scan history
    pub config_hash: Option<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            message_limit: 0,
            default_folders: vec!["INBOX".to_string()],
            config_hash: None,
        }
    }
}

impl ScanSettings {
    /// Builds scan settings from a loaded configuration
    pub fn from_config(config: &Config, config_hash: Option<String>) -> Self {
        Self {
            message_limit: config.scan.message_limit,
            default_folders: config.scan.default_folders.clone(),
            config_hash,
        }
    }
}
