/// Scan state definitions for tracking progress
///
/// This module defines the status a scan moves through and the snapshots
/// clients poll while it runs.
use chrono::{DateTime, Utc};
use std::fmt;

/// Represents the current status of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanStatus {
    /// No scan has run yet
    #[default]
    Idle,

    // ===== Active States =====
    /// Opening a session with the mailbox
    Connecting,

    /// Walking folders
    Scanning,

    // ===== Terminal States =====
    /// Every requested folder was processed (possibly with skipped folders)
    Completed,

    /// Stopped early at the user's request
    Cancelled,

    /// The scan could not run (connection failure or a crashed scan task)
    Error,
}

impl ScanStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Scanning => "scanning",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "connecting" => Some(Self::Connecting),
            "scanning" => Some(Self::Scanning),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Live progress of the current (or last) scan
///
/// Reset at the start of every scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub current_folder: String,
    pub folders_total: usize,
    pub folders_processed: usize,

    /// Raw messages fetched so far
    pub emails_total: usize,

    /// Messages normalized and scanned so far
    pub emails_processed: usize,

    /// Articles that were new to the index
    pub articles_found: usize,

    pub percent_complete: u8,
    pub status: ScanStatus,
}

impl ScanProgress {
    /// Progress of a scan that is about to connect
    pub fn starting(folders_total: usize) -> Self {
        Self {
            folders_total,
            status: ScanStatus::Connecting,
            ..Self::default()
        }
    }
}

/// Outcome of the last finished scan
///
/// Persists across scans; every terminal state overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRunSummary {
    pub is_running: bool,
    pub last_scan_time: Option<DateTime<Utc>>,
    pub last_emails_scanned: usize,
    pub last_error: Option<String>,
}

/// Everything guarded by the scanner's lock
#[derive(Debug, Default)]
pub(crate) struct ScanState {
    pub summary: ScanRunSummary,
    pub progress: ScanProgress,
}

/// Computes the integer percentage of processed folders
pub(crate) fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (processed.min(total) * 100 / total) as u8
}
