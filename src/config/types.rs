use crate::extract::ExtractRules;
use serde::Deserialize;

/// Main configuration structure for Mailsift
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mailbox: MailboxConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub filters: FilterConfig,
}

/// Mailbox location
#[derive(Debug, Clone, Deserialize)]
pub struct MailboxConfig {
    /// Root directory; each subdirectory is a folder
    pub root: String,
}

/// Scan behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Folders scanned when none are requested
    #[serde(rename = "default-folders", default = "default_folders")]
    pub default_folders: Vec<String>,

    /// Most recent messages fetched per folder (0 = all)
    #[serde(rename = "message-limit", default)]
    pub message_limit: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_folders: default_folders(),
            message_limit: 0,
        }
    }
}

fn default_folders() -> Vec<String> {
    vec!["INBOX".to_string()]
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Link filtering tables; every list falls back to the built-in one
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Query parameters stripped from links
    #[serde(rename = "tracking-params")]
    pub tracking_params: Option<Vec<String>>,

    /// Substrings that disqualify a link
    #[serde(rename = "ignore-patterns")]
    pub ignore_patterns: Option<Vec<String>>,

    /// Hosts whose URL slug is used as the title
    #[serde(rename = "long-form-hosts")]
    pub long_form_hosts: Option<Vec<String>>,
}

impl FilterConfig {
    /// Resolves the configured tables against the built-in defaults
    pub fn to_rules(&self) -> ExtractRules {
        let defaults = ExtractRules::default();
        ExtractRules {
            tracking_params: self
                .tracking_params
                .clone()
                .unwrap_or(defaults.tracking_params),
            ignore_patterns: self
                .ignore_patterns
                .clone()
                .unwrap_or(defaults.ignore_patterns),
            long_form_hosts: self
                .long_form_hosts
                .clone()
                .unwrap_or(defaults.long_form_hosts),
        }
    }
}
