//! Statistics generation from the article database
//!
//! This module provides functionality for extracting and displaying
//! article index statistics from the storage layer.

use crate::storage::{ArticleStore, ScanRunRecord, SqliteArticleStore};
use crate::SiftError;

/// Number of entries shown in the top lists
const TOP_N: usize = 10;

/// Article index statistics summary
#[derive(Debug, Clone)]
pub struct ArticleStatistics {
    /// Total number of stored articles
    pub total_articles: u64,

    /// Number of distinct newsletters that contributed articles
    pub unique_newsletters: u64,

    /// Domains with the most articles
    pub top_domains: Vec<(String, u64)>,

    /// Newsletters with the most articles
    pub top_newsletters: Vec<(String, u64)>,

    /// Number of recorded scans
    pub total_scans: u64,

    /// Most recent scan, if any
    pub last_scan: Option<ScanRunRecord>,
}

/// Loads statistics from storage
///
/// # Returns
///
/// * `Ok(ArticleStatistics)` - Successfully loaded statistics
/// * `Err(SiftError)` - Failed to query statistics
pub fn load_statistics(storage: &SqliteArticleStore) -> Result<ArticleStatistics, SiftError> {
    Ok(ArticleStatistics {
        total_articles: storage.count()?,
        unique_newsletters: storage.newsletter_count()?,
        top_domains: storage.top_domains(TOP_N)?,
        top_newsletters: storage.top_newsletters(TOP_N)?,
        total_scans: storage.scan_run_count()?,
        last_scan: storage.latest_scan_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArticleStatistics) {
    println!("=== Article Index Statistics ===\n");

    println!("Overview:");
    println!("  Total articles: {}", stats.total_articles);
    println!("  Newsletters: {}", stats.unique_newsletters);
    println!("  Scans recorded: {}", stats.total_scans);
    println!();

    if !stats.top_domains.is_empty() {
        println!("Top Domains:");
        for (domain, count) in &stats.top_domains {
            println!(
                "  {}: {} ({:.1}%)",
                domain,
                count,
                share(*count, stats.total_articles)
            );
        }
        println!();
    }

    if !stats.top_newsletters.is_empty() {
        println!("Top Newsletters:");
        for (newsletter, count) in &stats.top_newsletters {
            let name = if newsletter.is_empty() {
                "(unknown)"
            } else {
                newsletter.as_str()
            };
            println!("  {}: {}", name, count);
        }
        println!();
    }

    match &stats.last_scan {
        Some(run) => {
            println!("Last Scan:");
            println!("  Status: {}", run.status);
            println!("  Finished: {}", run.finished_at);
            println!("  Folders: {}", run.folders);
            println!(
                "  Emails scanned: {}, new articles: {}",
                run.emails_scanned, run.articles_found
            );
            if let Some(error) = &run.error {
                println!("  Error: {}", error);
            }
        }
        None => println!("No scans recorded yet"),
    }
}

/// Percentage of `count` in `total`
fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}
