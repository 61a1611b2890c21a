//! Output module for reporting on the article index
//!
//! This module handles:
//! - Loading statistics about stored articles and past scans
//! - Printing them in a human-readable form

pub mod stats;

pub use stats::{load_statistics, print_statistics, ArticleStatistics};
