//! Mailsift main entry point
//!
//! This is the command-line interface for the Mailsift newsletter link harvester.

use anyhow::{bail, Context};
use clap::Parser;
use mailsift::config::{load_config_with_hash, Config};
use mailsift::extract::LinkExtractor;
use mailsift::mailbox::{DirectoryMailbox, MailboxConnector, RawMessage};
use mailsift::message::normalize_body;
use mailsift::scan::{ScanProgress, ScanSettings, ScanStatus, Scanner};
use mailsift::storage::open_storage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How often progress is printed while a scan runs
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Mailsift: a newsletter link harvester
///
/// Mailsift walks the folders of a mailbox, extracts the article links
/// buried in newsletter emails and keeps them in a deduplicated index.
#[derive(Parser, Debug)]
#[command(name = "mailsift")]
#[command(version)]
#[command(about = "A newsletter link harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Folder to scan (repeatable; defaults to the configured folders)
    #[arg(long = "folder", value_name = "NAME")]
    folders: Vec<String>,

    /// List the mailbox folders and exit
    #[arg(long, conflicts_with_all = ["extract", "stats"])]
    list_folders: bool,

    /// Print the links found in a single message file and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["list_folders", "stats"])]
    extract: Option<PathBuf>,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["list_folders", "extract"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::debug!("Configuration hash: {}", config_hash);

    if cli.list_folders {
        handle_list_folders(&config)
    } else if let Some(path) = &cli.extract {
        handle_extract(&config, path)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_scan(config, config_hash, cli.folders).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mailsift=info,warn"),
            1 => EnvFilter::new("mailsift=debug,info"),
            2 => EnvFilter::new("mailsift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --list-folders mode
fn handle_list_folders(config: &Config) -> anyhow::Result<()> {
    let mailbox = DirectoryMailbox::new(&config.mailbox.root);
    let mut session = mailbox.connect().context("failed to open mailbox")?;

    println!("Mailbox: {}\n", config.mailbox.root);
    for folder in session.list_folders()? {
        let total = session.select_folder(&folder)?;
        println!("  {} ({} messages)", folder, total);
    }

    session.close()?;
    Ok(())
}

/// Handles the --extract mode: prints the links of one message file
fn handle_extract(config: &Config, path: &Path) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let message = RawMessage::parse(bytes);
    let extractor = LinkExtractor::new(config.filters.to_rules());
    let body = normalize_body(&message.body, &extractor);

    if let Some(envelope) = &message.envelope {
        println!("From: {}", envelope.sender);
        println!("Subject: {}\n", envelope.subject);
    }

    println!("{} link(s):", body.links.len());
    for link in &body.links {
        println!("  [{}] {}", link.position, link.title);
        println!("      {}", link.url);
        if !link.description.is_empty() {
            println!("      {}", link.description);
        }
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use mailsift::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open article database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main scan operation
async fn handle_scan(config: Config, config_hash: String, folders: Vec<String>) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open article database")?;

    let scanner = Scanner::new(
        Arc::new(DirectoryMailbox::new(&config.mailbox.root)),
        Arc::new(Mutex::new(storage)),
        LinkExtractor::new(config.filters.to_rules()),
        ScanSettings::from_config(&config, Some(config_hash)),
    );

    let handle = scanner.start_scan(folders)?;
    tracing::info!("Scan {}: {}", handle.status(), handle.folders().join(", "));

    let finished = handle.join();
    tokio::pin!(finished);

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let mut last_printed: Option<ScanProgress> = None;

    let status = loop {
        tokio::select! {
            status = &mut finished => break status,
            _ = ticker.tick() => {
                let progress = scanner.scan_progress();
                if last_printed.as_ref() != Some(&progress) {
                    print_progress(&progress);
                    last_printed = Some(progress);
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                    continue;
                }
                tracing::info!("Interrupted, cancelling scan");
                if let Err(e) = scanner.cancel_scan() {
                    tracing::debug!("Cancel ignored: {}", e);
                }
            }
        }
    };

    let progress = scanner.scan_progress();
    let summary = scanner.scan_status();

    println!(
        "\nScan {}: {} folder(s), {} email(s) scanned, {} new article(s)",
        status, progress.folders_processed, progress.emails_processed, progress.articles_found
    );

    match status {
        ScanStatus::Error => bail!(
            "scan failed: {}",
            summary.last_error.unwrap_or_else(|| "unknown error".to_string())
        ),
        _ => Ok(()),
    }
}

fn print_progress(progress: &ScanProgress) {
    println!(
        "[{:>3}%] {} {} ({}/{} folders, {}/{} emails, {} new articles)",
        progress.percent_complete,
        progress.status,
        progress.current_folder,
        progress.folders_processed,
        progress.folders_total,
        progress.emails_processed,
        progress.emails_total,
        progress.articles_found
    );
}
