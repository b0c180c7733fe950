//! Kagami main entry point
//!
//! This is the command-line interface for the Kagami catalog mirror.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kagami::catalog::{CatalogClient, Site};
use kagami::config::load_config;
use kagami::report::{load_report, print_report};
use kagami::session::resolve_session;
use kagami::storage::SqliteStore;
use kagami::sync::SyncEngine;

/// Kagami: an incremental gallery catalog mirror
///
/// Kagami resumes from the newest stored gallery, walks the remote listing
/// newest-first, and upserts gallery metadata, torrents, and tags into a
/// local SQLite database. Rerunning it is always safe.
#[derive(Parser, Debug)]
#[command(name = "kagami")]
#[command(version = "1.0.0")]
#[command(about = "Incrementally mirrors a gallery catalog into SQLite", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Target catalog site
    #[arg(long, value_enum, default_value_t = Site::EHentai)]
    site: Site,

    /// Hours to rewind the start cursor relative to the newest stored entry
    #[arg(long, default_value_t = 0)]
    offset: i64,

    /// Path to a browser-exported cookie JSON file (required for exhentai
    /// unless COOKIE is set)
    #[arg(long, value_name = "FILE")]
    cookie_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_config(&cli.config).context("loading configuration")?;
    tracing::info!(
        "Mirroring {} into {} (cooldown {}s, retry budget {})",
        cli.site.host(),
        config.database.path.display(),
        config.cooldown,
        config.retry_count
    );

    let cookies = resolve_session(cli.site, cli.cookie_file.as_deref())
        .context("resolving session cookies")?;

    let store = SqliteStore::open(&config.database.path).context("opening database")?;
    let client = CatalogClient::for_site(cli.site, cookies, config.retry_count)
        .context("building HTTP client")?;

    let mut engine = SyncEngine::new(client, store, config.cooldown, cli.offset);
    let outcome = engine.run().await.context("sync loop failed")?;
    tracing::info!(
        "Sync complete: {} pages, {} entries listed, {} records ingested",
        outcome.pages,
        outcome.listed_entries,
        outcome.ingested_records
    );

    match load_report(engine.store()).context("generating report")? {
        Some(report) => print_report(&report),
        None => println!("\nFINAL REPORT:\nDatabase is empty."),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kagami=info,warn"),
            1 => EnvFilter::new("kagami=debug,info"),
            2 => EnvFilter::new("kagami=trace,debug"),
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
