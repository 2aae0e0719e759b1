//! # Pawboard Binary
//!
//! Assembles the engine from the plugins selected at compile time and
//! exposes a read-only view of the report board.

mod cli;

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use pb_config::{LogSettings, Settings};
use pb_core::{DocumentStore, Region};
use pb_engine::{ReportStats, ReportStore};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use crate::cli::Command;

#[cfg(feature = "db-sqlite")]
use pb_db_sqlite::SqliteDocumentStore;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("pawboard needs a document store backend; enable the `db-sqlite` feature");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);
    if let Some(path) = &settings.env_file {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{usage}");
            std::process::exit(2);
        }
    };

    // 1. Initialize Document Store Implementation
    #[cfg(feature = "db-sqlite")]
    let documents: Arc<dyn DocumentStore> = Arc::new(
        SqliteDocumentStore::connect(
            settings.database.url.expose_secret(),
            settings.database.max_connections,
        )
        .await
        .context("failed to open the document store")?,
    );

    // 2. Load the board
    let store = ReportStore::new(documents, settings.reports.collection.clone());
    store
        .refresh()
        .await
        .context("failed to load reports")?;

    match command {
        Command::Browse(criteria) => {
            let view = store.set_criteria(criteria).await;
            let mut out = std::io::stdout().lock();
            for report in &view.reports {
                writeln!(out, "{}", serde_json::to_string(report)?)?;
            }
            tracing::info!(shown = view.reports.len(), total = view.total, "browse");
        }
        Command::Stats => print_stats(&store).await?,
    }
    Ok(())
}

async fn print_stats(store: &ReportStore) -> anyhow::Result<()> {
    let snapshot = store.snapshot().await;
    let stats = ReportStats::of(snapshot.iter());

    let mut by_region: BTreeMap<Region, usize> = BTreeMap::new();
    for report in snapshot.iter() {
        *by_region.entry(report.location).or_default() += 1;
    }

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "total {}  lost {}  found {}",
        stats.total, stats.lost, stats.found
    )?;
    for (region, count) in by_region {
        writeln!(out, "{:<18} {count}", region.label())?;
    }
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(log: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
