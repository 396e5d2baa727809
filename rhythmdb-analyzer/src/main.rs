//! rhythmdb-analyzer — offline audio-analysis pipeline service.
//!
//! Resolves configuration, opens the library store, and serves the
//! readiness/progress HTTP surface in front of the phase scheduler.

use anyhow::Result;
use clap::Parser;
use rhythmdb_analyzer::orchestrator::Scheduler;
use rhythmdb_analyzer::store::LibraryStore;
use rhythmdb_common::config::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Debug, Parser)]
#[command(name = "rhythmdb-analyzer", version, about = "Offline audio analysis pipeline")]
struct Cli {
    /// Path to a TOML config file; falls back to RHYTHMDB_CONFIG / OS default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind the HTTP surface to.
    #[arg(long, default_value = "127.0.0.1:5820")]
    listen: String,

    /// Recursively scan this folder for audio files and submit them all at
    /// startup, instead of waiting for `POST /submit` calls.
    #[arg(long)]
    scan: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let settings = Settings::resolve(cli.config.as_deref())?;

    info!("Starting rhythmdb-analyzer");
    info!("db_folder: {}", settings.db_folder.display());
    info!("mode: {:?}, concurrency: {}", settings.mode, settings.concurrency);

    let store = Arc::new(LibraryStore::open(&settings.db_folder).await?);
    let scheduler = Arc::new(Scheduler::new(settings, store));

    if let Some(root) = &cli.scan {
        let files = rhythmdb_analyzer::services::scanner::scan(root)?;
        info!("scanned {}: {} audio file(s) found", root.display(), files.len());
        for path in files {
            scheduler.submit(path);
        }
    }

    let app = rhythmdb_analyzer::api::router(Arc::clone(&scheduler));

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("Listening on http://{}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
