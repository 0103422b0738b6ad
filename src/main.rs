//! # Face Paper Digest
//!
//! Collects recent face recognition and face generation papers from arXiv and
//! computer-vision conference proceedings, classifies them, and publishes a
//! JSON snapshot, a README and a dated archive.
//!
//! ## Usage
//!
//! ```sh
//! face_paper_digest --days 7 --output-dir ./site
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: every source issues its queries (sources run concurrently)
//! 2. **Parsing**: payloads become candidates; malformed entries are skipped
//! 3. **Filtering / classification**: off-topic candidates are dropped, the
//!    rest are tagged Recognition or Generation
//! 4. **Merging**: deduplicate by id, sort newest first, split by category
//! 5. **Output**: snapshot, README and archive (falling back to the previous
//!    snapshot when nothing was found)

use chrono::{Local, Utc};
use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod http;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::{RunConfig, Settings};
use error::ConfigError;
use http::HttpClient;
use outputs::{archive, json, markdown};
use pipeline::aggregate::Aggregator;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("face_paper_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Settings ----
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let run = RunConfig::resolve(&args, &settings, Utc::now())?;
    info!(
        days = run.days,
        sources = ?run.sources,
        max_results = run.source_options.max_results,
        conference_year = run.source_options.conference_year,
        retries = run.http.max_retries,
        "Resolved run configuration"
    );

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Sources ----
    let keywords = Arc::new(run.keywords);
    let http = HttpClient::new(&run.http).map_err(ConfigError::from)?;
    let sources = scrapers::build_sources(&run.sources, &http, &keywords, &run.source_options)?;
    let aggregator = Aggregator::new(sources, keywords).with_concurrency(run.concurrency);
    info!(sources = ?aggregator.source_names(), concurrency = run.concurrency, "Sources ready");

    // ---- Fetch, parse, filter, classify, merge ----
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => warn!("Interrupt received; finishing with completed sources"),
            Err(e) => {
                warn!(error = %e, "Cannot listen for interrupts; running to completion");
                std::future::pending::<()>().await
            }
        }
    };
    let digest = aggregator.fetch_window(run.window, shutdown).await;

    if digest.all_sources_failed() {
        error!(failed = ?digest.failed_sources, "Every source failed");
    } else if digest.is_empty() {
        info!("No matching papers in the window");
    }

    // ---- Fallback ----
    let output_dir = Path::new(&args.output_dir);
    let snapshot_path = output_dir.join(json::SNAPSHOT_FILE);
    let (digest, from_snapshot) = if args.no_fallback || !digest.is_empty() {
        (digest, false)
    } else {
        let previous = json::load_snapshot(&snapshot_path).await;
        json::with_fallback(digest, previous)
    };
    if from_snapshot {
        warn!(count = digest.all.len(), "Publishing the previous snapshot");
    }

    // ---- Writers ----
    let today = Local::now().date_naive();

    if let Err(e) = json::write_snapshot(&digest, &snapshot_path).await {
        error!(error = %e, "Failed to write snapshot");
    }

    let readme_path = output_dir.join("README.md");
    let md = markdown::digest_to_markdown(&digest, today, from_snapshot);
    if let Err(e) = tokio::fs::write(&readme_path, md).await {
        error!(path = %readme_path.display(), error = %e, "Failed writing README");
    } else {
        info!(path = %readme_path.display(), "Wrote README");
    }

    let papers_dir = output_dir.join("papers");
    if let Err(e) = archive::write_day_file(&papers_dir, &digest, today).await {
        error!(error = %e, "Failed to write daily archive");
    }
    if let Err(e) = archive::update_index(&papers_dir, today).await {
        error!(error = %e, "Failed to update archive index");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        papers = digest.all.len(),
        recognition = digest.face_recognition.len(),
        generation = digest.face_generation.len(),
        "Execution complete"
    );

    Ok(())
}
