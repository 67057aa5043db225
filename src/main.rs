//! # News Analyzer
//!
//! Pulls full article text out of news sites that are hostile to automated
//! fetching, then optionally attributes a byline, classifies sentiment with
//! respect to a user-supplied context, and summarizes each article.
//!
//! ## Usage
//!
//! ```sh
//! news_analyzer -i urls.txt -o ./results --byline --summarize
//! ```
//!
//! ## Architecture
//!
//! 1. **Input**: rows from a file and/or repeated `--url` flags
//! 2. **Extraction**: specialized engine first, heuristic extractor as fallback
//! 3. **Analysis**: byline, sentiment and summary over the extracted text
//! 4. **Output**: a JSON array and a Markdown table, one row per input row

use awful_aj::config_dir;
use chrono::Local;
use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod api;
mod cli;
mod error;
mod input;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod settings;
mod utils;

use api::{AwfulJadeClient, RetryGenerate};
use cli::Cli;
use models::{AnalysisRecord, InputRow};
use outputs::run_stem;
use pipeline::Analyzer;
use scrapers::orchestrator::Scraper;
use settings::ScraperSettings;
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
    info!("news_analyzer starting up");

    let args = Cli::parse();
    debug!(?args.input, urls = args.urls.len(), output_dir = %args.output_dir, "Parsed CLI arguments");

    // ---- Input rows ----
    let mut rows = match &args.input {
        Some(path) => input::load_rows(path).await?,
        None => Vec::new(),
    };
    rows.extend(
        args.urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(InputRow::new),
    );

    let warnings = args.validate(rows.len());
    if !warnings.is_empty() {
        for w in &warnings {
            warn!(problem = %w, "Invalid configuration");
        }
        return Err(format!("invalid configuration: {}", warnings.join("; ")).into());
    }

    // Early check: output dir must be writable before any fetch
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Scraper ----
    let settings = match &args.settings {
        Some(path) => ScraperSettings::load(&path.to_string_lossy())?,
        None => ScraperSettings::default(),
    };
    let scraper = Scraper::from_settings(&settings)?;
    let stats = scraper.pool_stats();
    info!(
        user_agents = stats.total,
        bots = stats.bots,
        browsers = stats.browsers,
        "Identity pool ready"
    );

    // ---- Generative service (only when an analysis needs it) ----
    let options = args.analysis_options();
    let generator = if options.needs_generator() {
        let config_path = match &args.llm_config {
            Some(path) => path.clone(),
            None => config_dir()?
                .join("config.yaml")
                .to_string_lossy()
                .into_owned(),
        };
        let client = AwfulJadeClient::load(&config_path, &args.template).await?;
        Some(RetryGenerate::new(client, 5, Duration::from_secs(1)))
    } else {
        None
    };

    // ---- Process ----
    info!(rows = rows.len(), "Starting batch");
    let analyzer = Analyzer::new(scraper, generator);
    let records = analyzer.process(&rows, &options).await;

    log_run_summary(&records);

    // ---- Output ----
    let stem = run_stem(Local::now());
    outputs::write_all(&records, &args.output_dir, &stem).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

fn log_run_summary(records: &[AnalysisRecord]) {
    let by_method = records
        .iter()
        .filter_map(|r| r.method)
        .counts()
        .into_iter()
        .sorted_by_key(|(method, _)| method.as_str())
        .map(|(method, n)| format!("{method}={n}"))
        .join(", ");
    info!(rows = records.len(), methods = %by_method, "Run summary");
}
