//! SAFEBET — safe-odds combo engine.
//!
//! Entry point. Initialises structured logging, loads and validates the
//! policy configuration, reads one day's prediction records from a JSON
//! file, runs the pipeline, and prints the full day report to stdout for
//! the downstream review step.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use safebet::config::AppConfig;
use safebet::feed::RawMatchRecord;
use safebet::pipeline::SafeOddsPipeline;
use safebet::types::Recommendation;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

fn main() -> Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let matches_path = match args.next() {
        Some(p) => p,
        None => bail!("usage: safebet <matches.json> [config.toml]"),
    };
    let config_path = args.next();

    // Explicit config path must exist; the default one may be absent, in
    // which case the reference policy applies.
    let cfg = match config_path.as_deref() {
        Some(path) => AppConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => AppConfig::load(DEFAULT_CONFIG_FILE)?,
        None => {
            info!("No config file found, using the reference policy");
            AppConfig::default()
        }
    };

    // Fails fast on policy misconfiguration, before reading any match.
    let pipeline = SafeOddsPipeline::from_config(&cfg)?;
    info!(
        band = format!("[{:.2}, {:.2}]", cfg.band.min_odds, cfg.band.max_odds),
        leagues = cfg.filter.allowed_leagues.len(),
        markets = cfg.filter.allowed_markets.len(),
        "SAFEBET starting"
    );

    let contents = std::fs::read_to_string(&matches_path)
        .with_context(|| format!("Failed to read matches file: {matches_path}"))?;
    let records: Vec<RawMatchRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse matches file: {matches_path}"))?;

    let report = pipeline.run(&records);

    match &report.recommendation {
        Recommendation::Combo(combo) => info!(%combo, "Recommendation ready for review"),
        Recommendation::Empty { reason } => info!(%reason, "Nothing to publish today"),
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialise day report")?
    );

    Ok(())
}

/// Initialise the `tracing` subscriber. JSON output is toggled by env var
/// so log shippers can consume it without a config change.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("safebet=info"));

    if std::env::var("SAFEBET_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
