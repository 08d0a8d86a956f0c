//! cartboost-stats: compute A/B test statistics from exported event counts.

use anyhow::Context;
use cartboost_core::config::AppConfig;
use cartboost_core::types::{EventCount, TrackedEvent, Variant};
use cartboost_experiments::aggregate::aggregate_event_counts;
use cartboost_experiments::window::DateRangePreset;
use cartboost_experiments::{compute_variant_stats, ExperimentStore, InMemoryStore, StatsEngine};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cartboost-stats")]
#[command(about = "A/B test statistics for the free-shipping bar")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, env = "CARTBOOST__LOGGING__JSON")]
    json_logs: Option<bool>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute per-variant stats from a JSON export of variants and grouped counts
    Compute {
        /// File containing `{ "variants": [...], "events": [...] }`
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Resolve a reporting window preset
    Range {
        /// last7, thisWeek, thisMonth or last30 (defaults to config)
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Bootstrap a shop's test in memory and print its stats
    Demo {
        #[arg(short, long, default_value = "demo.myshopify.com")]
        shop: String,
    },

    /// Apply the retention sweep to a JSON array of tracked events
    Purge {
        #[arg(short, long)]
        input: PathBuf,

        /// Overrides tracking.retention_days
        #[arg(long)]
        retention_days: Option<u32>,
    },
}

#[derive(Debug, Deserialize)]
struct StatsInput {
    variants: Vec<Variant>,
    #[serde(default)]
    events: Vec<EventCount>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        AppConfig::default()
    });
    if let Some(json) = cli.json_logs {
        config.logging.json = json;
    }
    init_tracing(&config);

    match cli.command {
        Commands::Compute { input } => cmd_compute(&input),
        Commands::Range { key } => {
            cmd_range(key.as_deref().unwrap_or(&config.reporting.default_range));
            Ok(())
        }
        Commands::Demo { shop } => cmd_demo(&config, &shop),
        Commands::Purge {
            input,
            retention_days,
        } => {
            if let Some(days) = retention_days {
                config.tracking.retention_days = days;
            }
            cmd_purge(&config, &input)
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cmd_compute(path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let input: StatsInput = serde_json::from_str(&raw).context("invalid stats input")?;

    if !input.variants.iter().any(|v| v.is_control()) {
        warn!("No control variant named \"A\"; lift and confidence will be zero");
    }

    let ids: Vec<&str> = input.variants.iter().map(|v| v.id.as_str()).collect();
    let counts = aggregate_event_counts(&ids, &input.events);
    let stats = compute_variant_stats(&input.variants, &counts);

    info!(variants = stats.len(), rows = input.events.len(), "Stats computed");
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn cmd_range(key: &str) {
    let preset = DateRangePreset::parse(key);
    let window = preset.window(Utc::now());
    println!("{} ({})", preset.label(), preset.key());
    println!("  from: {}", window.from.to_rfc3339());
    println!("  to:   {}", window.to.to_rfc3339());
}

fn cmd_demo(config: &AppConfig, shop: &str) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let engine = StatsEngine::from_config(store, config);

    let test = engine.get_or_create_ab_test(shop)?;
    let window = DateRangePreset::parse(&config.reporting.default_range).window(Utc::now());
    let stats = engine.get_ab_test_stats(&test.id, Some(window))?;

    println!("{} ({})", test.name, test.shop);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn cmd_purge(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let events: Vec<TrackedEvent> = serde_json::from_str(&raw).context("invalid event list")?;
    let total = events.len();

    let store = Arc::new(InMemoryStore::new());
    for event in events {
        store.insert_event(event)?;
    }
    let engine = StatsEngine::from_config(store.clone(), config);
    let deleted = engine.purge_expired_events(Utc::now())?;

    println!(
        "Purged {deleted} of {total} events older than {} days ({} kept)",
        config.tracking.retention_days,
        store.event_count()
    );
    Ok(())
}
