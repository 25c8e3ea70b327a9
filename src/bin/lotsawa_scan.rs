use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lotsawa::detection::{ClusterRecord, DuplicatePairRecord};
use lotsawa::{CancellationToken, DuplicateDetector, Entity, ResolverConfig};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "lotsawa-scan", about = "Find duplicate entities in a JSON corpus")]
struct Cli {
    /// JSON file holding an array of entities
    #[clap(required = true)]
    input: PathBuf,

    /// JSON resolver config (detection, merge and scan sections)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Override the minimum overall score
    #[clap(short, long)]
    threshold: Option<f64>,

    /// Override the number of scan workers
    #[clap(short, long)]
    workers: Option<usize>,

    /// Cancel the scan after this many seconds and print partial results
    #[clap(long)]
    timeout_secs: Option<u64>,

    /// Print exact-decimal records instead of the full report
    #[clap(long)]
    records: bool,
}

#[derive(Serialize)]
struct RecordOutput {
    pairs: Vec<DuplicatePairRecord>,
    clusters: Vec<ClusterRecord>,
    rows_completed: usize,
    rows_total: usize,
    cancelled: bool,
}

fn load_config(cli: &Cli) -> Result<ResolverConfig> {
    let mut config = match &cli.config {
        Some(path) => ResolverConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.detection.threshold = threshold;
    }
    if let Some(workers) = cli.workers {
        config.scan.workers = workers;
    }
    config.validate().context("invalid configuration")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let raw = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let entities: Vec<Entity> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", cli.input.display()))?;
    for entity in &entities {
        entity
            .validate()
            .with_context(|| format!("entity {} is invalid", entity.id()))?;
    }
    info!(count = entities.len(), "loaded entities");

    let token = CancellationToken::new();
    if let Some(secs) = cli.timeout_secs {
        let timer = token.clone();
        thread::Builder::new()
            .name("lotsawa-scan-timeout".to_string())
            .spawn(move || {
                thread::sleep(Duration::from_secs(secs));
                timer.cancel();
            })
            .context("spawning timeout thread")?;
    }

    let report = DuplicateDetector::default().detect_all_duplicates_with_cancel(
        &entities,
        &config.detection,
        &config.scan,
        &token,
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.records {
        let output = RecordOutput {
            pairs: report.pairs.iter().map(DuplicatePairRecord::from).collect(),
            clusters: report
                .groups
                .iter()
                .map(|g| ClusterRecord::from(&g.cluster).with_strategy(g.merge_strategy))
                .collect(),
            rows_completed: report.rows_completed,
            rows_total: report.rows_total,
            cancelled: report.cancelled,
        };
        serde_json::to_writer_pretty(&mut out, &output)?;
    } else {
        serde_json::to_writer_pretty(&mut out, &report)?;
    }
    writeln!(out)?;
    Ok(())
}
