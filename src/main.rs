//! prodalloc - Production Reconciliation & Allocation Engine
//!
//! # Usage
//!
//! ```bash
//! # Reconcile everything up to a cutoff
//! prodalloc run --input ./data/2024-06 --cutoff 2024-06-30
//!
//! # Replace only June in the store
//! prodalloc run --input ./data/2024-06 --start 2024-06-01 --cutoff 2024-06-30
//!
//! # Dump production rows as JSON lines
//! prodalloc export --out production.jsonl
//!
//! # Repair Day Seq UPRT on stored rows
//! prodalloc resequence
//!
//! # List monthly factors above 1.0
//! prodalloc ratio-exceptions --limit 1.0
//! ```
//!
//! # Environment Variables
//!
//! - `PRODALLOC_CONFIG`: Path to a TOML config file (default: `./prodalloc.toml`)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use prodalloc::config::defaults::{MONTHLY_VOLUMES_FILE, REGISTRY_FILE};
use prodalloc::{
    ratio_exceptions, EngineConfig, ExternalVolumeTable, FeedSet, InMemoryRegistry,
    OutputWriter, ProductionStore, ReconciliationEngine, RunWindow,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "prodalloc")]
#[command(about = "Production reconciliation and allocation engine")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides $PRODALLOC_CONFIG and ./prodalloc.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Reconcile the input directory and replace the window in the store
    Run {
        /// Directory holding wells.csv, the feed files and monthly_volumes.csv
        #[arg(long)]
        input: PathBuf,
        /// Last day to compute (YYYY-MM-DD)
        #[arg(long)]
        cutoff: NaiveDate,
        /// First day to emit; omitted means the whole history
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Store path (default: [storage] path from config)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Write stored production rows as JSON lines
    Export {
        #[arg(long)]
        store: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },

    /// Recompute Day Seq UPRT over every stored well
    Resequence {
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// List monthly allocation factors above a limit
    RatioExceptions {
        #[arg(long)]
        store: Option<PathBuf>,
        /// Report factors above this value (default: [allocation] ratio_exception_limit)
        #[arg(long)]
        limit: Option<f64>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::load(),
    };

    match args.command {
        SubCommand::Run {
            input,
            cutoff,
            start,
            store,
        } => {
            let window = match start {
                Some(start) => RunWindow::between(start, cutoff),
                None => RunWindow::through(cutoff),
            };
            run(config, &input, window, store)
        }
        SubCommand::Export { store, out } => {
            let store = open_store(&config, store)?;
            let file = File::create(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            let lines = store.export_production(&mut BufWriter::new(file))?;
            info!(rows = lines, out = %out.display(), "Export complete");
            Ok(())
        }
        SubCommand::Resequence { store } => {
            let store = open_store(&config, store)?;
            let report = store.resequence(config.sequence.uprt_threshold)?;
            println!(
                "Resequenced {} wells ({} skipped, timeline incomplete), {} rows changed",
                report.wells, report.wells_skipped, report.rows_changed
            );
            Ok(())
        }
        SubCommand::RatioExceptions { store, limit } => {
            let store = open_store(&config, store)?;
            let limit = limit.unwrap_or(config.allocation.ratio_exception_limit);
            print_ratio_exceptions(&store, limit)
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn open_store(config: &EngineConfig, path: Option<PathBuf>) -> Result<ProductionStore> {
    let path = path.unwrap_or_else(|| config.storage.path.clone());
    let store = ProductionStore::open(&path)
        .with_context(|| format!("Failed to open store {}", path.display()))?;
    Ok(store.with_batch_size(config.run.write_batch_size))
}

// ============================================================================
// Commands
// ============================================================================

fn run(config: EngineConfig, input: &Path, window: RunWindow, store: Option<PathBuf>) -> Result<()> {
    info!(input = %input.display(), cutoff = %window.cutoff, "Loading run inputs");

    let registry = InMemoryRegistry::load(&input.join(REGISTRY_FILE))
        .context("Failed to load well registry")?;
    let (feeds, summaries) = FeedSet::load_dir(input).context("Failed to load feeds")?;
    let volumes = ExternalVolumeTable::load(&input.join(MONTHLY_VOLUMES_FILE))
        .context("Failed to load monthly volumes")?;

    let store = open_store(&config, store)?;
    let engine = ReconciliationEngine::new(config);
    let output = engine.run(&registry, &feeds, &volumes, window)?;
    let written = store.replace_window(&output.wells, window)?;

    print!("{}", output.report);
    for summary in &summaries {
        println!("  Feed         {summary}");
    }
    println!("  Store:       {written}");
    Ok(())
}

fn print_ratio_exceptions(store: &ProductionStore, limit: f64) -> Result<()> {
    let factors = store.factors()?;
    let groups = ratio_exceptions(&factors, limit);
    if groups.is_empty() {
        println!("No factors above {limit}");
        return Ok(());
    }

    for group in groups {
        println!("=== {} ({} above {limit}) ===", group.kind.label(), group.exceptions.len());
        for e in &group.exceptions {
            println!(
                "  {:<20} {}  {:>10.4}  ({:.2} / {:.2})",
                e.well, e.month, e.value, e.numerator, e.denominator
            );
        }
    }
    Ok(())
}
