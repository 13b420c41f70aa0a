//! PairLab CLI: run the momentum-divergence pairs backtest.
//!
//! Commands:
//! - `run`: backtest two CSV price legs with an optional TOML config
//! - `synthetic`: backtest a generated, seeded pair (debug only)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDateTime};
use clap::{Parser, Subcommand};
use pairlab_core::domain::Side;
use pairlab_runner::data_loader::parse_timestamp;
use pairlab_runner::{
    load_pair, load_synthetic, save_artifacts, BacktestConfig, BacktestResult, Backtester,
    LoadedPair, SyntheticOptions,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pairlab",
    about = "PairLab CLI: momentum-divergence pairs-trading backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest two CSV price legs.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV for leg one (timestamp/datetime + close/price columns).
        #[arg(long)]
        leg1: PathBuf,

        /// CSV for leg two.
        #[arg(long)]
        leg2: PathBuf,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Append the per-month profit rollup to the summary.
        #[arg(long, default_value_t = false)]
        monthly: bool,
    },
    /// Backtest a synthetic correlated pair.
    Synthetic {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of points to generate.
        #[arg(long, default_value_t = 2_000)]
        points: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First timestamp (YYYY-MM-DD HH:MM:SS). Defaults to 2025-01-02 09:30:00.
        #[arg(long)]
        start: Option<String>,

        /// Spacing between points in seconds.
        #[arg(long, default_value_t = 5)]
        interval_secs: i64,

        /// Share of each step driven by the common factor (0 to 1).
        #[arg(long, default_value_t = 0.8)]
        correlation: f64,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Append the per-month profit rollup to the summary.
        #[arg(long, default_value_t = false)]
        monthly: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            leg1,
            leg2,
            output_dir,
            monthly,
        } => {
            let config = load_config(config.as_deref())?;
            let data = load_pair(&leg1, &leg2)?;
            run_and_report(config, data, &output_dir, monthly)
        }
        Commands::Synthetic {
            config,
            points,
            seed,
            start,
            interval_secs,
            correlation,
            output_dir,
            monthly,
        } => {
            if interval_secs <= 0 {
                bail!("--interval-secs must be positive");
            }
            if !(0.0..=1.0).contains(&correlation) {
                bail!("--correlation must be between 0 and 1");
            }
            let config = load_config(config.as_deref())?;
            let mut opts = SyntheticOptions {
                points,
                seed,
                interval: Duration::seconds(interval_secs),
                correlation,
                ..SyntheticOptions::default()
            };
            if let Some(start) = start {
                opts.start = parse_start(&start)?;
            }
            let data = load_synthetic(&opts)?;
            run_and_report(config, data, &output_dir, monthly)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn parse_start(raw: &str) -> Result<NaiveDateTime> {
    match parse_timestamp(raw) {
        Some(ts) => Ok(ts),
        None => bail!("cannot parse --start '{raw}' (expected YYYY-MM-DD HH:MM:SS)"),
    }
}

fn run_and_report(
    config: BacktestConfig,
    data: LoadedPair,
    output_dir: &Path,
    monthly: bool,
) -> Result<()> {
    info!(
        source = %data.source,
        points = data.pair.len(),
        synthetic = data.has_synthetic,
        "pair loaded"
    );
    let mut backtester = Backtester::new(config, data)?;
    backtester.run()?;
    let result = backtester.result()?;

    print_summary(result, monthly);

    // Save full artifact set (manifest.json, trades.csv, summary.csv, report.md)
    let run_dir = save_artifacts(result, output_dir, monthly)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn print_summary(result: &BacktestResult, monthly: bool) {
    let fp = &result.fingerprint;
    let longs = result.trades.iter().filter(|t| t.side == Side::Long).count();

    println!();
    println!("=== Backtest Result ===");
    println!("Source:         {}", result.source);
    if let (Some(first), Some(last)) = (fp.first_time, fp.last_time) {
        println!("Period:         {first} to {last}");
    }
    println!("Points:         {}", fp.points);
    println!("Signals:        {}", result.signal_count);
    println!(
        "Trades:         {} ({} long, {} short)",
        result.trades.len(),
        longs,
        result.trades.len() - longs
    );
    println!(
        "Throttle:       {} trips, {} blocked steps",
        result.throttle_trips, result.blocked_steps
    );
    println!();
    println!("--- Performance ---");
    for row in result.summary_rows(monthly) {
        println!("{:<28} {:>16}  {}", row.metric, row.value, row.info);
    }
    if result.dropped_points > 0 {
        println!();
        println!(
            "WARNING: {} points dropped (timestamps present in only one leg)",
            result.dropped_points
        );
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
