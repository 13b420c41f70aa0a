//! PairLab Runner: backtest orchestration, data loading, summary, export.
//!
//! This crate builds on `pairlab-core` to provide:
//! - TOML configuration with validation and deterministic hashing
//! - Price-pair CSV loading with timestamp alignment, plus synthetic pairs
//! - Single-backtest runner and the `Backtester` façade
//! - Performance summary over the trade ledger
//! - JSON / CSV / Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{
    align_legs, generate_synthetic_pair, load_pair, load_synthetic, LoadError, LoadedPair,
    SyntheticOptions,
};
pub use export::{
    export_json, export_summary_csv, export_trades_csv, generate_report, import_json,
    load_artifacts, save_artifacts,
};
pub use metrics::{summary_rows, MonthlyProfit, SummaryRow, TradingSummary};
pub use runner::{run_backtest_from_data, BacktestResult, Backtester, RunError, SCHEMA_VERSION};
