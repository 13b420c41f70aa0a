//! Backtest runner: wires together config, data, engine, and summary.
//!
//! Two entry points:
//! - `run_backtest_from_data()`: pre-loaded pair, no I/O. Used by tests and the CLI.
//! - `Backtester`: stateful façade that runs once and then serves the ledger
//!   and summary. Asking for results before the run is an error.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use pairlab_core::domain::{RunId, Trade};
use pairlab_core::engine::{run_backtest, LedgerError};
use pairlab_core::fingerprint::RunFingerprint;
use pairlab_core::signal::SignalGenerator;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{LoadError, LoadedPair};
use crate::export::{export_summary_csv, export_trades_csv};
use crate::metrics::{SummaryRow, TradingSummary};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("must run backtest first")]
    NotRun,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: RunFingerprint,
    pub config: BacktestConfig,
    /// Every trade in decision order.
    pub trades: Vec<Trade>,
    /// `None` when no trade closed.
    pub summary: Option<TradingSummary>,
    pub source: String,
    pub has_synthetic: bool,
    pub dropped_points: usize,
    pub step_count: usize,
    pub signal_count: usize,
    pub blocked_steps: usize,
    pub throttle_trips: usize,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Summary table, or the single sentinel row when no trade closed.
    pub fn summary_rows(&self, include_monthly: bool) -> Vec<SummaryRow> {
        match &self.summary {
            Some(summary) => summary.rows(include_monthly),
            None => vec![SummaryRow::no_trades()],
        }
    }
}

/// Run a backtest on a pre-loaded pair, with no I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    data: &LoadedPair,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let signal = config.build_signal();
    let run_id = RunId::new(config.config_hash()?, data.dataset_hash.clone());

    info!(run = %run_id.hash(), source = %data.source, "running backtest");
    let result = run_backtest(&data.pair, &signal, &config.engine)?;

    let trades = result.ledger.into_trades();
    let summary = TradingSummary::compute(&trades);
    let fingerprint = RunFingerprint::new(run_id, signal.name(), &data.pair, trades.len());

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        config: config.clone(),
        trades,
        summary,
        source: data.source.clone(),
        has_synthetic: data.has_synthetic,
        dropped_points: data.dropped_points,
        step_count: result.step_count,
        signal_count: result.signal_count,
        blocked_steps: result.blocked_steps,
        throttle_trips: result.throttle_trips,
    })
}

/// Holds one config and one pair; runs once, then serves results.
#[derive(Debug, Clone)]
pub struct Backtester {
    config: BacktestConfig,
    data: LoadedPair,
    result: Option<BacktestResult>,
}

impl Backtester {
    /// Validates the config up front.
    pub fn new(config: BacktestConfig, data: LoadedPair) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            data,
            result: None,
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn has_run(&self) -> bool {
        self.result.is_some()
    }

    /// Replay the pair. Running again replaces the previous result.
    pub fn run(&mut self) -> Result<&BacktestResult, RunError> {
        let result = run_backtest_from_data(&self.config, &self.data)?;
        Ok(self.result.insert(result))
    }

    pub fn result(&self) -> Result<&BacktestResult, RunError> {
        self.result.as_ref().ok_or(RunError::NotRun)
    }

    pub fn into_result(self) -> Result<BacktestResult, RunError> {
        self.result.ok_or(RunError::NotRun)
    }

    pub fn trades(&self) -> Result<&[Trade], RunError> {
        Ok(&self.result()?.trades)
    }

    pub fn summary(&self, include_monthly: bool) -> Result<Vec<SummaryRow>, RunError> {
        Ok(self.result()?.summary_rows(include_monthly))
    }

    /// Write the trade ledger CSV.
    pub fn write_trades_csv(&self, path: &Path) -> anyhow::Result<()> {
        let csv = export_trades_csv(self.trades()?)?;
        std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Write the summary CSV.
    pub fn write_summary_csv(&self, path: &Path, include_monthly: bool) -> anyhow::Result<()> {
        let csv = export_summary_csv(&self.summary(include_monthly)?)?;
        std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{load_synthetic, SyntheticOptions};

    fn synthetic(points: usize) -> LoadedPair {
        load_synthetic(&SyntheticOptions {
            points,
            ..SyntheticOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn results_before_run_are_errors() {
        let bt = Backtester::new(BacktestConfig::default(), synthetic(50)).unwrap();
        assert!(!bt.has_run());
        assert!(matches!(bt.result(), Err(RunError::NotRun)));
        assert!(matches!(bt.trades(), Err(RunError::NotRun)));
        assert!(matches!(bt.summary(false), Err(RunError::NotRun)));
        assert_eq!(RunError::NotRun.to_string(), "must run backtest first");
    }

    #[test]
    fn csv_writers_before_run_surface_not_run() {
        let bt = Backtester::new(BacktestConfig::default(), synthetic(50)).unwrap();
        let err = bt.write_trades_csv(Path::new("unused.csv")).unwrap_err();
        assert!(matches!(err.downcast_ref::<RunError>(), Some(RunError::NotRun)));
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let mut config = BacktestConfig::default();
        config.engine.max_consecutive_losses = 0;
        assert!(matches!(
            Backtester::new(config, synthetic(10)),
            Err(RunError::Config(_))
        ));
    }

    #[test]
    fn run_is_deterministic() {
        let data = synthetic(1_000);
        let a = run_backtest_from_data(&BacktestConfig::default(), &data).unwrap();
        let b = run_backtest_from_data(&BacktestConfig::default(), &data).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.trades.len(), b.trades.len());
        assert_eq!(a.summary, b.summary);
        assert!(a.has_synthetic);
        assert_eq!(a.step_count, 999);
    }

    #[test]
    fn run_populates_results() {
        let mut bt = Backtester::new(BacktestConfig::default(), synthetic(500)).unwrap();
        let trades = bt.run().unwrap().trades.len();
        assert!(bt.has_run());
        assert_eq!(bt.trades().unwrap().len(), trades);
        assert!(!bt.summary(false).unwrap().is_empty());
    }
}
