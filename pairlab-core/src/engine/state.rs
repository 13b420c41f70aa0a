//! Engine configuration and run result types.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::ledger::Ledger;

/// Price at which an accepted signal is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFill {
    /// Fill at the last price the signal saw (the close before the current bar).
    #[default]
    SignalPrice,
    /// Fill at the current bar's price; target and stop keep their
    /// distance from entry in percentage terms.
    ///
    /// This is the literal reading of "open a trade at time `i`": the fill
    /// uses the step-`i` price rather than the window's last close.
    CurrentBar,
}

/// Configuration for a single replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Force-close every open trade at the last price when the data runs out.
    pub perform_end_of_backtest_exit: bool,
    /// Losing trades inside the cooling window that trip the throttle.
    pub max_consecutive_losses: usize,
    /// Length of the throttle window and of a block, in seconds.
    pub cooling_period_secs: i64,
    pub entry_fill: EntryFill,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            perform_end_of_backtest_exit: true,
            max_consecutive_losses: 3,
            cooling_period_secs: 60,
            entry_fill: EntryFill::SignalPrice,
        }
    }
}

impl EngineConfig {
    pub fn cooling_period(&self) -> Duration {
        Duration::seconds(self.cooling_period_secs)
    }
}

/// Result of a complete replay.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Every trade in decision order (open trades remain open unless the
    /// end-of-run exit is enabled).
    pub ledger: Ledger,
    /// Number of steps processed (one per point after the first).
    pub step_count: usize,
    /// Signals accepted as new trades.
    pub signal_count: usize,
    /// Steps on which the throttle refused entries.
    pub blocked_steps: usize,
    /// Times the throttle tripped.
    pub throttle_trips: usize,
    pub first_time: Option<NaiveDateTime>,
    pub last_time: Option<NaiveDateTime>,
}
