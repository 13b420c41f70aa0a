//! Backtesting engine: step-by-step replay over an aligned price pair.
//!
//! Each step reviews open trades (break-even ratchet, then target/stop
//! exits), consults the loss throttle, and evaluates the signal on the
//! points before the step. The ledger keeps every trade for reporting.

pub mod ledger;
pub mod loop_runner;
pub mod ratchet;
pub mod state;

pub use ledger::{Ledger, LedgerError};
pub use loop_runner::{exit_decision, run_backtest};
pub use state::{EngineConfig, EntryFill, RunResult};
