//! Trade ledger: every trade of a run in decision order.
//!
//! Open trades are the working subset tracked by index. Each step the engine
//! reviews the open subset, the ledger partitions it into closing and retained
//! trades, stamps the exits, and replaces the working set. Closed trades stay
//! in the ledger for reporting.
//!
//! State machine per trade:
//! ```text
//! Open ──(review → exit)──► Closed{TargetHit | StopHit | EndOfRun}
//! ```
//! Closed is absorbing: a second exit write is an error.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::{IdGen, Trade, TradeExit, TradeId};
use crate::signal::Signal;

/// Errors from ledger operations.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("trade {0} not found")]
    NotFound(TradeId),

    #[error("trade {0} is already closed")]
    AlreadyClosed(TradeId),

    #[error("trade {id} cannot exit at {exit} before its entry at {entry}")]
    ExitBeforeEntry {
        id: TradeId,
        entry: NaiveDateTime,
        exit: NaiveDateTime,
    },
}

/// Ordered record of all trades of one run.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    trades: Vec<Trade>,
    open: Vec<usize>,
    ids: IdGen,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a trade from an accepted signal. Returns its ID.
    pub fn open_trade(&mut self, entry_time: NaiveDateTime, signal: &Signal) -> TradeId {
        let id = self.ids.next_trade_id();
        self.trades.push(Trade {
            id,
            entry_time,
            leg: signal.leg,
            side: signal.side,
            entry_price: signal.entry_price,
            target_price: signal.target_price,
            stop_loss_price: signal.stop_loss_price,
            exit: None,
        });
        self.open.push(self.trades.len() - 1);
        id
    }

    /// Review every open trade.
    ///
    /// `review` may adjust the trade's stop and returns `Some(exit)` to close
    /// it. Closing trades are partitioned out of the open set, then stamped.
    /// Returns the IDs closed on this call, in decision order.
    pub fn review_open<F>(&mut self, mut review: F) -> Result<Vec<TradeId>, LedgerError>
    where
        F: FnMut(&mut Trade) -> Option<TradeExit>,
    {
        let working = std::mem::take(&mut self.open);
        let decisions: Vec<(usize, Option<TradeExit>)> = working
            .into_iter()
            .map(|idx| (idx, review(&mut self.trades[idx])))
            .collect();

        let (closing, retained): (Vec<_>, Vec<_>) =
            decisions.into_iter().partition(|(_, exit)| exit.is_some());
        self.open = retained.into_iter().map(|(idx, _)| idx).collect();

        let mut closed = Vec::with_capacity(closing.len());
        for (idx, exit) in closing {
            if let Some(exit) = exit {
                self.stamp_exit(idx, exit)?;
                closed.push(self.trades[idx].id);
            }
        }
        Ok(closed)
    }

    fn stamp_exit(&mut self, idx: usize, exit: TradeExit) -> Result<(), LedgerError> {
        let trade = &mut self.trades[idx];
        if trade.exit.is_some() {
            return Err(LedgerError::AlreadyClosed(trade.id));
        }
        if exit.exit_time < trade.entry_time {
            return Err(LedgerError::ExitBeforeEntry {
                id: trade.id,
                entry: trade.entry_time,
                exit: exit.exit_time,
            });
        }
        trade.exit = Some(exit);
        Ok(())
    }

    pub fn get(&self, id: TradeId) -> Option<&Trade> {
        // IDs are assigned sequentially from 1 in push order.
        let idx = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.trades.get(idx).filter(|t| t.id == id)
    }

    /// Look up a trade, failing with `NotFound` for unknown IDs.
    pub fn require(&self, id: TradeId) -> Result<&Trade, LedgerError> {
        self.get(id).ok_or(LedgerError::NotFound(id))
    }

    /// All trades in decision order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &Trade> {
        self.open.iter().map(|&idx| &self.trades[idx])
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_closed())
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Consume the ledger, returning the trades in decision order.
    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}
