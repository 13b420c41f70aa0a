//! Loss throttle: halts new entries after a burst of losing trades.
//!
//! Closed trades are kept in a sliding window of `cooling_period`. When the
//! window holds `max_losses` or more losers, the throttle trips and refuses
//! entries until `cooling_period` has passed since the trip. The window is
//! pruned on every check, so a loss older than the cooling period no longer
//! counts.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::domain::{Trade, TradeId};

/// State of the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrottleState {
    /// Entries allowed.
    Armed,
    /// Tripped; entries refused until the cooling period since `since` expires.
    Blocked { since: NaiveDateTime },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ClosedEntry {
    id: TradeId,
    exit_time: NaiveDateTime,
    profit: f64,
}

/// Sliding-window loss throttle for one backtest run.
#[derive(Debug, Clone)]
pub struct RiskThrottle {
    max_losses: usize,
    cooling_period: Duration,
    recent: VecDeque<ClosedEntry>,
    state: ThrottleState,
    trips: usize,
}

impl RiskThrottle {
    pub fn new(max_losses: usize, cooling_period: Duration) -> Self {
        Self {
            max_losses,
            cooling_period,
            recent: VecDeque::new(),
            state: ThrottleState::Armed,
            trips: 0,
        }
    }

    pub fn state(&self) -> ThrottleState {
        self.state
    }

    /// Number of times the throttle has tripped so far.
    pub fn trips(&self) -> usize {
        self.trips
    }

    /// Trades currently held in the window.
    pub fn window_len(&self) -> usize {
        self.recent.len()
    }

    /// Losing trades (profit < 0) currently held in the window.
    pub fn recent_losses(&self) -> usize {
        self.recent.iter().filter(|e| e.profit < 0.0).count()
    }

    /// Register a closed trade. Open trades and repeats are ignored.
    pub fn record_closed(&mut self, trade: &Trade) {
        let Some(exit) = trade.exit else {
            return;
        };
        if self.recent.iter().any(|e| e.id == trade.id) {
            return;
        }
        self.recent.push_back(ClosedEntry {
            id: trade.id,
            exit_time: exit.exit_time,
            profit: exit.profit,
        });
    }

    /// Decide whether new entries are allowed at `now`.
    ///
    /// Prunes the window, then honours an active block, then trips if the
    /// window holds too many losers. Must be called with non-decreasing `now`.
    pub fn allows_entry(&mut self, now: NaiveDateTime) -> bool {
        let cooling = self.cooling_period;
        self.recent.retain(|e| now - e.exit_time <= cooling);

        if let ThrottleState::Blocked { since } = self.state {
            if now - since < cooling {
                return false;
            }
            self.state = ThrottleState::Armed;
        }

        if self.recent_losses() >= self.max_losses {
            self.state = ThrottleState::Blocked { since: now };
            self.trips += 1;
            debug!(
                at = %now,
                losses = self.recent_losses(),
                "loss throttle tripped"
            );
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, Leg, Side, TradeExit};
    use chrono::NaiveDate;

    fn ts(sec: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 25)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + Duration::seconds(sec)
    }

    fn closed(id: u64, exit_sec: i64, profit: f64) -> Trade {
        Trade {
            id: TradeId(id),
            entry_time: ts(exit_sec - 5),
            leg: Leg::One,
            side: Side::Long,
            entry_price: 100.0,
            target_price: 101.0,
            stop_loss_price: 99.5,
            exit: Some(TradeExit {
                exit_time: ts(exit_sec),
                exit_price: 100.0 + profit,
                profit,
                reason: ExitReason::StopHit,
            }),
        }
    }

    fn throttle() -> RiskThrottle {
        RiskThrottle::new(3, Duration::seconds(60))
    }

    #[test]
    fn allows_entries_with_no_history() {
        let mut t = throttle();
        assert!(t.allows_entry(ts(0)));
        assert_eq!(t.state(), ThrottleState::Armed);
    }

    #[test]
    fn trips_at_max_losses() {
        let mut t = throttle();
        t.record_closed(&closed(1, 0, -1.0));
        t.record_closed(&closed(2, 5, -1.0));
        assert!(t.allows_entry(ts(5)));
        t.record_closed(&closed(3, 10, -1.0));
        assert!(!t.allows_entry(ts(10)));
        assert_eq!(t.state(), ThrottleState::Blocked { since: ts(10) });
        assert_eq!(t.trips(), 1);
    }

    #[test]
    fn winners_and_breakeven_do_not_count() {
        let mut t = throttle();
        t.record_closed(&closed(1, 0, -1.0));
        t.record_closed(&closed(2, 1, 0.0));
        t.record_closed(&closed(3, 2, 2.0));
        t.record_closed(&closed(4, 3, -1.0));
        assert!(t.allows_entry(ts(3)));
        assert_eq!(t.recent_losses(), 2);
    }

    #[test]
    fn block_holds_for_cooling_period_then_releases() {
        let mut t = throttle();
        for (id, sec) in [(1, 0), (2, 1), (3, 2)] {
            t.record_closed(&closed(id, sec, -1.0));
        }
        assert!(!t.allows_entry(ts(2)));
        assert!(!t.allows_entry(ts(30)));
        assert!(!t.allows_entry(ts(61)));
        // 63 - 2 > 60: block expired, losses at 0..=2 pruned
        assert!(t.allows_entry(ts(63)));
        assert_eq!(t.window_len(), 0);
    }

    #[test]
    fn block_re_trips_while_losses_still_in_window() {
        let mut t = throttle();
        for (id, sec) in [(1, 0), (2, 30), (3, 40)] {
            t.record_closed(&closed(id, sec, -1.0));
        }
        assert!(!t.allows_entry(ts(40)));
        // block since 40 expires at 100, but the loss at 40 is still in window
        // while losses at 0 and 30 have aged out
        assert!(t.allows_entry(ts(100)));
        assert_eq!(t.recent_losses(), 1);
    }

    #[test]
    fn expired_block_with_losses_in_window_resets_clock() {
        let mut t = RiskThrottle::new(1, Duration::seconds(60));
        t.record_closed(&closed(1, 0, -1.0));
        assert!(!t.allows_entry(ts(0)));
        t.record_closed(&closed(2, 59, -1.0));
        // block from 0 expired at 60, loss at 59 still counts: trip again
        assert!(!t.allows_entry(ts(60)));
        assert_eq!(t.state(), ThrottleState::Blocked { since: ts(60) });
        assert_eq!(t.trips(), 2);
    }

    #[test]
    fn prune_keeps_trades_exactly_at_cooling_boundary() {
        let mut t = throttle();
        t.record_closed(&closed(1, 0, -1.0));
        assert!(t.allows_entry(ts(60)));
        assert_eq!(t.window_len(), 1);
        assert!(t.allows_entry(ts(61)));
        assert_eq!(t.window_len(), 0);
    }

    #[test]
    fn duplicate_and_open_trades_are_ignored() {
        let mut t = throttle();
        let trade = closed(1, 0, -1.0);
        t.record_closed(&trade);
        t.record_closed(&trade);
        let mut open = closed(2, 0, -1.0);
        open.exit = None;
        t.record_closed(&open);
        assert_eq!(t.window_len(), 1);
    }
}
