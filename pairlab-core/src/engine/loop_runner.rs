//! Step-by-step replay: the heart of the backtesting engine.
//!
//! One step per point, starting at the second point. Each step:
//! 1. Review open trades: break-even ratchet, then target/stop exit check
//! 2. Feed newly closed trades to the loss throttle
//! 3. Ask the throttle whether entries are allowed
//! 4. Evaluate the signal on points strictly before this step; open a trade
//!
//! After the last step, remaining open trades are optionally force-closed at
//! the final price of their leg.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::domain::{ExitReason, PricePair, Trade, TradeExit};
use crate::risk::RiskThrottle;
use crate::signal::{Signal, SignalGenerator};

use super::ledger::{Ledger, LedgerError};
use super::ratchet::apply_breakeven;
use super::state::{EngineConfig, EntryFill, RunResult};

/// Replay `pair` through `signal_generator` under `config`.
///
/// Empty and single-point pairs perform zero steps and return an empty
/// ledger. Errors only if a ledger invariant is violated.
pub fn run_backtest(
    pair: &PricePair,
    signal_generator: &dyn SignalGenerator,
    config: &EngineConfig,
) -> Result<RunResult, LedgerError> {
    let num_points = pair.len();
    let timestamps = pair.timestamps();

    let mut ledger = Ledger::new();
    let mut throttle = RiskThrottle::new(config.max_consecutive_losses, config.cooling_period());
    let mut signal_count = 0;
    let mut blocked_steps = 0;

    info!(
        points = num_points,
        signal = signal_generator.name(),
        "starting replay"
    );

    for t in 1..num_points {
        let now = timestamps[t];

        // ─── Exits ───
        let closed = ledger.review_open(|trade| {
            let price = pair.price(trade.leg, t);
            if apply_breakeven(trade, price) {
                debug!(trade = %trade.id, stop = trade.stop_loss_price, "stop moved to break-even");
            }
            exit_decision(trade, now, price)
        })?;

        for id in closed {
            let trade = ledger.require(id)?;
            if let Some(exit) = trade.exit {
                debug!(
                    trade = %id,
                    reason = %exit.reason,
                    profit = exit.profit,
                    "closed trade"
                );
            }
            throttle.record_closed(trade);
        }

        // ─── Throttle ───
        if !throttle.allows_entry(now) {
            blocked_steps += 1;
            continue;
        }

        // ─── Entry ───
        let window = pair.window_before(t);
        let Some(signal) = signal_generator.evaluate(&window) else {
            continue;
        };
        let signal = match config.entry_fill {
            EntryFill::SignalPrice => signal,
            EntryFill::CurrentBar => refill(&signal, pair.price(signal.leg, t)),
        };
        signal_count += 1;
        let id = ledger.open_trade(now, &signal);
        debug!(
            trade = %id,
            side = %signal.side,
            leg = %signal.leg,
            entry = signal.entry_price,
            target = signal.target_price,
            stop = signal.stop_loss_price,
            "opened trade"
        );
    }

    // ─── End-of-run exit ───
    if config.perform_end_of_backtest_exit && num_points > 0 {
        let last = num_points - 1;
        let now = timestamps[last];
        let forced = ledger.review_open(|trade| {
            let price = pair.price(trade.leg, last);
            Some(exit_at(trade, now, price, ExitReason::EndOfRun))
        })?;
        if !forced.is_empty() {
            debug!(count = forced.len(), "force-closed trades at end of data");
        }
    }

    info!(
        trades = ledger.len(),
        open = ledger.open_count(),
        signals = signal_count,
        blocked_steps,
        "replay finished"
    );

    Ok(RunResult {
        step_count: num_points.saturating_sub(1),
        signal_count,
        blocked_steps,
        throttle_trips: throttle.trips(),
        first_time: pair.first_time(),
        last_time: pair.last_time(),
        ledger,
    })
}

/// Exit decision for an open trade at `price`. Target wins over stop when a
/// single price satisfies both.
pub fn exit_decision(trade: &Trade, now: NaiveDateTime, price: f64) -> Option<TradeExit> {
    if trade.target_reached(price) {
        Some(exit_at(trade, now, price, ExitReason::TargetHit))
    } else if trade.stop_breached(price) {
        Some(exit_at(trade, now, price, ExitReason::StopHit))
    } else {
        None
    }
}

fn exit_at(trade: &Trade, now: NaiveDateTime, price: f64, reason: ExitReason) -> TradeExit {
    TradeExit {
        exit_time: now,
        exit_price: price,
        profit: trade.side.profit(trade.entry_price, price),
        reason,
    }
}

/// Move a signal's entry to `fill`, keeping target and stop at the same
/// relative distance.
fn refill(signal: &Signal, fill: f64) -> Signal {
    let scale = fill / signal.entry_price;
    Signal {
        entry_price: fill,
        target_price: signal.target_price * scale,
        stop_loss_price: signal.stop_loss_price * scale,
        ..*signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Leg, Side, TradeId};
    use crate::signal::NullSignal;
    use chrono::{Duration, NaiveDate};

    fn ts(sec: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 25)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + Duration::seconds(sec)
    }

    fn long_trade(target: f64, stop: f64) -> Trade {
        Trade {
            id: TradeId(1),
            entry_time: ts(0),
            leg: Leg::One,
            side: Side::Long,
            entry_price: 100.0,
            target_price: target,
            stop_loss_price: stop,
            exit: None,
        }
    }

    #[test]
    fn target_wins_over_stop_on_same_price() {
        // degenerate levels where one price satisfies both
        let trade = long_trade(100.0, 100.0);
        let exit = exit_decision(&trade, ts(5), 100.0).unwrap();
        assert_eq!(exit.reason, ExitReason::TargetHit);
        assert_eq!(exit.profit, 0.0);
    }

    #[test]
    fn stop_exit_books_signed_loss() {
        let trade = long_trade(101.0, 99.5);
        let exit = exit_decision(&trade, ts(5), 99.0).unwrap();
        assert_eq!(exit.reason, ExitReason::StopHit);
        assert_eq!(exit.profit, -1.0);
        assert!(exit_decision(&trade, ts(5), 100.5).is_none());
    }

    #[test]
    fn refill_keeps_relative_levels() {
        let signal = Signal {
            side: Side::Long,
            leg: Leg::Two,
            entry_price: 100.0,
            target_price: 101.0,
            stop_loss_price: 99.5,
            momentum_1: 0.01,
            momentum_2: 0.001,
        };
        let filled = refill(&signal, 110.0);
        assert_eq!(filled.entry_price, 110.0);
        assert!((filled.target_price - 111.1).abs() < 1e-9);
        assert!((filled.stop_loss_price - 109.45).abs() < 1e-9);
        assert_eq!(filled.leg, Leg::Two);
    }

    #[test]
    fn empty_and_single_point_pairs_do_nothing() {
        let config = EngineConfig::default();
        let empty = PricePair::new(vec![], vec![], vec![]).unwrap();
        let result = run_backtest(&empty, &NullSignal, &config).unwrap();
        assert_eq!(result.step_count, 0);
        assert!(result.ledger.is_empty());

        let single = PricePair::new(vec![ts(0)], vec![1.0], vec![2.0]).unwrap();
        let result = run_backtest(&single, &NullSignal, &config).unwrap();
        assert_eq!(result.step_count, 0);
        assert!(result.ledger.is_empty());
    }
}
