//! Property tests for the performance summary.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pairlab_core::domain::{ExitReason, Leg, Side, Trade, TradeExit, TradeId};
use pairlab_runner::TradingSummary;
use proptest::prelude::*;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn closed_trade(i: usize, start: i64, hold: i64, entry: f64, profit: f64, stopped: bool) -> Trade {
    let entry_time = t0() + Duration::minutes(start);
    Trade {
        id: TradeId(i as u64 + 1),
        entry_time,
        leg: if i % 2 == 0 { Leg::One } else { Leg::Two },
        side: Side::Long,
        entry_price: entry,
        target_price: entry * 1.005,
        stop_loss_price: entry * 0.995,
        exit: Some(TradeExit {
            exit_time: entry_time + Duration::minutes(hold),
            exit_price: entry + profit,
            profit,
            reason: if stopped {
                ExitReason::StopHit
            } else {
                ExitReason::TargetHit
            },
        }),
    }
}

fn trades_strategy() -> impl Strategy<Value = Vec<Trade>> {
    prop::collection::vec(
        (0i64..5_000, 1i64..600, 10.0f64..500.0, -5.0f64..5.0, any::<bool>()),
        1..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (start, hold, entry, profit, stopped))| {
                closed_trade(i, start, hold, entry, profit, stopped)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn counts_partition_closed_trades(trades in trades_strategy()) {
        let s = TradingSummary::compute(&trades).unwrap();
        prop_assert_eq!(s.total_trades, trades.len());
        prop_assert_eq!(s.profitable_trades + s.losing_trades, s.total_trades);
    }

    #[test]
    fn total_profit_matches_ledger(trades in trades_strategy()) {
        let s = TradingSummary::compute(&trades).unwrap();
        let expected: f64 = trades.iter().filter_map(|t| t.profit()).sum();
        prop_assert!((s.total_profit - expected).abs() < 1e-9);
    }

    #[test]
    fn investment_figures_are_ordered(trades in trades_strategy()) {
        let s = TradingSummary::compute(&trades).unwrap();
        // Daily peaks never exceed the overall peak.
        prop_assert!(s.avg_max_investment <= s.max_investment + 1e-9);
        prop_assert!(s.max_investment > 0.0);
    }

    #[test]
    fn rates_stay_in_range(trades in trades_strategy()) {
        let s = TradingSummary::compute(&trades).unwrap();
        prop_assert!((0.0..=100.0).contains(&s.stop_loss_rate));
        prop_assert!(s.profit_factor >= 0.0);
    }

    #[test]
    fn monthly_rollup_covers_every_trade(trades in trades_strategy()) {
        let s = TradingSummary::compute(&trades).unwrap();
        let counted: usize = s.monthly.iter().map(|m| m.trade_count).sum();
        prop_assert_eq!(counted, trades.len());
    }
}
