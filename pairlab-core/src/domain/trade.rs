//! Trade: one position in a single leg, open until its exit is stamped.

use super::ids::TradeId;
use super::pair::Leg;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Profit of moving from `entry` to `price`, signed in the trade's favor.
    pub fn profit(self, entry: f64, price: f64) -> f64 {
        match self {
            Side::Long => price - entry,
            Side::Short => entry - price,
        }
    }

    /// True when `price` has moved in the trade's favor relative to `entry`.
    pub fn is_favorable(self, entry: f64, price: f64) -> bool {
        match self {
            Side::Long => price > entry,
            Side::Short => price < entry,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "Long"),
            Side::Short => write!(f, "Short"),
        }
    }
}

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    TargetHit,
    StopHit,
    EndOfRun,
}

impl ExitReason {
    /// Human-readable label used in exported ledgers.
    pub fn label(self) -> &'static str {
        match self {
            ExitReason::TargetHit => "Target Price Hit",
            ExitReason::StopHit => "Stop Loss Hit",
            ExitReason::EndOfRun => "End of Backtest Exit",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal fields of a closed trade. Written exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeExit {
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub profit: f64,
    pub reason: ExitReason,
}

/// A single trade record.
///
/// `stop_loss_price` is the only field that changes while the trade is open
/// (break-even ratchet). Once `exit` is set the record is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,

    // ── Entry ──
    pub entry_time: NaiveDateTime,
    pub leg: Leg,
    pub side: Side,
    pub entry_price: f64,

    // ── Levels ──
    pub target_price: f64,
    pub stop_loss_price: f64,

    // ── Exit ──
    pub exit: Option<TradeExit>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.exit.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.exit.is_some()
    }

    pub fn exit_time(&self) -> Option<NaiveDateTime> {
        self.exit.map(|e| e.exit_time)
    }

    pub fn exit_price(&self) -> Option<f64> {
        self.exit.map(|e| e.exit_price)
    }

    pub fn profit(&self) -> Option<f64> {
        self.exit.map(|e| e.profit)
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit.map(|e| e.reason)
    }

    pub fn is_winner(&self) -> bool {
        self.profit().is_some_and(|p| p > 0.0)
    }

    /// Whether `price` reaches the profit target.
    pub fn target_reached(&self, price: f64) -> bool {
        match self.side {
            Side::Long => price >= self.target_price,
            Side::Short => price <= self.target_price,
        }
    }

    /// Whether `price` breaches the current stop.
    pub fn stop_breached(&self, price: f64) -> bool {
        match self.side {
            Side::Long => price <= self.stop_loss_price,
            Side::Short => price >= self.stop_loss_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 25)
            .unwrap()
            .and_hms_opt(10, 0, sec)
            .unwrap()
    }

    fn sample_trade(side: Side) -> Trade {
        Trade {
            id: TradeId(1),
            entry_time: ts(0),
            leg: Leg::Two,
            side,
            entry_price: 100.0,
            target_price: if side == Side::Long { 101.0 } else { 99.0 },
            stop_loss_price: if side == Side::Long { 99.5 } else { 100.5 },
            exit: None,
        }
    }

    #[test]
    fn side_profit_is_signed_in_favor() {
        assert_eq!(Side::Long.profit(100.0, 103.0), 3.0);
        assert_eq!(Side::Short.profit(100.0, 103.0), -3.0);
        assert_eq!(Side::Short.profit(100.0, 97.0), 3.0);
    }

    #[test]
    fn long_levels() {
        let t = sample_trade(Side::Long);
        assert!(t.target_reached(101.0));
        assert!(!t.target_reached(100.9));
        assert!(t.stop_breached(99.5));
        assert!(!t.stop_breached(99.6));
    }

    #[test]
    fn short_levels() {
        let t = sample_trade(Side::Short);
        assert!(t.target_reached(99.0));
        assert!(!t.target_reached(99.1));
        assert!(t.stop_breached(100.5));
        assert!(!t.stop_breached(100.4));
    }

    #[test]
    fn exit_accessors() {
        let mut t = sample_trade(Side::Long);
        assert!(t.is_open());
        assert_eq!(t.profit(), None);
        t.exit = Some(TradeExit {
            exit_time: ts(10),
            exit_price: 101.0,
            profit: 1.0,
            reason: ExitReason::TargetHit,
        });
        assert!(t.is_closed());
        assert!(t.is_winner());
        assert_eq!(t.exit_reason(), Some(ExitReason::TargetHit));
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let t = sample_trade(Side::Short);
        let json = serde_json::to_string(&t).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, t.id);
        assert_eq!(back.side, Side::Short);
        assert_eq!(back.leg, Leg::Two);
    }
}
