//! Break-even ratchet enforcement
//!
//! **Core Rule:** Stops may tighten, never loosen.
//!
//! Once a trade trades through its entry in the favorable direction, its stop
//! moves to the entry price. Later adverse moves never pull it back.

use crate::domain::{Side, Trade};

/// Apply the ratchet rule to a proposed stop level.
///
/// - Long trades: stop can only rise (max of current and proposed)
/// - Short trades: stop can only fall (min of current and proposed)
///
/// # Example
/// ```
/// use pairlab_core::domain::Side;
/// use pairlab_core::engine::ratchet::tighten;
///
/// // Tightening: $95 → $100 (allowed)
/// assert_eq!(tighten(Side::Long, 95.0, 100.0), 100.0);
///
/// // Loosening: $100 → $90 (blocked, stays at $100)
/// assert_eq!(tighten(Side::Long, 100.0, 90.0), 100.0);
/// ```
pub fn tighten(side: Side, current: f64, proposed: f64) -> f64 {
    match side {
        Side::Long => current.max(proposed),
        Side::Short => current.min(proposed),
    }
}

/// Move the stop to break-even if `price` is through entry in the trade's favor.
///
/// Returns true if the stop level changed.
pub fn apply_breakeven(trade: &mut Trade, price: f64) -> bool {
    if !trade.side.is_favorable(trade.entry_price, price) {
        return false;
    }
    let before = trade.stop_loss_price;
    trade.stop_loss_price = tighten(trade.side, before, trade.entry_price);
    trade.stop_loss_price != before
}

/// Whether the trade sits at (or beyond) break-even.
pub fn at_breakeven(trade: &Trade) -> bool {
    match trade.side {
        Side::Long => trade.stop_loss_price >= trade.entry_price,
        Side::Short => trade.stop_loss_price <= trade.entry_price,
    }
}
