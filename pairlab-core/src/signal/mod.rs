//! Signal generation: turns a window of paired prices into an entry decision.
//!
//! Signals are ledger-agnostic: they receive a read-only view of both legs and
//! never see open trades or throttle state. A `Signal` is consumed by the
//! engine on the step it is produced and is not persisted.

pub mod divergence;
pub mod momentum;

use crate::domain::{Leg, PairWindow, Side};
use serde::{Deserialize, Serialize};

pub use divergence::{MomentumDivergence, SignalParams};
pub use momentum::momentum;

/// An entry decision for one leg of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub side: Side,
    pub leg: Leg,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss_price: f64,
    pub momentum_1: f64,
    pub momentum_2: f64,
}

/// Trait for pair signal generators.
///
/// # Architecture invariant
/// The window passed to `evaluate` ends strictly before the bar being
/// processed. Implementations must not assume anything about later points.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "momentum_divergence").
    fn name(&self) -> &str;

    /// Number of points needed before this generator can produce output.
    fn warmup_points(&self) -> usize;

    /// Returns `Some(Signal)` if an entry fires on this window, `None` otherwise.
    fn evaluate(&self, window: &PairWindow<'_>) -> Option<Signal>;
}

/// Generator that never fires. Used for engine plumbing tests and benches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSignal;

impl SignalGenerator for NullSignal {
    fn name(&self) -> &str {
        "null"
    }

    fn warmup_points(&self) -> usize {
        0
    }

    fn evaluate(&self, _window: &PairWindow<'_>) -> Option<Signal> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_signal_never_fires() {
        let a = [1.0, 2.0, 3.0];
        let b = [1.0, 1.5, 9.0];
        let sig = NullSignal;
        assert!(sig.evaluate(&PairWindow::new(&a, &b)).is_none());
        assert_eq!(sig.name(), "null");
        assert_eq!(sig.warmup_points(), 0);
    }

    #[test]
    fn signal_serialization_roundtrip() {
        let signal = Signal {
            side: Side::Long,
            leg: Leg::Two,
            entry_price: 100.0,
            target_price: 100.5,
            stop_loss_price: 99.5,
            momentum_1: 0.01,
            momentum_2: 0.001,
        };
        let json = serde_json::to_string(&signal).unwrap();
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(signal, back);
    }
}
