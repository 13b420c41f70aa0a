//! Momentum divergence: trade the lagging leg when both legs trend together.
//!
//! Over the trailing `lookback_periods` points, both legs must show momentum of
//! the same sign with a meaningful gap between them:
//! - both rising: go Long the leg with the smaller |momentum| (expect catch-up)
//! - both falling: go Short the leg with the larger |momentum|
//!
//! The selected leg's last step must agree with the trade direction. The
//! target blends the two momenta, weighted toward the faster one by
//! `momentum_diff_threshold`.

use serde::{Deserialize, Serialize};

use super::momentum::momentum;
use super::{Signal, SignalGenerator};
use crate::domain::{Leg, PairWindow, Side};

/// Tunable parameters of the momentum divergence rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    /// Weight in [0, 1] placing the target between slower and faster momentum.
    pub momentum_diff_threshold: f64,
    /// Initial stop distance as a fraction of entry price.
    pub stop_loss_percentage: f64,
    /// Minimum |m1 - m2| (exclusive) for a signal.
    pub min_momentum_diff_for_signal: f64,
    /// Minimum |momentum| of the leading leg (inclusive).
    pub min_absolute_momentum_for_signal: f64,
    /// Number of trailing points used for momentum.
    pub lookback_periods: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            momentum_diff_threshold: 0.8,
            stop_loss_percentage: 0.005,
            min_momentum_diff_for_signal: 0.0,
            min_absolute_momentum_for_signal: 0.0,
            lookback_periods: 3,
        }
    }
}

/// Pairwise momentum divergence signal.
#[derive(Debug, Clone)]
pub struct MomentumDivergence {
    params: SignalParams,
}

impl MomentumDivergence {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    pub fn default_params() -> Self {
        Self::new(SignalParams::default())
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Pick side and traded leg from the two momenta, before price confirmation.
    pub fn classify(&self, m1: f64, m2: f64) -> Option<(Side, Leg)> {
        if m1.is_nan() || m2.is_nan() {
            return None;
        }
        if m1 == m2 || (m1 - m2).abs() <= self.params.min_momentum_diff_for_signal {
            return None;
        }

        let side = if m1 > 0.0 && m2 > 0.0 {
            Side::Long
        } else if m1 < 0.0 && m2 < 0.0 {
            Side::Short
        } else {
            return None;
        };

        let (lagging, leading_abs) = if m1.abs() < m2.abs() {
            (Leg::One, m2.abs())
        } else if m2.abs() < m1.abs() {
            (Leg::Two, m1.abs())
        } else {
            return None;
        };
        if leading_abs < self.params.min_absolute_momentum_for_signal {
            return None;
        }

        // Longs buy the laggard; shorts sell the leg falling hardest.
        let leg = match side {
            Side::Long => lagging,
            Side::Short => lagging.other(),
        };
        Some((side, leg))
    }

    /// Target price blended between the slower and faster momentum.
    pub fn target_price(&self, entry: f64, slower: f64, faster: f64) -> f64 {
        let change = slower + self.params.momentum_diff_threshold * (faster - slower);
        entry * (1.0 + change)
    }

    pub fn stop_loss_price(&self, entry: f64, side: Side) -> f64 {
        match side {
            Side::Long => entry * (1.0 - self.params.stop_loss_percentage),
            Side::Short => entry * (1.0 + self.params.stop_loss_percentage),
        }
    }
}

impl SignalGenerator for MomentumDivergence {
    fn name(&self) -> &str {
        "momentum_divergence"
    }

    fn warmup_points(&self) -> usize {
        self.params.lookback_periods
    }

    fn evaluate(&self, window: &PairWindow<'_>) -> Option<Signal> {
        let lookback = self.params.lookback_periods;
        if window.len() < lookback {
            return None;
        }
        let recent = window.trailing(lookback);

        let m1 = momentum(recent.leg(Leg::One));
        let m2 = momentum(recent.leg(Leg::Two));
        let (side, leg) = self.classify(m1, m2)?;

        let [.., previous, current] = recent.leg(leg) else {
            return None;
        };
        let (previous, current) = (*previous, *current);

        // Last step of the traded leg must point the same way as the trade.
        let confirmed = match side {
            Side::Long => current > previous,
            Side::Short => current < previous,
        };
        if !confirmed {
            return None;
        }

        let (slower, faster) = match side {
            Side::Long => (m1.min(m2), m1.max(m2)),
            Side::Short => (m1.max(m2), m1.min(m2)),
        };

        Some(Signal {
            side,
            leg,
            entry_price: current,
            target_price: self.target_price(current, slower, faster),
            stop_loss_price: self.stop_loss_price(current, side),
            momentum_1: m1,
            momentum_2: m2,
        })
    }
}
