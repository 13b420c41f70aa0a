//! PricePair: two equally spaced price series on one shared time axis.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which instrument of the pair a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    One,
    Two,
}

impl Leg {
    /// 1 or 2, as printed in ledgers.
    pub fn number(self) -> u8 {
        match self {
            Leg::One => 1,
            Leg::Two => 2,
        }
    }

    pub fn other(self) -> Leg {
        match self {
            Leg::One => Leg::Two,
            Leg::Two => Leg::One,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PairError {
    #[error("leg {leg} has {actual} prices but the time axis has {expected} points")]
    LengthMismatch {
        leg: Leg,
        expected: usize,
        actual: usize,
    },

    #[error("timestamps must be strictly increasing (violated at index {index}: {at})")]
    NonIncreasingTimestamp { index: usize, at: NaiveDateTime },

    #[error("leg {leg} has a non-finite or non-positive price at index {index}")]
    InvalidPrice { leg: Leg, index: usize },
}

/// Two aligned price series sharing one strictly increasing time axis.
///
/// Gap filling and resampling happen before construction; the engine treats
/// consecutive points as consecutive bars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePair {
    timestamps: Vec<NaiveDateTime>,
    leg1: Vec<f64>,
    leg2: Vec<f64>,
}

impl PricePair {
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        leg1: Vec<f64>,
        leg2: Vec<f64>,
    ) -> Result<Self, PairError> {
        let expected = timestamps.len();
        for (leg, prices) in [(Leg::One, &leg1), (Leg::Two, &leg2)] {
            if prices.len() != expected {
                return Err(PairError::LengthMismatch {
                    leg,
                    expected,
                    actual: prices.len(),
                });
            }
            if let Some(index) = prices.iter().position(|p| !p.is_finite() || *p <= 0.0) {
                return Err(PairError::InvalidPrice { leg, index });
            }
        }
        if let Some(w) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(PairError::NonIncreasingTimestamp {
                index: w + 1,
                at: timestamps[w + 1],
            });
        }
        Ok(Self {
            timestamps,
            leg1,
            leg2,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn leg(&self, leg: Leg) -> &[f64] {
        match leg {
            Leg::One => &self.leg1,
            Leg::Two => &self.leg2,
        }
    }

    pub fn price(&self, leg: Leg, index: usize) -> f64 {
        self.leg(leg)[index]
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// View of every point strictly before `index`.
    pub fn window_before(&self, index: usize) -> PairWindow<'_> {
        let end = index.min(self.len());
        PairWindow {
            leg1: &self.leg1[..end],
            leg2: &self.leg2[..end],
        }
    }
}

/// Borrowed view of both legs over the same span of points.
#[derive(Debug, Clone, Copy)]
pub struct PairWindow<'a> {
    leg1: &'a [f64],
    leg2: &'a [f64],
}

impl<'a> PairWindow<'a> {
    /// Build a window from raw slices. Both slices must have the same length.
    pub fn new(leg1: &'a [f64], leg2: &'a [f64]) -> Self {
        debug_assert_eq!(leg1.len(), leg2.len(), "pair window legs must align");
        Self { leg1, leg2 }
    }

    pub fn len(&self) -> usize {
        self.leg1.len().min(self.leg2.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn leg(&self, leg: Leg) -> &'a [f64] {
        match leg {
            Leg::One => self.leg1,
            Leg::Two => self.leg2,
        }
    }

    /// The last `n` points (or fewer if the window is shorter).
    pub fn trailing(&self, n: usize) -> PairWindow<'a> {
        let len = self.len();
        let start = len.saturating_sub(n);
        PairWindow {
            leg1: &self.leg1[start..len],
            leg2: &self.leg2[start..len],
        }
    }
}
