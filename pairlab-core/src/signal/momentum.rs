//! Momentum: mean of successive fractional returns over a window.
//!
//! momentum = mean((p[i+1] - p[i]) / p[i]) for i in 0..n-1
//! Undefined (NaN) for fewer than two points.

/// Mean one-step fractional return of `prices`.
///
/// Returns `f64::NAN` when fewer than two points are given; NaN inputs
/// propagate.
pub fn momentum(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return f64::NAN;
    }
    let sum: f64 = prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).sum();
    sum / (prices.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn momentum_basic() {
        // returns: +10%, -10%
        let m = momentum(&[100.0, 110.0, 99.0]);
        assert!((m - 0.0).abs() < EPS);
    }

    #[test]
    fn momentum_rising() {
        // returns: +1%, +2%
        let m = momentum(&[100.0, 101.0, 103.02]);
        assert!((m - 0.015).abs() < 1e-9);
    }

    #[test]
    fn momentum_flat_is_zero() {
        assert_eq!(momentum(&[50.0, 50.0, 50.0]), 0.0);
    }

    #[test]
    fn momentum_undefined_for_short_input() {
        assert!(momentum(&[]).is_nan());
        assert!(momentum(&[100.0]).is_nan());
    }

    #[test]
    fn momentum_nan_propagation() {
        assert!(momentum(&[100.0, f64::NAN, 102.0]).is_nan());
    }
}
