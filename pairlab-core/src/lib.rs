//! PairLab Core: domain types, signal, risk throttle, trade ledger, replay loop.
//!
//! This crate contains the heart of the pairs backtesting engine:
//! - Domain types (price pairs, legs, trades, IDs)
//! - Momentum-divergence signal behind the `SignalGenerator` trait
//! - Sliding-window loss throttle
//! - Trade ledger with break-even ratchet
//! - Step-by-step replay loop

pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod risk;
pub mod signal;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: all core types are Send + Sync.
    ///
    /// Runs can be moved onto worker threads; if any type fails this check,
    /// the build breaks immediately.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::PricePair>();
        require_sync::<domain::PricePair>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::TradeExit>();
        require_sync::<domain::TradeExit>();
        require_send::<domain::Leg>();
        require_sync::<domain::Leg>();

        // ID types
        require_send::<domain::TradeId>();
        require_sync::<domain::TradeId>();
        require_send::<domain::RunId>();
        require_sync::<domain::RunId>();

        // Signal types
        require_send::<signal::Signal>();
        require_sync::<signal::Signal>();
        require_send::<signal::MomentumDivergence>();
        require_sync::<signal::MomentumDivergence>();
        require_send::<signal::NullSignal>();
        require_sync::<signal::NullSignal>();

        // Engine types
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<engine::Ledger>();
        require_sync::<engine::Ledger>();
        require_send::<risk::RiskThrottle>();
        require_sync::<risk::RiskThrottle>();

        require_send::<fingerprint::RunFingerprint>();
        require_sync::<fingerprint::RunFingerprint>();
    }

    /// Architecture contract: SignalGenerator sees prices only.
    ///
    /// `evaluate()` takes a `PairWindow` and nothing else, so a signal
    /// cannot read open trades or throttle state. If someone adds a ledger
    /// parameter, every implementation breaks.
    #[test]
    fn signal_generator_trait_has_no_ledger_parameter() {
        fn _check_trait_object_builds(
            sig: &dyn signal::SignalGenerator,
            window: &domain::PairWindow<'_>,
        ) -> Option<signal::Signal> {
            sig.evaluate(window)
        }
    }
}
