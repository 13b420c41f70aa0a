//! Risk controls applied between exits and new entries.

pub mod throttle;

pub use throttle::{RiskThrottle, ThrottleState};
