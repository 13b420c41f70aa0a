//! Domain types for PairLab

pub mod ids;
pub mod pair;
pub mod trade;

pub use ids::{ConfigId, DatasetHash, IdGen, RunId, TradeId};
pub use pair::{Leg, PairError, PairWindow, PricePair};
pub use trade::{ExitReason, Side, Trade, TradeExit};
