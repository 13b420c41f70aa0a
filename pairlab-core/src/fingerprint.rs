//! Run fingerprinting: deterministic identification of a replay.
//!
//! - `dataset_hash`: content hash of an aligned price pair.
//! - `config_id`: hash of the canonical JSON of any serializable config.
//! - `RunFingerprint`: the identity record written to a run's manifest.

use crate::domain::{ConfigId, DatasetHash, Leg, PricePair, RunId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Content hash over every timestamp and price of both legs.
///
/// Two pairs hash equal only if they hold the same points in the same order.
pub fn dataset_hash(pair: &PricePair) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(pair.len() as u64).to_le_bytes());
    let (leg1, leg2) = (pair.leg(Leg::One), pair.leg(Leg::Two));
    for (i, ts) in pair.timestamps().iter().enumerate() {
        hasher.update(&ts.and_utc().timestamp_micros().to_le_bytes());
        hasher.update(&leg1[i].to_bits().to_le_bytes());
        hasher.update(&leg2[i].to_bits().to_le_bytes());
    }
    DatasetHash::from_hash(&hasher.finalize().to_hex())
}

/// Hash the canonical JSON form of a config.
///
/// Struct fields serialize in declaration order, so equal configs hash equal.
pub fn config_id<T: Serialize>(config: &T) -> Result<ConfigId, serde_json::Error> {
    let json = serde_json::to_string(config)?;
    Ok(ConfigId::from_bytes(json.as_bytes()))
}

/// Identity record of one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    // ── Identity ──
    pub run_id: RunId,
    pub run_hash: String,
    pub signal_name: String,

    // ── Data ──
    pub points: usize,
    pub first_time: Option<NaiveDateTime>,
    pub last_time: Option<NaiveDateTime>,

    // ── Outcome ──
    pub trade_count: usize,
}

impl RunFingerprint {
    pub fn new(
        run_id: RunId,
        signal_name: &str,
        pair: &PricePair,
        trade_count: usize,
    ) -> Self {
        Self {
            run_hash: run_id.hash(),
            run_id,
            signal_name: signal_name.to_string(),
            points: pair.len(),
            first_time: pair.first_time(),
            last_time: pair.last_time(),
            trade_count,
        }
    }
}
