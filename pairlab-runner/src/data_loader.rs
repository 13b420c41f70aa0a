//! Price-pair loading for the runner.
//!
//! Each leg is a CSV file with a header row holding a timestamp column
//! (`timestamp` or `datetime`) and a price column (`close` or `price`). The
//! two legs are inner-joined on timestamp; points present in only one leg
//! are dropped with a warning.
//!
//! Synthetic pairs are a developer-only debug mode. Results produced on
//! synthetic data are tagged as such in every artifact.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pairlab_core::domain::{DatasetHash, PairError, PricePair};
use pairlab_core::fingerprint::dataset_hash;
use thiserror::Error;
use tracing::{info, warn};

const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "datetime"];
const PRICE_COLUMNS: &[&str] = &["close", "price"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{source_name}: CSV error: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("{source_name}: no column named any of {candidates:?}")]
    MissingColumn {
        source_name: String,
        candidates: &'static [&'static str],
    },

    #[error("{source_name}: row {row}: cannot parse timestamp '{value}'")]
    BadTimestamp {
        source_name: String,
        row: usize,
        value: String,
    },

    #[error("{source_name}: row {row}: cannot parse price '{value}'")]
    BadPrice {
        source_name: String,
        row: usize,
        value: String,
    },

    #[error("the two legs share no timestamps")]
    NoOverlap,

    #[error("invalid price pair: {0}")]
    Pair(#[from] PairError),
}

/// A loaded pair with provenance for fingerprinting.
#[derive(Debug, Clone)]
pub struct LoadedPair {
    pub pair: PricePair,
    /// BLAKE3 over every aligned point.
    pub dataset_hash: DatasetHash,
    pub has_synthetic: bool,
    /// Points dropped because only one leg had them.
    pub dropped_points: usize,
    /// Human-readable origin, e.g. the two file names.
    pub source: String,
}

impl LoadedPair {
    /// Wrap an already aligned pair from a non-synthetic source.
    pub fn from_pair(pair: PricePair, source: impl Into<String>) -> Self {
        Self::new(pair, false, 0, source.into())
    }

    fn new(pair: PricePair, has_synthetic: bool, dropped_points: usize, source: String) -> Self {
        Self {
            dataset_hash: dataset_hash(&pair),
            pair,
            has_synthetic,
            dropped_points,
            source,
        }
    }
}

/// Load and align the two leg files.
pub fn load_pair(leg1: &Path, leg2: &Path) -> Result<LoadedPair, LoadError> {
    let series1 = read_leg_file(leg1)?;
    let series2 = read_leg_file(leg2)?;
    let (pair, dropped) = align_legs(&series1, &series2)?;
    info!(
        points = pair.len(),
        dropped,
        leg1 = %leg1.display(),
        leg2 = %leg2.display(),
        "loaded price pair"
    );
    let source = format!("{} / {}", leg1.display(), leg2.display());
    Ok(LoadedPair::new(pair, false, dropped, source))
}

/// Read one leg from a CSV file.
pub fn read_leg_file(path: &Path) -> Result<Vec<(NaiveDateTime, f64)>, LoadError> {
    let reader = csv::Reader::from_path(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_leg(reader, &path.display().to_string())
}

/// Read one leg from any CSV source. Rows come back sorted by time with
/// duplicate timestamps removed (first occurrence wins).
pub fn read_leg_csv<R: Read>(
    input: R,
    source_name: &str,
) -> Result<Vec<(NaiveDateTime, f64)>, LoadError> {
    read_leg(csv::Reader::from_reader(input), source_name)
}

fn read_leg<R: Read>(
    mut reader: csv::Reader<R>,
    source_name: &str,
) -> Result<Vec<(NaiveDateTime, f64)>, LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        source_name: source_name.to_string(),
        source,
    };

    let headers = reader.headers().map_err(csv_err)?.clone();
    let find = |candidates: &'static [&'static str]| {
        headers
            .iter()
            .position(|h| candidates.iter().any(|c| h.trim().eq_ignore_ascii_case(c)))
            .ok_or_else(|| LoadError::MissingColumn {
                source_name: source_name.to_string(),
                candidates,
            })
    };
    let ts_col = find(TIMESTAMP_COLUMNS)?;
    let price_col = find(PRICE_COLUMNS)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        // header is line 1
        let row = i + 2;
        let raw_ts = record.get(ts_col).unwrap_or("").trim();
        let raw_price = record.get(price_col).unwrap_or("").trim();

        let ts = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            source_name: source_name.to_string(),
            row,
            value: raw_ts.to_string(),
        })?;
        let price: f64 = raw_price.parse().map_err(|_| LoadError::BadPrice {
            source_name: source_name.to_string(),
            row,
            value: raw_price.to_string(),
        })?;
        rows.push((ts, price));
    }

    rows.sort_by_key(|(ts, _)| *ts);
    let before = rows.len();
    rows.dedup_by_key(|(ts, _)| *ts);
    if rows.len() < before {
        warn!(
            source = source_name,
            duplicates = before - rows.len(),
            "dropped duplicate timestamps"
        );
    }
    Ok(rows)
}

/// Parse `YYYY-MM-DD HH:MM:SS[.fff]`, the same with a `T` separator, or a
/// bare date (midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Inner-join two sorted legs on timestamp.
///
/// Returns the aligned pair and the number of points dropped from either leg.
pub fn align_legs(
    leg1: &[(NaiveDateTime, f64)],
    leg2: &[(NaiveDateTime, f64)],
) -> Result<(PricePair, usize), LoadError> {
    let mut timestamps = Vec::with_capacity(leg1.len().min(leg2.len()));
    let mut prices1 = Vec::with_capacity(timestamps.capacity());
    let mut prices2 = Vec::with_capacity(timestamps.capacity());

    let (mut i, mut j) = (0, 0);
    while i < leg1.len() && j < leg2.len() {
        let (t1, p1) = leg1[i];
        let (t2, p2) = leg2[j];
        match t1.cmp(&t2) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                timestamps.push(t1);
                prices1.push(p1);
                prices2.push(p2);
                i += 1;
                j += 1;
            }
        }
    }

    if timestamps.is_empty() && !(leg1.is_empty() && leg2.is_empty()) {
        return Err(LoadError::NoOverlap);
    }

    let dropped = (leg1.len() - timestamps.len()) + (leg2.len() - timestamps.len());
    if dropped > 0 {
        warn!(
            dropped,
            kept = timestamps.len(),
            "dropped points present in only one leg"
        );
    }
    Ok((PricePair::new(timestamps, prices1, prices2)?, dropped))
}

// ─── Synthetic pairs ────────────────────────────────────────────────

/// Parameters of a generated pair.
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    pub points: usize,
    pub seed: u64,
    pub start: NaiveDateTime,
    pub interval: Duration,
    /// Share of each step driven by the common factor, in [0, 1].
    pub correlation: f64,
    /// Half-width of the uniform per-step return.
    pub step_volatility: f64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            points: 2_000,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2025, 1, 2)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .unwrap_or_default(),
            interval: Duration::seconds(5),
            correlation: 0.8,
            step_volatility: 0.002,
        }
    }
}

/// Generate a tagged synthetic pair.
pub fn load_synthetic(opts: &SyntheticOptions) -> Result<LoadedPair, LoadError> {
    let pair = generate_synthetic_pair(opts)?;
    warn!(points = pair.len(), seed = opts.seed, "using SYNTHETIC price pair");
    let source = format!("synthetic(seed={})", opts.seed);
    Ok(LoadedPair::new(pair, true, 0, source))
}

/// Two correlated multiplicative random walks starting at 100 and 50.
///
/// Deterministic for a given seed.
pub fn generate_synthetic_pair(opts: &SyntheticOptions) -> Result<PricePair, PairError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed_bytes = blake3::hash(format!("pairlab-synthetic:{}", opts.seed).as_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let rho = opts.correlation.clamp(0.0, 1.0);
    let idio = (1.0 - rho * rho).sqrt();
    let vol = opts.step_volatility;

    let mut timestamps = Vec::with_capacity(opts.points);
    let mut leg1 = Vec::with_capacity(opts.points);
    let mut leg2 = Vec::with_capacity(opts.points);
    let (mut p1, mut p2) = (100.0_f64, 50.0_f64);

    for i in 0..opts.points {
        timestamps.push(opts.start + opts.interval * i as i32);
        leg1.push(p1);
        leg2.push(p2);

        let common: f64 = rng.gen_range(-1.0..1.0);
        let e1: f64 = rng.gen_range(-1.0..1.0);
        let e2: f64 = rng.gen_range(-1.0..1.0);
        p1 *= 1.0 + vol * (rho * common + idio * e1);
        p2 *= 1.0 + vol * (rho * common + idio * e2);
    }

    PricePair::new(timestamps, leg1, leg2)
}
