//! Serializable backtest configuration.
//!
//! A config file has two tables, both optional and fully defaulted:
//!
//! ```toml
//! [signal]
//! momentum_diff_threshold = 0.8
//! stop_loss_percentage = 0.005
//! lookback_periods = 3
//!
//! [engine]
//! max_consecutive_losses = 3
//! cooling_period_secs = 60
//! ```

use std::path::{Path, PathBuf};

use pairlab_core::domain::ConfigId;
use pairlab_core::engine::EngineConfig;
use pairlab_core::fingerprint::config_id;
use pairlab_core::signal::{MomentumDivergence, SignalParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to hash config: {0}")]
    Hash(#[from] serde_json::Error),
}

/// Complete configuration of one backtest run.
///
/// A fresh value per run; nothing is shared between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub signal: SignalParams,
    pub engine: EngineConfig,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.signal;
        if !(0.0..=1.0).contains(&s.momentum_diff_threshold) {
            return Err(invalid(
                "signal.momentum_diff_threshold",
                format!("must be in [0, 1], got {}", s.momentum_diff_threshold),
            ));
        }
        if !(s.stop_loss_percentage > 0.0 && s.stop_loss_percentage < 1.0) {
            return Err(invalid(
                "signal.stop_loss_percentage",
                format!("must be in (0, 1), got {}", s.stop_loss_percentage),
            ));
        }
        if !(s.min_momentum_diff_for_signal >= 0.0) {
            return Err(invalid(
                "signal.min_momentum_diff_for_signal",
                format!("must be >= 0, got {}", s.min_momentum_diff_for_signal),
            ));
        }
        if !(s.min_absolute_momentum_for_signal >= 0.0) {
            return Err(invalid(
                "signal.min_absolute_momentum_for_signal",
                format!("must be >= 0, got {}", s.min_absolute_momentum_for_signal),
            ));
        }
        if s.lookback_periods < 2 {
            return Err(invalid(
                "signal.lookback_periods",
                format!("must be at least 2, got {}", s.lookback_periods),
            ));
        }

        let e = &self.engine;
        if e.max_consecutive_losses == 0 {
            return Err(invalid("engine.max_consecutive_losses", "must be at least 1".into()));
        }
        if e.cooling_period_secs < 0 {
            return Err(invalid(
                "engine.cooling_period_secs",
                format!("must be >= 0, got {}", e.cooling_period_secs),
            ));
        }
        Ok(())
    }

    /// Deterministic hash of every parameter. Equal configs share an ID.
    pub fn config_hash(&self) -> Result<ConfigId, ConfigError> {
        Ok(config_id(self)?)
    }

    /// Signal generator for this config.
    pub fn build_signal(&self) -> MomentumDivergence {
        MomentumDivergence::new(self.signal.clone())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlab_core::engine::EntryFill;

    #[test]
    fn empty_document_uses_defaults() {
        let config = BacktestConfig::from_toml("").unwrap();
        assert_eq!(config, BacktestConfig::default());
        assert_eq!(config.signal.lookback_periods, 3);
        assert_eq!(config.engine.cooling_period_secs, 60);
    }

    #[test]
    fn partial_tables_fill_in_defaults() {
        let config = BacktestConfig::from_toml(
            r#"
            [signal]
            momentum_diff_threshold = 0.5

            [engine]
            max_consecutive_losses = 5
            entry_fill = "current_bar"
            "#,
        )
        .unwrap();
        assert_eq!(config.signal.momentum_diff_threshold, 0.5);
        assert_eq!(config.signal.stop_loss_percentage, 0.005);
        assert_eq!(config.engine.max_consecutive_losses, 5);
        assert_eq!(config.engine.entry_fill, EntryFill::CurrentBar);
        assert!(config.engine.perform_end_of_backtest_exit);
    }

    #[test]
    fn rejects_zero_loss_limit() {
        let err = BacktestConfig::from_toml("[engine]\nmax_consecutive_losses = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "engine.max_consecutive_losses",
                ..
            }
        ));
    }

    #[test]
    fn rejects_out_of_range_signal_params() {
        for doc in [
            "[signal]\nmomentum_diff_threshold = 1.5\n",
            "[signal]\nstop_loss_percentage = 0.0\n",
            "[signal]\nlookback_periods = 1\n",
            "[signal]\nmin_momentum_diff_for_signal = -0.1\n",
        ] {
            assert!(
                matches!(BacktestConfig::from_toml(doc), Err(ConfigError::Invalid { .. })),
                "accepted: {doc}"
            );
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = BacktestConfig::from_toml("[signal\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = BacktestConfig::from_file(Path::new("/nonexistent/pairlab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn config_hash_is_deterministic_and_value_sensitive() {
        let a = BacktestConfig::default();
        let mut b = BacktestConfig::default();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
        b.signal.lookback_periods = 5;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }
}
