//! Configuration for duplicate detection
//!
//! A `DetectorConfig` is built once (defaults, TOML or JSON), validated, and
//! then handed to the detector by value. Nothing mutates it during a run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::blocking::BlockingStrategy;
use crate::error::{ConfigError, LinkageError, Result};

/// Full detector configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Classification thresholds
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Per-feature weights
    #[serde(default)]
    pub weights: Weights,
    /// Candidate generation settings
    #[serde(default)]
    pub blocking: BlockingConfig,
}

/// Classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum pair score (inclusive) for a duplicate
    #[serde(default = "default_pair_score")]
    pub pair_score: f64,
}

fn default_pair_score() -> f64 {
    0.78
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            pair_score: default_pair_score(),
        }
    }
}

/// Weight per similarity feature
///
/// When the `[weights]` section is absent the defaults below apply. When it is
/// present, features it leaves out get weight 0.0 and contribute nothing.
/// Unknown feature names are rejected. Weights need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    #[serde(default)]
    pub name: f64,
    #[serde(default)]
    pub dob: f64,
    #[serde(default)]
    pub birthplace: f64,
    #[serde(default)]
    pub postcode: f64,
    #[serde(default)]
    pub gender: f64,
    #[serde(default)]
    pub occupation: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            name: 0.45,
            dob: 0.2,
            birthplace: 0.1,
            postcode: 0.1,
            gender: 0.05,
            occupation: 0.1,
        }
    }
}

impl Weights {
    /// All weights zero
    pub fn zero() -> Self {
        Self {
            name: 0.0,
            dob: 0.0,
            birthplace: 0.0,
            postcode: 0.0,
            gender: 0.0,
            occupation: 0.0,
        }
    }

    /// (feature name, weight) pairs in table column order
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("name", self.name),
            ("dob", self.dob),
            ("birthplace", self.birthplace),
            ("postcode", self.postcode),
            ("gender", self.gender),
            ("occupation", self.occupation),
        ]
    }

    /// Sum of all weights, the highest score a pair can reach
    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, w)| w).sum()
    }

    /// Reject negative or non-finite weights
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (feature, value) in self.entries() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { feature, value });
            }
        }
        Ok(())
    }
}

/// Candidate generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingConfig {
    /// Block key strategy; unknown names fall back to the default
    #[serde(default)]
    pub strategy: BlockingStrategy,
    /// Postcode characters used by `postcode_prefix_year`
    #[serde(default = "default_postcode_prefix_len")]
    pub postcode_prefix_len: usize,
}

fn default_postcode_prefix_len() -> usize {
    3
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            strategy: BlockingStrategy::default(),
            postcode_prefix_len: default_postcode_prefix_len(),
        }
    }
}

impl DetectorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the pair score threshold
    pub fn with_threshold(mut self, pair_score: f64) -> Self {
        self.thresholds.pair_score = pair_score;
        self
    }

    /// Override the weights
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Override the blocking strategy
    pub fn with_strategy(mut self, strategy: BlockingStrategy) -> Self {
        self.blocking.strategy = strategy;
        self
    }

    /// Override the postcode prefix length
    pub fn with_postcode_prefix_len(mut self, len: usize) -> Self {
        self.blocking.postcode_prefix_len = len;
        self
    }

    /// Minimum pair score for a duplicate
    pub fn pair_score_threshold(&self) -> f64 {
        self.thresholds.pair_score
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from a file, JSON for `.json` and TOML otherwise
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.thresholds.pair_score.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.thresholds.pair_score));
        }

        self.weights.validate()?;

        if self.blocking.postcode_prefix_len == 0 {
            return Err(ConfigError::OutOfRange(
                "postcode_prefix_len must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate, converting into the crate error type
    pub(crate) fn check(&self) -> Result<()> {
        self.validate().map_err(LinkageError::from)
    }
}
