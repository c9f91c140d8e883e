//! Error types for im-linkage

use thiserror::Error;

/// Result type alias for linkage operations
pub type Result<T> = std::result::Result<T, LinkageError>;

/// Main error type for linkage operations
///
/// Field-level data problems (bad dates, names without a phonetic code) are
/// absorbed during normalization and never show up here. Only input-contract
/// and configuration violations are reported.
#[derive(Error, Debug)]
pub enum LinkageError {
    /// A record has no identifier
    #[error("Record at row {row} has no identifier")]
    MissingIdentifier { row: usize },

    /// Two records share an identifier
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// Configuration failed validation
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration document could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration validation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A weight is negative or not finite
    #[error("Invalid weight for {feature}: {value}")]
    InvalidWeight { feature: &'static str, value: f64 },

    /// Threshold is not a finite number
    #[error("Invalid pair score threshold: {0}")]
    InvalidThreshold(f64),

    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

impl From<toml::de::Error> for LinkageError {
    fn from(err: toml::de::Error) -> Self {
        LinkageError::ConfigParse(err.to_string())
    }
}

impl From<serde_json::Error> for LinkageError {
    fn from(err: serde_json::Error) -> Self {
        LinkageError::ConfigParse(err.to_string())
    }
}
