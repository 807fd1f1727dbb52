use thiserror::Error;

use crate::core::types::CategoryId;

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("Unknown category: {0}")]
    UnknownCategory(CategoryId),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Fate assignment could not admit any candidate (threshold reached {0})")]
    FateUnresolvable(f64),

    #[error("Morphology parse error on line {line}: {reason}")]
    MorphologyParse { line: usize, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MosaicError>;
