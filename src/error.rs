//! Error types for Author Flux

use thiserror::Error;

/// Errors that can occur during feature computation
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Failed to parse record: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid language selection: one or both of include_matching/include_non_matching must be set")]
    InvalidLanguageSelection,

    #[error("Lexicon error: {0}")]
    LexiconError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
