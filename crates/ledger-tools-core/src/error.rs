//! Error types for Ledger Tools

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid rule {id}: {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM provider not configured")]
    NotConfigured,
}

impl Error {
    pub(crate) fn invalid_rule(id: &str, reason: impl Into<String>) -> Self {
        Error::InvalidRule {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
