//! Error types shared by the solver and its I/O collaborators.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TspError>;

/// Errors surfaced to the driver
#[derive(Error, Debug)]
pub enum TspError {
    /// Not enough cities, non-finite coordinates or a malformed distance matrix
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A route that is not a permutation of all city indices
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// No parent pool can be formed from the generation
    #[error("Degenerate generation: cannot select a parent among {0} individuals")]
    DegenerateGeneration(usize),

    /// Malformed TSPLIB content
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TspError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        TspError::Parse { line, message: message.into() }
    }
}
