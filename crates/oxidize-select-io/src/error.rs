use oxidize_select_core::MlError;
use thiserror::Error;

/// Failure to obtain or interpret the input data. Always fatal, never retried.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed record {record}: {reason}")]
    Malformed { record: usize, reason: String },

    #[error("Invalid dataset: {0}")]
    Invalid(String),

    #[error(transparent)]
    Ml(#[from] MlError),
}

pub type DataResult<T> = Result<T, DataError>;
