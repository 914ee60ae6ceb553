use oxidize_select_core::MlError;
use oxidize_select_io::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Ml(#[from] MlError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
