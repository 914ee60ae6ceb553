use thiserror::Error;

/// Error type shared by tensors, estimators and the model-selection routines.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MlError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Invalid axis: {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("Invalid value for parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("Model not fitted")]
    NotFitted,

    #[error("Fit diverged: {0}")]
    Diverged(String),

    #[error("Degenerate fold: {0}")]
    DegenerateFold(String),

    #[error("Search exhausted: all {n_candidates} candidates failed")]
    ExhaustedSearch { n_candidates: usize },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Empty tensor")]
    EmptyTensor,
}

impl MlError {
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        MlError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type MlResult<T> = Result<T, MlError>;
