use crate::error::{MlError, MlResult};
use serde::{Deserialize, Serialize};

/// Dimensions of a tensor, outermost axis first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Size along a specific axis.
    pub fn dim(&self, axis: usize) -> MlResult<usize> {
        self.dims.get(axis).copied().ok_or(MlError::InvalidAxis {
            axis,
            ndim: self.ndim(),
        })
    }

    /// Total number of elements; a 0-d shape holds one.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.dims.clone()
    }

    /// Same shape with the leading axis replaced.
    pub fn with_rows(&self, rows: usize) -> Shape {
        let mut dims = self.dims.clone();
        if let Some(first) = dims.first_mut() {
            *first = rows;
        }
        Shape { dims }
    }
}
