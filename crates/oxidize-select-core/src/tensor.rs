use crate::dtype::Float;
use crate::error::{MlError, MlResult};
use crate::shape::Shape;

use serde::{Deserialize, Serialize};

/// Dense row-major tensor holding a feature matrix (`[samples, features]`)
/// or a label vector (`[samples]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> MlResult<Self> {
        let s = Shape::new(shape);
        if data.len() != s.numel() {
            return Err(MlError::ShapeMismatch {
                expected: s.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape: s })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let s = Shape::new(shape);
        Tensor {
            data: vec![T::ZERO; s.numel()],
            shape: s,
        }
    }

    /// 1-D tensor copied from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    /// 2-D tensor from rows of equal length.
    pub fn from_vec2d(rows: &[Vec<T>]) -> MlResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(MlError::ShapeMismatch {
                expected: vec![cols],
                got: vec![bad.len()],
            });
        }
        let flat: Vec<T> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::new(flat, vec![rows.len(), cols])
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Number of samples (size of the leading axis).
    pub fn n_rows(&self) -> MlResult<usize> {
        self.shape.dim(0)
    }

    /// Number of features of a 2-D tensor.
    pub fn n_cols(&self) -> MlResult<usize> {
        self.require_2d()?;
        self.shape.dim(1)
    }

    fn require_2d(&self) -> MlResult<()> {
        if self.ndim() != 2 {
            return Err(MlError::InvalidOperation(format!(
                "expected a 2-D tensor, got shape {:?}",
                self.shape.dims()
            )));
        }
        Ok(())
    }

    fn flat_index(&self, indices: &[usize]) -> MlResult<usize> {
        if indices.len() != self.ndim() {
            return Err(MlError::ShapeMismatch {
                expected: self.shape.to_vec(),
                got: indices.to_vec(),
            });
        }
        let mut flat = 0;
        for (axis, (&i, &size)) in indices.iter().zip(self.shape.dims()).enumerate() {
            if i >= size {
                return Err(MlError::IndexOutOfBounds { index: i, axis, size });
            }
            flat = flat * size + i;
        }
        Ok(flat)
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> MlResult<T> {
        Ok(self.data[self.flat_index(indices)?])
    }

    /// Borrow row `i` of a 2-D tensor.
    pub fn row(&self, i: usize) -> MlResult<&[T]> {
        let cols = self.n_cols()?;
        let rows = self.shape.dim(0)?;
        if i >= rows {
            return Err(MlError::IndexOutOfBounds { index: i, axis: 0, size: rows });
        }
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Iterate over the rows of a 2-D tensor.
    pub fn rows(&self) -> MlResult<std::slice::ChunksExact<'_, T>> {
        let cols = self.n_cols()?;
        Ok(self.data.chunks_exact(cols.max(1)))
    }

    // ─── Indexing ───────────────────────────────────────────────────────────

    /// Gather entries along the leading axis, in the order given.
    ///
    /// Works for both feature matrices and label vectors, so a fold's
    /// `train`/`test` index lists can be applied to `x` and `y` alike.
    pub fn select_rows(&self, indices: &[usize]) -> MlResult<Tensor<T>> {
        let rows = self.n_rows()?;
        let stride = if rows == 0 { 0 } else { self.data.len() / rows };
        let mut data = Vec::with_capacity(indices.len() * stride);
        for &i in indices {
            if i >= rows {
                return Err(MlError::IndexOutOfBounds { index: i, axis: 0, size: rows });
            }
            data.extend_from_slice(&self.data[i * stride..(i + 1) * stride]);
        }
        Ok(Tensor {
            data,
            shape: self.shape.with_rows(indices.len()),
        })
    }

    // ─── Element-wise ───────────────────────────────────────────────────────

    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape.clone(),
        }
    }

    /// Apply `f(value, column_param)` to every element of a 2-D tensor,
    /// pairing each column with one entry of `params`.
    pub fn apply_columns<F: Fn(T, T) -> T>(&self, params: &[T], f: F) -> MlResult<Tensor<T>> {
        let cols = self.n_cols()?;
        if params.len() != cols {
            return Err(MlError::ShapeMismatch {
                expected: vec![cols],
                got: vec![params.len()],
            });
        }
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(k, &v)| f(v, params[k % cols]))
            .collect();
        Ok(Tensor {
            data,
            shape: self.shape.clone(),
        })
    }

    // ─── Reductions ─────────────────────────────────────────────────────────

    pub fn sum_all(&self) -> T {
        self.data.iter().copied().sum()
    }

    pub fn mean_all(&self) -> MlResult<T> {
        if self.data.is_empty() {
            return Err(MlError::EmptyTensor);
        }
        Ok(self.sum_all() / T::from_usize(self.data.len()))
    }

    /// Population variance over every element.
    pub fn var_all(&self) -> MlResult<T> {
        let mean = self.mean_all()?;
        let ss: T = self.data.iter().map(|&v| (v - mean) * (v - mean)).sum();
        Ok(ss / T::from_usize(self.data.len()))
    }

    /// Mean along `axis` of a 2-D tensor (0 = per column, 1 = per row).
    pub fn mean_axis(&self, axis: usize) -> MlResult<Tensor<T>> {
        let (rows, cols) = self.dims_2d(axis)?;
        let mut out = vec![T::ZERO; if axis == 0 { cols } else { rows }];
        for (i, row) in self.data.chunks_exact(cols.max(1)).enumerate().take(rows) {
            for (j, &v) in row.iter().enumerate() {
                out[if axis == 0 { j } else { i }] += v;
            }
        }
        let n = T::from_usize(if axis == 0 { rows } else { cols });
        Ok(Tensor::from_slice(&out).apply(|s| s / n))
    }

    /// Population variance along `axis` of a 2-D tensor.
    pub fn var_axis(&self, axis: usize) -> MlResult<Tensor<T>> {
        let (rows, cols) = self.dims_2d(axis)?;
        let mean = self.mean_axis(axis)?;
        let mut out = vec![T::ZERO; mean.numel()];
        for (i, row) in self.data.chunks_exact(cols.max(1)).enumerate().take(rows) {
            for (j, &v) in row.iter().enumerate() {
                let k = if axis == 0 { j } else { i };
                let d = v - mean.data[k];
                out[k] += d * d;
            }
        }
        let n = T::from_usize(if axis == 0 { rows } else { cols });
        Ok(Tensor::from_slice(&out).apply(|s| s / n))
    }

    pub fn std_axis(&self, axis: usize) -> MlResult<Tensor<T>> {
        Ok(self.var_axis(axis)?.apply(T::sqrt))
    }

    fn dims_2d(&self, axis: usize) -> MlResult<(usize, usize)> {
        self.require_2d()?;
        if axis > 1 {
            return Err(MlError::InvalidAxis { axis, ndim: 2 });
        }
        let rows = self.shape.dim(0)?;
        let cols = self.shape.dim(1)?;
        if (axis == 0 && rows == 0) || (axis == 1 && cols == 0) {
            return Err(MlError::EmptyTensor);
        }
        Ok((rows, cols))
    }
}

/// Dot product of two equally sized slices.
#[inline]
pub fn dot<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b).map(|(&x, &y)| x * y).sum()
}

/// Squared Euclidean distance of two equally sized slices.
#[inline]
pub fn squared_distance<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

impl<T: Float> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }
}
