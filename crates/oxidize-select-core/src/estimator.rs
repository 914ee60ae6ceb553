use crate::error::{MlError, MlResult};
use crate::params::ParamValue;
use crate::tensor::Tensor;

/// Unsupervised pipeline stage (scalers, encoders).
pub trait Transformer: Send + Sync {
    /// Step name used to route `step__param` settings.
    fn name(&self) -> &'static str;
    fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()>;
    fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>>;
    fn fit_transform(&mut self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
    fn set_param(&mut self, name: &str, _value: &ParamValue) -> MlResult<()> {
        Err(MlError::UnknownParameter(format!("{}__{}", self.name(), name)))
    }
    fn boxed_clone(&self) -> Box<dyn Transformer>;
}

/// Supervised classifier predicting 0/1 labels.
pub trait Estimator: Send + Sync {
    /// Step name used to route `step__param` settings.
    fn name(&self) -> &'static str;
    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<()>;
    fn predict(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>>;
    fn set_param(&mut self, name: &str, value: &ParamValue) -> MlResult<()>;
    fn boxed_clone(&self) -> Box<dyn Estimator>;
}

impl Clone for Box<dyn Transformer> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

impl Clone for Box<dyn Estimator> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Check that `x` is 2-D and has one label per row.
pub fn check_xy(x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<(usize, usize)> {
    let n = x.n_rows()?;
    let p = x.n_cols()?;
    if y.ndim() != 1 || y.numel() != n {
        return Err(MlError::ShapeMismatch {
            expected: vec![n],
            got: y.shape_vec(),
        });
    }
    if n == 0 {
        return Err(MlError::EmptyTensor);
    }
    Ok((n, p))
}
