use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{Float, Tensor, Transformer};

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Statistics come only from the data handed to [`fit`](StandardScaler::fit);
/// `transform` never updates them.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler<T: Float> {
    pub mean: Option<Tensor<T>>,
    pub std: Option<Tensor<T>>,
    n_samples_seen: usize,
}

impl<T: Float> StandardScaler<T> {
    pub fn new() -> Self {
        StandardScaler {
            mean: None,
            std: None,
            n_samples_seen: 0,
        }
    }

    /// Compute per-feature mean and population std from `x` (`[samples, features]`).
    pub fn fit(&mut self, x: &Tensor<T>) -> MlResult<()> {
        self.mean = Some(x.mean_axis(0)?);
        self.std = Some(x.std_axis(0)?);
        self.n_samples_seen = x.n_rows()?;
        Ok(())
    }

    pub fn transform(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(MlError::NotFitted),
        };
        // Constant features keep a unit scale.
        let std_safe = std.apply(|v| if v.abs() < T::EPSILON { T::ONE } else { v });
        let centered = x.apply_columns(mean.data(), |v, m| v - m)?;
        centered.apply_columns(std_safe.data(), |v, s| v / s)
    }

    pub fn fit_transform(&mut self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Number of rows the current statistics were computed from.
    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }
}

impl Transformer for StandardScaler<f64> {
    fn name(&self) -> &'static str {
        "scaler"
    }

    fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()> {
        StandardScaler::fit(self, x)
    }

    fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        StandardScaler::transform(self, x)
    }

    fn boxed_clone(&self) -> Box<dyn Transformer> {
        Box::new(self.clone())
    }
}
