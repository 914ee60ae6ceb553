//! Cheap estimators and transformers for exercising the search machinery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{Estimator, ParamValue, Tensor, Transformer};
use oxidize_select_pipeline::Pipeline;

/// Predicts 1 when the first feature exceeds `threshold`.
///
/// Accepts any other parameter name so grids written for real models can
/// be replayed against it. `fail = 1` makes `fit` diverge. Every fit bumps
/// the shared counter.
#[derive(Debug, Clone)]
pub struct StubEstimator {
    pub threshold: f64,
    pub fail: bool,
    pub fits: Arc<AtomicUsize>,
    fitted: bool,
}

impl StubEstimator {
    pub fn new(fits: Arc<AtomicUsize>) -> Self {
        StubEstimator { threshold: 0.0, fail: false, fits, fitted: false }
    }
}

impl Estimator for StubEstimator {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn fit(&mut self, _x: &Tensor<f64>, _y: &Tensor<f64>) -> MlResult<()> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MlError::Diverged("stub asked to fail".into()));
        }
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        if !self.fitted {
            return Err(MlError::NotFitted);
        }
        let pred: Vec<f64> = x
            .rows()?
            .map(|row| if row[0] > self.threshold { 1.0 } else { 0.0 })
            .collect();
        Ok(Tensor::from_slice(&pred))
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> MlResult<()> {
        match name {
            "threshold" => self.threshold = value.expect_float(name)?,
            "fail" => self.fail = value.expect_usize(name)? == 1,
            _ => {}
        }
        Ok(())
    }

    fn boxed_clone(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

/// Identity transform that records the first-column values of every fit.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransformer {
    pub fitted_ids: Arc<Mutex<Vec<Vec<usize>>>>,
}

impl Transformer for RecordingTransformer {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()> {
        let ids: Vec<usize> = x.rows()?.map(|row| row[0] as usize).collect();
        self.fitted_ids
            .lock()
            .map_err(|_| MlError::InvalidOperation("poisoned".into()))?
            .push(ids);
        Ok(())
    }

    fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        Ok(x.clone())
    }

    fn boxed_clone(&self) -> Box<dyn Transformer> {
        Box::new(self.clone())
    }
}

pub fn stub_pipeline(fits: &Arc<AtomicUsize>) -> Pipeline {
    Pipeline::new().set_estimator(Box::new(StubEstimator::new(fits.clone())))
}

/// `n` rows with `x = i` and label 1 when `i % 3 == 0`, so a threshold on
/// the first feature scores better or worse depending on its value.
pub fn id_data(n: usize) -> (Tensor<f64>, Tensor<f64>) {
    let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 7) as f64]).collect();
    let labels: Vec<f64> = (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();
    (
        Tensor::from_vec2d(&rows).unwrap(),
        Tensor::from_slice(&labels),
    )
}
