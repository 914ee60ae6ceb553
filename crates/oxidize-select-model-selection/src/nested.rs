use log::info;
use oxidize_select_core::error::MlResult;
use oxidize_select_core::params::format_params;
use oxidize_select_core::{ParamSet, Tensor};

use crate::cross_val::check_folds;
use crate::folds::Splitter;
use crate::search::Search;

/// Scores of a nested cross-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedCvResult {
    /// Held-out accuracy of the refitted inner winner, per outer fold.
    pub outer_scores: Vec<f64>,
    /// Inner winner per outer fold.
    pub best_params: Vec<ParamSet>,
}

impl NestedCvResult {
    pub fn mean(&self) -> f64 {
        self.outer_scores.iter().sum::<f64>() / self.outer_scores.len() as f64
    }

    /// Population standard deviation of the outer scores.
    pub fn std(&self) -> f64 {
        let mean = self.mean();
        let var = self
            .outer_scores
            .iter()
            .map(|s| (s - mean).powi(2))
            .sum::<f64>()
            / self.outer_scores.len() as f64;
        var.sqrt()
    }
}

/// Estimate the generalization accuracy of a whole search procedure.
///
/// For each outer fold the inner `search` runs on the outer training rows
/// only; its winner, refitted on those rows, is scored once on the outer
/// held-out rows.
pub fn nested_cross_val_score<S: Search + ?Sized>(
    search: &S,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    outer_cv: &dyn Splitter,
) -> MlResult<NestedCvResult> {
    let folds = outer_cv.split(y)?;
    check_folds(y, &folds)?;

    let mut outer_scores = Vec::with_capacity(folds.len());
    let mut best_params = Vec::with_capacity(folds.len());
    for (k, fold) in folds.iter().enumerate() {
        let x_train = x.select_rows(&fold.train)?;
        let y_train = y.select_rows(&fold.train)?;
        let inner = search.fit(&x_train, &y_train)?;

        let model = match inner.best_estimator {
            Some(model) => model,
            None => {
                let mut model = search.template().with_params(&inner.best_params)?;
                model.fit(&x_train, &y_train)?;
                model
            }
        };
        let score = model.score(&x.select_rows(&fold.test)?, &y.select_rows(&fold.test)?)?;
        info!(
            "outer fold {}/{}: inner best {:.4} with {}, held-out {:.4}",
            k + 1,
            folds.len(),
            inner.best_score,
            format_params(&inner.best_params),
            score
        );
        outer_scores.push(score);
        best_params.push(inner.best_params);
    }

    Ok(NestedCvResult { outer_scores, best_params })
}
