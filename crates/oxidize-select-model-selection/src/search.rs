use std::sync::Arc;

use log::{debug, info, warn};
use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::params::format_params;
use oxidize_select_core::{ParamSet, Tensor};
use oxidize_select_pipeline::Pipeline;
use serde::Serialize;

use crate::cross_val::fit_and_score;
use crate::folds::{Fold, Splitter, StratifiedKFold};
use crate::parallel::{run_units, NJobs};

/// Cross-validation outcome of one candidate configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    pub params: ParamSet,
    /// Accuracy per fold; `None` where that fit or score failed.
    pub fold_scores: Vec<Option<f64>>,
    /// Mean over folds, `None` when any fold failed.
    pub mean_score: Option<f64>,
    /// Population standard deviation over folds.
    pub std_score: Option<f64>,
    /// 1 is best; equal means share a rank. Across halving rounds a later
    /// round outranks any earlier one. Failed candidates are unranked.
    pub rank: Option<usize>,
    /// Successive-halving round, 0 for single-round searches.
    pub round: usize,
    /// Training samples the folds were drawn from.
    pub n_resources: usize,
}

impl CandidateResult {
    fn new(params: ParamSet, fold_scores: Vec<Option<f64>>, round: usize, n_resources: usize) -> Self {
        let complete: Option<Vec<f64>> = fold_scores.iter().copied().collect();
        let (mean_score, std_score) = match complete {
            Some(scores) if !scores.is_empty() => {
                let n = scores.len() as f64;
                let mean = scores.iter().sum::<f64>() / n;
                let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
                (Some(mean), Some(var.sqrt()))
            }
            _ => (None, None),
        };
        CandidateResult {
            params,
            fold_scores,
            mean_score,
            std_score,
            rank: None,
            round,
            n_resources,
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.mean_score.is_some()
    }
}

/// Outcome of a hyperparameter search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_params: ParamSet,
    /// Mean cross-validated accuracy of `best_params`.
    pub best_score: f64,
    /// Position of the winner in `cv_results`.
    pub best_index: usize,
    pub cv_results: Vec<CandidateResult>,
    /// The template refitted with `best_params` on all search data, if refit is on.
    pub best_estimator: Option<Pipeline>,
    /// Cross-validation fits performed, excluding the refit.
    pub n_fits: usize,
}

impl SearchResult {
    pub fn best(&self) -> &CandidateResult {
        &self.cv_results[self.best_index]
    }
}

/// A hyperparameter search that can be nested inside an outer cross-validation.
pub trait Search: Send + Sync {
    /// The unfitted pipeline candidates are applied to.
    fn template(&self) -> &Pipeline;
    fn fit(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<SearchResult>;
}

/// Settings shared by every cross-validated search.
#[derive(Debug, Clone)]
pub struct CvSettings {
    pub cv: Arc<dyn Splitter>,
    pub n_jobs: NJobs,
    pub refit: bool,
}

impl Default for CvSettings {
    fn default() -> Self {
        CvSettings {
            cv: Arc::new(StratifiedKFold::new(5)),
            n_jobs: NJobs::default(),
            refit: true,
        }
    }
}

pub(crate) fn log_plan(n_folds: usize, n_candidates: usize) {
    info!(
        "Fitting {} folds for each of {} candidates, totalling {} fits",
        n_folds,
        n_candidates,
        n_folds * n_candidates
    );
}

/// Run every candidate x fold unit and tabulate the scores.
///
/// A failing unit disqualifies its candidate but not the search.
pub(crate) fn evaluate_candidates(
    template: &Pipeline,
    candidates: &[ParamSet],
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    folds: &[Fold],
    n_jobs: NJobs,
    round: usize,
) -> MlResult<Vec<CandidateResult>> {
    let k = folds.len();
    let scores = run_units(candidates.len() * k, n_jobs, |unit| {
        let (c, f) = (unit / k, unit % k);
        match fit_and_score(template, &candidates[c], x, y, &folds[f]) {
            Ok(score) => {
                debug!("candidate {} fold {}: {:.4}", c, f, score);
                Some(score)
            }
            Err(e) => {
                warn!(
                    "candidate {} fold {} failed ({}): {}",
                    c,
                    f,
                    format_params(&candidates[c]),
                    e
                );
                None
            }
        }
    })?;

    let n_resources = y.numel();
    let mut results: Vec<CandidateResult> = candidates
        .iter()
        .zip(scores.chunks(k.max(1)))
        .map(|(params, fold_scores)| {
            CandidateResult::new(params.clone(), fold_scores.to_vec(), round, n_resources)
        })
        .collect();
    assign_ranks(&mut results);
    Ok(results)
}

pub(crate) fn assign_ranks(results: &mut [CandidateResult]) {
    let keys: Vec<Option<(usize, f64)>> = results
        .iter()
        .map(|r| r.mean_score.map(|m| (r.round, m)))
        .collect();
    for (r, key) in results.iter_mut().zip(&keys) {
        r.rank = key.map(|(round, mean)| {
            1 + keys
                .iter()
                .flatten()
                .filter(|&&(other_round, other)| {
                    other_round > round || (other_round == round && other > mean)
                })
                .count()
        });
    }
}

/// Index of the highest mean score; the first one wins ties.
pub(crate) fn best_index(results: &[CandidateResult]) -> MlResult<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, r) in results.iter().enumerate() {
        if let Some(mean) = r.mean_score {
            if best.map_or(true, |(_, b)| mean > b) {
                best = Some((i, mean));
            }
        }
    }
    best.map(|(i, _)| i).ok_or(MlError::ExhaustedSearch {
        n_candidates: results.len(),
    })
}

/// Build the result around `cv_results[best]`, refitting on `x`/`y` when asked.
pub(crate) fn finish_search(
    template: &Pipeline,
    settings: &CvSettings,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    cv_results: Vec<CandidateResult>,
    best: usize,
    n_fits: usize,
) -> MlResult<SearchResult> {
    let winner = &cv_results[best];
    let best_params = winner.params.clone();
    let best_score = winner.mean_score.ok_or(MlError::ExhaustedSearch {
        n_candidates: cv_results.len(),
    })?;
    info!("best score {:.4} with {}", best_score, format_params(&best_params));

    let best_estimator = if settings.refit {
        let mut model = template.with_params(&best_params)?;
        model.fit(x, y)?;
        Some(model)
    } else {
        None
    };

    Ok(SearchResult {
        best_params,
        best_score,
        best_index: best,
        cv_results,
        best_estimator,
        n_fits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use oxidize_select_core::ParamValue;

    fn row(scores: &[Option<f64>]) -> CandidateResult {
        CandidateResult::new(ParamSet::new(), scores.to_vec(), 0, 10)
    }

    #[test]
    fn test_mean_and_population_std() {
        let r = row(&[Some(0.8), Some(1.0), Some(0.9), Some(0.9)]);
        assert_abs_diff_eq!(r.mean_score.unwrap(), 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(r.std_score.unwrap(), 0.005f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_failed_fold_disqualifies() {
        let r = row(&[Some(1.0), None]);
        assert!(!r.is_qualified());
        assert!(r.std_score.is_none());
    }

    #[test]
    fn test_ranks_and_first_max_tie_break() {
        let mut results = vec![
            row(&[Some(0.7)]),
            row(&[Some(0.9)]),
            row(&[None]),
            row(&[Some(0.9)]),
        ];
        results[3].params.insert("marker".into(), ParamValue::Int(3));
        assign_ranks(&mut results);
        let ranks: Vec<Option<usize>> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![Some(3), Some(1), None, Some(1)]);
        assert_eq!(best_index(&results).unwrap(), 1);
    }

    #[test]
    fn test_later_rounds_rank_first() {
        let mut results = vec![
            row(&[Some(0.95)]),
            row(&[Some(0.8)]),
            row(&[Some(0.7)]),
            row(&[Some(0.9)]),
        ];
        results[2].round = 1;
        results[3].round = 1;
        assign_ranks(&mut results);
        let ranks: Vec<Option<usize>> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![Some(3), Some(4), Some(2), Some(1)]);
    }

    #[test]
    fn test_all_failed_is_exhausted() {
        let results = vec![row(&[None]), row(&[Some(0.5), None])];
        assert_eq!(
            best_index(&results).unwrap_err(),
            MlError::ExhaustedSearch { n_candidates: 2 }
        );
    }
}
