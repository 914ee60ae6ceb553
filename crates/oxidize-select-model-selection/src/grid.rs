use std::sync::Arc;

use oxidize_select_core::error::MlResult;
use oxidize_select_core::Tensor;
use oxidize_select_pipeline::Pipeline;

use crate::cross_val::check_folds;
use crate::folds::{Splitter, StratifiedKFold};
use crate::parallel::NJobs;
use crate::params::ParamGrid;
use crate::search::{best_index, evaluate_candidates, finish_search, log_plan, CvSettings, Search, SearchResult};

/// Exhaustive search over a [`ParamGrid`] with k-fold cross-validation.
#[derive(Debug, Clone)]
pub struct GridSearchCv {
    pub pipeline: Pipeline,
    pub param_grid: ParamGrid,
    pub settings: CvSettings,
}

impl GridSearchCv {
    /// Stratified 5-fold, sequential, refit on.
    pub fn new(pipeline: Pipeline, param_grid: ParamGrid) -> Self {
        GridSearchCv { pipeline, param_grid, settings: CvSettings::default() }
    }

    /// Unshuffled stratified k-fold.
    pub fn with_cv(self, n_splits: usize) -> Self {
        self.with_splitter(StratifiedKFold::new(n_splits))
    }

    pub fn with_splitter<S: Splitter + 'static>(mut self, cv: S) -> Self {
        self.settings.cv = Arc::new(cv);
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: NJobs) -> Self {
        self.settings.n_jobs = n_jobs;
        self
    }

    pub fn with_refit(mut self, refit: bool) -> Self {
        self.settings.refit = refit;
        self
    }

    /// Cross-validation fits the search will perform: `|grid| x k`.
    pub fn n_planned_fits(&self) -> usize {
        self.param_grid.len() * self.settings.cv.n_splits()
    }
}

impl Search for GridSearchCv {
    fn template(&self) -> &Pipeline {
        &self.pipeline
    }

    fn fit(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<SearchResult> {
        let candidates = self.param_grid.candidates()?;
        let folds = self.settings.cv.split(y)?;
        check_folds(y, &folds)?;

        log_plan(folds.len(), candidates.len());
        let results = evaluate_candidates(
            &self.pipeline,
            &candidates,
            x,
            y,
            &folds,
            self.settings.n_jobs,
            0,
        )?;
        let best = best_index(&results)?;
        let n_fits = candidates.len() * folds.len();
        finish_search(&self.pipeline, &self.settings, x, y, results, best, n_fits)
    }
}
