use std::sync::Arc;

use log::info;
use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{ParamSet, Tensor};
use oxidize_select_pipeline::Pipeline;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cross_val::check_folds;
use crate::distributions::ParamDistributions;
use crate::folds::{Splitter, StratifiedKFold};
use crate::parallel::NJobs;
use crate::search::{best_index, evaluate_candidates, finish_search, log_plan, CvSettings, Search, SearchResult};

/// Cross-validated search over `n_iter` configurations drawn from
/// [`ParamDistributions`].
///
/// With a seed the draws, and therefore the result, are reproducible.
#[derive(Debug, Clone)]
pub struct RandomizedSearchCv {
    pub pipeline: Pipeline,
    pub distributions: ParamDistributions,
    pub n_iter: usize,
    pub seed: Option<u64>,
    pub settings: CvSettings,
}

impl RandomizedSearchCv {
    pub fn new(pipeline: Pipeline, distributions: ParamDistributions, n_iter: usize) -> Self {
        RandomizedSearchCv {
            pipeline,
            distributions,
            n_iter,
            seed: None,
            settings: CvSettings::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

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

    /// The configurations `fit` will evaluate, in order.
    pub fn sample_candidates(&self) -> MlResult<Vec<ParamSet>> {
        if self.n_iter == 0 {
            return Err(MlError::invalid_param("n_iter", "must be at least 1"));
        }
        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        self.distributions.sample_n(self.n_iter, &mut rng)
    }
}

impl Search for RandomizedSearchCv {
    fn template(&self) -> &Pipeline {
        &self.pipeline
    }

    fn fit(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<SearchResult> {
        let candidates = self.sample_candidates()?;
        info!("sampled {} candidates (seed {:?})", candidates.len(), self.seed);
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
