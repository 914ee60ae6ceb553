use std::sync::Arc;

use log::info;
use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{ParamSet, Tensor};
use oxidize_select_pipeline::Pipeline;
use oxidize_select_preprocessing::{class_indices, stratified_sample_indices};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::cross_val::check_folds;
use crate::distributions::ParamDistributions;
use crate::folds::{Splitter, StratifiedKFold};
use crate::parallel::NJobs;
use crate::params::ParamGrid;
use crate::search::{
    assign_ranks, evaluate_candidates, finish_search, log_plan, CvSettings, Search, SearchResult,
};

/// Where the first round's candidates come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidatePool {
    Grid(ParamGrid),
    Sampled {
        distributions: ParamDistributions,
        n_candidates: NCandidates,
    },
}

/// Size of a sampled pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NCandidates {
    /// `max_resources / min_resources` candidates.
    Exhaust,
    Fixed(usize),
}

/// Training samples used in the first round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinResources {
    /// The larger of `2 * n_splits * n_classes` and the smallest subsample
    /// whose stratified draw holds at least `n_splits` of every class.
    Smallest,
    /// Small enough that the last round uses every training sample.
    Exhaust,
    Fixed(usize),
}

/// Summary of one halving round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HalvingRound {
    pub round: usize,
    pub n_candidates: usize,
    pub n_resources: usize,
}

/// Successive halving with training-set size as the resource.
///
/// Each round scores the surviving candidates by k-fold cross-validation on
/// a stratified subsample of the round's budget, keeps the best
/// `max(1, floor(n / factor))` and multiplies the budget by `factor`. The
/// search stops once a single candidate survives or a round has used the
/// full training set, so it runs at most `ceil(log(pool) / log(factor))`
/// rounds.
#[derive(Debug, Clone)]
pub struct HalvingSearchCv {
    pub pipeline: Pipeline,
    pub pool: CandidatePool,
    pub factor: f64,
    pub min_resources: MinResources,
    pub seed: Option<u64>,
    pub settings: CvSettings,
}

impl HalvingSearchCv {
    fn with_pool(pipeline: Pipeline, pool: CandidatePool) -> Self {
        HalvingSearchCv {
            pipeline,
            pool,
            factor: 3.0,
            min_resources: MinResources::Smallest,
            seed: None,
            settings: CvSettings::default(),
        }
    }

    /// Start from every configuration of `grid`.
    pub fn from_grid(pipeline: Pipeline, grid: ParamGrid) -> Self {
        Self::with_pool(pipeline, CandidatePool::Grid(grid))
    }

    /// Start from configurations sampled from `distributions`.
    pub fn from_distributions(
        pipeline: Pipeline,
        distributions: ParamDistributions,
        n_candidates: NCandidates,
    ) -> Self {
        Self::with_pool(pipeline, CandidatePool::Sampled { distributions, n_candidates })
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_min_resources(mut self, min_resources: MinResources) -> Self {
        self.min_resources = min_resources;
        self
    }

    /// Seeds both candidate sampling and the per-round subsamples.
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

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        }
    }

    fn resolve_min_resources(&self, n_samples: usize, class_counts: &[usize]) -> MlResult<usize> {
        let smallest = smallest_resources(self.settings.cv.n_splits(), class_counts, n_samples);
        let min = match self.min_resources {
            MinResources::Smallest => smallest,
            MinResources::Fixed(r) => r,
            MinResources::Exhaust => {
                let pool = match &self.pool {
                    CandidatePool::Grid(grid) => grid.len(),
                    CandidatePool::Sampled { n_candidates: NCandidates::Fixed(m), .. } => *m,
                    CandidatePool::Sampled { n_candidates: NCandidates::Exhaust, .. } => {
                        return Err(MlError::invalid_param(
                            "min_resources",
                            "cannot be 'exhaust' when n_candidates is 'exhaust'",
                        ))
                    }
                };
                let rounds = max_rounds(pool, self.factor);
                let shrink = self.factor.powi(rounds as i32 - 1);
                ((n_samples as f64 / shrink).floor() as usize).max(smallest)
            }
        };
        if min == 0 || min > n_samples {
            return Err(MlError::invalid_param(
                "min_resources",
                format!("must lie in [1, {}], got {}", n_samples, min),
            ));
        }
        Ok(min)
    }

    fn initial_candidates(&self, n_samples: usize, min_resources: usize) -> MlResult<Vec<ParamSet>> {
        match &self.pool {
            CandidatePool::Grid(grid) => grid.candidates(),
            CandidatePool::Sampled { distributions, n_candidates } => {
                let n = match n_candidates {
                    NCandidates::Fixed(0) => {
                        return Err(MlError::invalid_param("n_candidates", "must be at least 1"))
                    }
                    NCandidates::Fixed(n) => *n,
                    NCandidates::Exhaust => (n_samples / min_resources).max(1),
                };
                distributions.sample_n(n, &mut self.rng())
            }
        }
    }

    /// Run the search and also report the size of every round.
    pub fn fit_with_rounds(
        &self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
    ) -> MlResult<(SearchResult, Vec<HalvingRound>)> {
        if !(self.factor.is_finite() && self.factor > 1.0) {
            return Err(MlError::invalid_param(
                "factor",
                format!("must be greater than 1, got {}", self.factor),
            ));
        }
        let n_samples = y.numel();
        let class_counts: Vec<usize> = class_indices(y).iter().map(|(_, m)| m.len()).collect();
        let min_resources = self.resolve_min_resources(n_samples, &class_counts)?;
        let mut survivors = self.initial_candidates(n_samples, min_resources)?;
        info!(
            "successive halving: {} candidates, factor {}, resources {}..{}",
            survivors.len(),
            self.factor,
            min_resources,
            n_samples
        );

        let mut all_results = Vec::new();
        let mut rounds = Vec::new();
        let mut n_fits = 0;
        let mut round = 0usize;
        let best = loop {
            let n_resources = budget(min_resources, self.factor, round, n_samples);
            let (x_r, y_r) = if n_resources >= n_samples {
                (x.clone(), y.clone())
            } else {
                let seed = self.seed.map(|s| s.wrapping_add(round as u64));
                let (idx, _) = stratified_sample_indices(y, n_resources, seed)?;
                (x.select_rows(&idx)?, y.select_rows(&idx)?)
            };
            let folds = self.settings.cv.split(&y_r)?;
            check_folds(&y_r, &folds)?;

            info!("round {}: {} candidates on {} samples", round, survivors.len(), n_resources);
            log_plan(folds.len(), survivors.len());
            let results = evaluate_candidates(
                &self.pipeline,
                &survivors,
                &x_r,
                &y_r,
                &folds,
                self.settings.n_jobs,
                round,
            )?;
            n_fits += survivors.len() * folds.len();
            rounds.push(HalvingRound { round, n_candidates: survivors.len(), n_resources });

            let mut order: Vec<usize> = (0..results.len())
                .filter(|&i| results[i].is_qualified())
                .collect();
            if order.is_empty() {
                return Err(MlError::ExhaustedSearch { n_candidates: results.len() });
            }
            // Best mean first; stable sort keeps enumeration order on ties.
            order.sort_by(|&a, &b| {
                let (ma, mb) = (results[a].mean_score, results[b].mean_score);
                mb.unwrap_or(f64::NEG_INFINITY).total_cmp(&ma.unwrap_or(f64::NEG_INFINITY))
            });

            let offset = all_results.len();
            let keep = survivors_after(survivors.len(), self.factor).min(order.len());
            if n_resources >= n_samples || keep == 1 {
                all_results.extend(results);
                break offset + order[0];
            }
            survivors = order[..keep].iter().map(|&i| results[i].params.clone()).collect();
            all_results.extend(results);
            round += 1;
        };

        assign_ranks(&mut all_results);
        let result = finish_search(&self.pipeline, &self.settings, x, y, all_results, best, n_fits)?;
        Ok((result, rounds))
    }
}

impl Search for HalvingSearchCv {
    fn template(&self) -> &Pipeline {
        &self.pipeline
    }

    fn fit(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<SearchResult> {
        self.fit_with_rounds(x, y).map(|(result, _)| result)
    }
}

/// Candidates kept after a round of `n`.
pub fn survivors_after(n: usize, factor: f64) -> usize {
    ((n as f64 / factor).floor() as usize).max(1)
}

/// First-round budget that keeps every stratified fold non-degenerate.
///
/// A class of `c` out of `n` samples receives at least `floor(b * c / n)`
/// rows of a proportional draw of `b`, so `b >= ceil(k * n / c)` gives it
/// `k` rows. Capped at `n_samples`.
fn smallest_resources(n_splits: usize, class_counts: &[usize], n_samples: usize) -> usize {
    let balanced = 2 * n_splits * class_counts.len();
    let rarest = class_counts.iter().copied().min().unwrap_or(0);
    let proportional = if rarest == 0 {
        n_samples
    } else {
        (n_splits * n_samples + rarest - 1) / rarest
    };
    balanced.max(proportional).min(n_samples)
}

/// Upper bound on the rounds a pool of `pool` candidates can take.
pub fn max_rounds(pool: usize, factor: f64) -> usize {
    if pool <= 1 {
        return 1;
    }
    ((pool as f64).ln() / factor.ln()).ceil().max(1.0) as usize
}

fn budget(min_resources: usize, factor: f64, round: usize, n_samples: usize) -> usize {
    let r = (min_resources as f64 * factor.powi(round as i32)).floor();
    if r >= n_samples as f64 {
        n_samples
    } else {
        r as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::ParamDistribution;
    use crate::params::float_values;
    use crate::testing::{id_data, stub_pipeline};
    use oxidize_select_datasets::make_classification;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn threshold_grid(n: usize) -> ParamGrid {
        // Larger thresholds predict more zeros and score better on `id_data`.
        let values: Vec<f64> = (0..n).map(|i| i as f64 * 10.0 - 5.0).collect();
        ParamGrid::new().with_subspace([("stub__threshold", float_values(&values))])
    }

    #[test]
    fn test_rounds_shrink_candidates_and_grow_budget() {
        let fits = Arc::new(AtomicUsize::new(0));
        let (x, y) = id_data(240);
        let search = HalvingSearchCv::from_grid(stub_pipeline(&fits), threshold_grid(27))
            .with_factor(3.0)
            .with_cv(2)
            .with_seed(1)
            .with_refit(false);
        let (result, rounds) = search.fit_with_rounds(&x, &y).unwrap();

        let counts: Vec<usize> = rounds.iter().map(|r| r.n_candidates).collect();
        let budgets: Vec<usize> = rounds.iter().map(|r| r.n_resources).collect();
        assert_eq!(counts, vec![27, 9, 3]);
        assert_eq!(budgets, vec![8, 24, 72]);
        assert_eq!(result.n_fits, (27 + 9 + 3) * 2);
        assert_eq!(fits.load(Ordering::SeqCst), result.n_fits);
        assert_eq!(result.cv_results.len(), 27 + 9 + 3);
        assert_eq!(result.best().round, 2);
    }

    #[test]
    fn test_stops_at_full_budget() {
        let fits = Arc::new(AtomicUsize::new(0));
        let (x, y) = id_data(60);
        let search = HalvingSearchCv::from_grid(stub_pipeline(&fits), threshold_grid(20))
            .with_factor(2.0)
            .with_cv(2)
            .with_min_resources(MinResources::Fixed(30));
        let (result, rounds) = search.fit_with_rounds(&x, &y).unwrap();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[1].n_resources, 60);
        assert_eq!(rounds[1].n_candidates, 10);
        assert_eq!(result.best().n_resources, 60);
    }

    #[test]
    fn test_exhaust_min_resources_reaches_full_set() {
        let fits = Arc::new(AtomicUsize::new(0));
        let (x, y) = id_data(240);
        let search = HalvingSearchCv::from_grid(stub_pipeline(&fits), threshold_grid(9))
            .with_factor(3.0)
            .with_cv(2)
            .with_min_resources(MinResources::Exhaust);
        let (_, rounds) = search.fit_with_rounds(&x, &y).unwrap();
        assert_eq!(rounds[0].n_resources, 80);
        assert_eq!(rounds.last().unwrap().n_resources, 240);
    }

    #[test]
    fn test_exhaust_candidates() {
        let fits = Arc::new(AtomicUsize::new(0));
        let (x, y) = id_data(200);
        let distributions = ParamDistributions::new().with_subspace([(
            "stub__threshold",
            ParamDistribution::Uniform { low: -10.0, high: 300.0 },
        )]);
        let search = HalvingSearchCv::from_distributions(
            stub_pipeline(&fits),
            distributions.clone(),
            NCandidates::Exhaust,
        )
        .with_cv(2)
        .with_min_resources(MinResources::Fixed(20))
        .with_seed(1);
        let (_, rounds) = search.fit_with_rounds(&x, &y).unwrap();
        assert_eq!(rounds[0].n_candidates, 10);

        let both_exhaust = HalvingSearchCv::from_distributions(
            stub_pipeline(&fits),
            distributions,
            NCandidates::Exhaust,
        )
        .with_min_resources(MinResources::Exhaust);
        assert!(both_exhaust.fit(&x, &y).is_err());
    }

    #[test]
    fn test_seeded_search_is_reproducible() {
        let fits = Arc::new(AtomicUsize::new(0));
        let (x, y) = id_data(150);
        let distributions = ParamDistributions::new().with_subspace([(
            "stub__threshold",
            ParamDistribution::Uniform { low: -10.0, high: 200.0 },
        )]);
        let search = HalvingSearchCv::from_distributions(
            stub_pipeline(&fits),
            distributions,
            NCandidates::Fixed(12),
        )
        .with_factor(1.5)
        .with_cv(3)
        .with_seed(1);
        let a = search.fit(&x, &y).unwrap();
        let b = search.fit(&x, &y).unwrap();
        assert_eq!(a.best_params, b.best_params);
        assert_eq!(a.cv_results, b.cv_results);
    }

    #[test]
    fn test_invalid_settings() {
        let fits = Arc::new(AtomicUsize::new(0));
        let (x, y) = id_data(60);
        let base = HalvingSearchCv::from_grid(stub_pipeline(&fits), threshold_grid(4)).with_cv(2);
        assert!(base.clone().with_factor(1.0).fit(&x, &y).is_err());
        assert!(base.clone().with_factor(f64::NAN).fit(&x, &y).is_err());
        assert!(base.clone().with_min_resources(MinResources::Fixed(61)).fit(&x, &y).is_err());
        assert!(base.with_min_resources(MinResources::Fixed(0)).fit(&x, &y).is_err());
    }

    #[test]
    fn test_default_budget_covers_rare_class() {
        let fits = Arc::new(AtomicUsize::new(0));
        let (x, y) = make_classification(500, 3, 0.1, 2.0, Some(4)).unwrap();
        let distributions = ParamDistributions::new().with_subspace([(
            "stub__threshold",
            ParamDistribution::Uniform { low: -1.0, high: 3.0 },
        )]);
        let search = HalvingSearchCv::from_distributions(
            stub_pipeline(&fits),
            distributions,
            NCandidates::Fixed(8),
        )
        .with_cv(5)
        .with_seed(1);
        let (result, rounds) = search.fit_with_rounds(&x, &y).unwrap();

        // 50 positives out of 500: a draw of 50 holds 5 of them.
        assert_eq!(rounds[0].n_resources, 50);
        let last = rounds.len() - 1;
        assert_eq!(result.best().rank, Some(1));
        assert!(result
            .cv_results
            .iter()
            .filter(|r| r.rank == Some(1))
            .all(|r| r.round == last));
    }

    #[test]
    fn test_smallest_resources() {
        assert_eq!(smallest_resources(2, &[160, 80], 240), 8);
        assert_eq!(smallest_resources(5, &[450, 50], 500), 50);
        assert_eq!(smallest_resources(10, &[285, 170], 455), 40);
        assert_eq!(smallest_resources(5, &[497, 3], 500), 500);
    }

    #[test]
    fn test_survivors_after() {
        assert_eq!(survivors_after(10, 3.0), 3);
        assert_eq!(survivors_after(2, 3.0), 1);
        assert_eq!(survivors_after(5, 2.5), 2);
        assert_eq!(max_rounds(1, 2.0), 1);
        assert_eq!(max_rounds(27, 3.0), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_halving_round_bound(pool in 1usize..40, factor in 1.2f64..4.0) {
            let fits = Arc::new(AtomicUsize::new(0));
            let (x, y) = id_data(240);
            let search = HalvingSearchCv::from_grid(stub_pipeline(&fits), threshold_grid(pool))
                .with_factor(factor)
                .with_cv(2)
                .with_seed(3)
                .with_refit(false);
            let (result, rounds) = search.fit_with_rounds(&x, &y).unwrap();

            prop_assert!(rounds.len() <= max_rounds(pool, factor));
            for pair in rounds.windows(2) {
                prop_assert!(pair[1].n_candidates < pair[0].n_candidates);
                prop_assert!(pair[1].n_resources >= pair[0].n_resources);
            }
            prop_assert!(result.best_score >= 0.0);
        }
    }
}
