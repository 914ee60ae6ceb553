//! The end-to-end evaluation sequence: hold-out split, manual and aggregate
//! stratified k-fold, grid, randomized and successive-halving search over an
//! SVC pipeline, and nested CV comparing the SVC with a decision tree.

use log::{info, warn};
use oxidize_select_core::error::MlError;
use oxidize_select_core::{ParamValue, Tensor};
use oxidize_select_datasets::load_breast_cancer;
use oxidize_select_io::DataSource;
use oxidize_select_metrics::confusion_matrix;
use oxidize_select_model_selection::params::float_values;
use oxidize_select_model_selection::{
    cross_val_score, nested_cross_val_score, GridSearchCv, HalvingSearchCv, NCandidates,
    ParamDistribution, ParamDistributions, ParamGrid, RandomizedSearchCv, Search, SearchResult,
    Splitter, StratifiedKFold,
};
use oxidize_select_pipeline::{make_pipeline, ClassifierKind};
use oxidize_select_preprocessing::{class_indices, stratified_train_test_split};

use crate::config::WorkflowConfig;
use crate::error::WorkflowResult;
use crate::report::{CvSummary, FoldReport, HoldoutReport, NestedReport, SearchReport, WorkflowReport};

/// Load the configured table and run every step on it.
pub fn run(config: &WorkflowConfig) -> WorkflowResult<WorkflowReport> {
    let source = DataSource::parse(&config.source);
    let (x, y) = load_breast_cancer(&source, &config.layout)?;
    run_on(config, &x, &y)
}

/// Run every step on an already loaded dataset.
pub fn run_on(config: &WorkflowConfig, x: &Tensor<f64>, y: &Tensor<f64>) -> WorkflowResult<WorkflowReport> {
    let (x_train, x_test, y_train, y_test) =
        stratified_train_test_split(x, y, config.test_ratio, Some(config.seed))?;
    info!("split into {} training and {} test samples", y_train.numel(), y_test.numel());

    let holdout = holdout(&x_train, &y_train, &x_test, &y_test)?;

    let manual_folds = manual_stratified_cv(config, &x_train, &y_train)?;
    let manual_cv = CvSummary::from_scores(manual_folds.iter().map(|f| f.accuracy).collect());
    let aggregate_cv = CvSummary::from_scores(cross_val_score(
        &make_pipeline(ClassifierKind::LogisticRegression),
        &x_train,
        &y_train,
        &StratifiedKFold::new(config.n_folds),
        config.n_jobs,
    )?);
    if aggregate_cv.scores != manual_cv.scores {
        warn!("cross_val_score differs from the manual fold loop");
    }

    let grid = svc_grid_search(config);
    info!("grid search plans {} fits", grid.n_planned_fits());
    let searches = vec![
        search_report("Grid search (SVC)", &grid, None, &x_train, &y_train, &x_test, &y_test)?,
        search_report(
            "Randomized search (SVC)",
            &svc_randomized_search(config),
            None,
            &x_train,
            &y_train,
            &x_test,
            &y_test,
        )?,
        halving_report(config, &x_train, &y_train, &x_test, &y_test)?,
    ];

    let outer = StratifiedKFold::new(config.outer_folds);
    let nested = vec![
        nested_report("SVC", &svc_grid_search(config).with_cv(config.inner_folds), &outer, &x_train, &y_train)?,
        nested_report("decision tree", &tree_grid_search(config), &outer, &x_train, &y_train)?,
    ];

    Ok(WorkflowReport {
        n_train: y_train.numel(),
        n_test: y_test.numel(),
        holdout,
        manual_folds,
        manual_cv,
        aggregate_cv,
        searches,
        nested,
    })
}

/// Fit the logistic-regression pipeline on the training split and score it
/// once on the test split.
pub fn holdout(
    x_train: &Tensor<f64>,
    y_train: &Tensor<f64>,
    x_test: &Tensor<f64>,
    y_test: &Tensor<f64>,
) -> WorkflowResult<HoldoutReport> {
    let mut pipeline = make_pipeline(ClassifierKind::LogisticRegression);
    pipeline.fit(x_train, y_train)?;
    let pred = pipeline.predict(x_test)?;
    Ok(HoldoutReport {
        test_accuracy: oxidize_select_metrics::accuracy(y_test, &pred)?,
        confusion: confusion_matrix(y_test, &pred, 2)?,
    })
}

/// Stratified k-fold written out by hand: a fresh pipeline per fold.
pub fn manual_stratified_cv(
    config: &WorkflowConfig,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
) -> WorkflowResult<Vec<FoldReport>> {
    let template = make_pipeline(ClassifierKind::LogisticRegression);
    let folds = StratifiedKFold::new(config.n_folds).split(y)?;

    let mut reports = Vec::with_capacity(folds.len());
    for (k, fold) in folds.iter().enumerate() {
        let y_train = y.select_rows(&fold.train)?;
        let mut model = template.clone();
        model.fit(&x.select_rows(&fold.train)?, &y_train)?;
        let accuracy = model.score(&x.select_rows(&fold.test)?, &y.select_rows(&fold.test)?)?;
        reports.push(FoldReport {
            fold: k + 1,
            class_counts: class_indices(&y_train).iter().map(|(_, m)| m.len()).collect(),
            accuracy,
        });
    }
    Ok(reports)
}

/// Linear kernel over `c`, RBF kernel over `c` x `gamma`.
pub fn svc_param_grid(range: &[f64]) -> ParamGrid {
    ParamGrid::new()
        .with_subspace([
            ("svc__c", float_values(range)),
            ("svc__kernel", vec![ParamValue::from("linear")]),
        ])
        .with_subspace([
            ("svc__c", float_values(range)),
            ("svc__gamma", float_values(range)),
            ("svc__kernel", vec![ParamValue::from("rbf")]),
        ])
}

/// Log-uniform counterpart of [`svc_param_grid`].
pub fn svc_param_distributions(low: f64, high: f64) -> ParamDistributions {
    ParamDistributions::new()
        .with_subspace([
            ("svc__c", ParamDistribution::log_uniform(low, high)),
            ("svc__kernel", ParamDistribution::choice(["linear"])),
        ])
        .with_subspace([
            ("svc__c", ParamDistribution::log_uniform(low, high)),
            ("svc__gamma", ParamDistribution::log_uniform(low, high)),
            ("svc__kernel", ParamDistribution::choice(["rbf"])),
        ])
}

pub fn svc_grid_search(config: &WorkflowConfig) -> GridSearchCv {
    GridSearchCv::new(make_pipeline(ClassifierKind::Svc), svc_param_grid(&config.param_range))
        .with_cv(config.n_folds)
        .with_n_jobs(config.n_jobs)
}

pub fn svc_randomized_search(config: &WorkflowConfig) -> RandomizedSearchCv {
    let (low, high) = config.log_uniform_range;
    RandomizedSearchCv::new(
        make_pipeline(ClassifierKind::Svc),
        svc_param_distributions(low, high),
        config.n_iter,
    )
    .with_seed(config.seed)
    .with_cv(config.n_folds)
    .with_n_jobs(config.n_jobs)
}

pub fn svc_halving_search(config: &WorkflowConfig) -> HalvingSearchCv {
    let (low, high) = config.log_uniform_range;
    HalvingSearchCv::from_distributions(
        make_pipeline(ClassifierKind::Svc),
        svc_param_distributions(low, high),
        NCandidates::Exhaust,
    )
    .with_factor(config.halving_factor)
    .with_seed(config.seed)
    .with_cv(config.n_folds)
    .with_n_jobs(config.n_jobs)
}

pub fn tree_grid_search(config: &WorkflowConfig) -> GridSearchCv {
    let depths: Vec<ParamValue> = config
        .tree_depths
        .iter()
        .map(|d| d.map_or(ParamValue::None, |d| ParamValue::Int(d as i64)))
        .collect();
    GridSearchCv::new(
        make_pipeline(ClassifierKind::DecisionTree),
        ParamGrid::new().with_subspace([("decisiontreeclassifier__max_depth", depths)]),
    )
    .with_cv(config.inner_folds)
    .with_n_jobs(config.n_jobs)
}

fn search_report<S: Search>(
    name: &str,
    search: &S,
    result: Option<SearchResult>,
    x_train: &Tensor<f64>,
    y_train: &Tensor<f64>,
    x_test: &Tensor<f64>,
    y_test: &Tensor<f64>,
) -> WorkflowResult<SearchReport> {
    let result = match result {
        Some(r) => r,
        None => search.fit(x_train, y_train)?,
    };
    let model = result
        .best_estimator
        .as_ref()
        .ok_or_else(|| MlError::InvalidOperation(format!("{} did not refit its winner", name)))?;
    let test_accuracy = model.score(x_test, y_test)?;
    info!("{}: test accuracy {:.3}", name, test_accuracy);

    Ok(SearchReport {
        name: name.to_string(),
        n_candidates: result.cv_results.iter().filter(|r| r.round == 0).count(),
        n_fits: result.n_fits,
        best_params: result.best_params.clone(),
        best_score: result.best_score,
        test_accuracy,
        rounds: Vec::new(),
    })
}

fn halving_report(
    config: &WorkflowConfig,
    x_train: &Tensor<f64>,
    y_train: &Tensor<f64>,
    x_test: &Tensor<f64>,
    y_test: &Tensor<f64>,
) -> WorkflowResult<SearchReport> {
    let search = svc_halving_search(config);
    let (result, rounds) = search.fit_with_rounds(x_train, y_train)?;
    let mut report = search_report(
        "Successive-halving search (SVC)",
        &search,
        Some(result),
        x_train,
        y_train,
        x_test,
        y_test,
    )?;
    report.rounds = rounds;
    Ok(report)
}

fn nested_report<S: Search>(
    label: &str,
    search: &S,
    outer: &dyn Splitter,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
) -> WorkflowResult<NestedReport> {
    let result = nested_cross_val_score(search, x, y, outer)?;
    Ok(NestedReport {
        label: label.to_string(),
        summary: CvSummary::from_scores(result.outer_scores),
        best_params: result.best_params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxidize_select_datasets::make_classification;
    use oxidize_select_model_selection::NJobs;

    fn small_config() -> WorkflowConfig {
        WorkflowConfig {
            n_folds: 3,
            n_jobs: NJobs::Fixed(2),
            param_range: vec![0.1, 1.0, 10.0],
            log_uniform_range: (0.01, 10.0),
            n_iter: 4,
            outer_folds: 3,
            tree_depths: vec![Some(1), Some(2), None],
            ..WorkflowConfig::default()
        }
    }

    #[test]
    fn test_run_on_synthetic_data() {
        let (x, y) = make_classification(150, 4, 0.37, 2.5, Some(1)).unwrap();
        let config = small_config();
        let report = run_on(&config, &x, &y).unwrap();

        assert_eq!(report.n_test, 30);
        assert_eq!(report.n_train, 120);
        assert_eq!(report.manual_folds.len(), 3);
        assert_eq!(report.manual_cv.scores, report.aggregate_cv.scores);

        let grid = &report.searches[0];
        assert_eq!(grid.n_candidates, 3 + 9);
        assert_eq!(grid.n_fits, (3 + 9) * 3);
        assert_eq!(report.searches[1].n_candidates, 4);
        assert!(!report.searches[2].rounds.is_empty());
        assert_eq!(report.nested.len(), 2);
        assert!(report.nested.iter().all(|n| n.summary.scores.len() == 3));
        assert!(report.holdout.test_accuracy > 0.7);

        let sections = report.sections();
        assert_eq!(sections.len(), 3 + 3 + 2);
        assert!(sections[2].1.contains("Identical to manual loop: true"));
    }

    #[test]
    fn test_manual_folds_report_class_counts() {
        let (x, y) = make_classification(90, 3, 1.0 / 3.0, 2.0, Some(2)).unwrap();
        let folds = manual_stratified_cv(&small_config(), &x, &y).unwrap();
        for fold in &folds {
            assert_eq!(fold.class_counts, vec![40, 20]);
        }
    }

    #[test]
    fn test_svc_grid_shape() {
        let grid = svc_param_grid(&[0.0001, 0.001, 0.01, 0.1, 1.0, 10.0, 100.0, 1000.0]);
        assert_eq!(grid.len(), 8 + 64);
        let search = svc_grid_search(&WorkflowConfig::default());
        assert_eq!(search.n_planned_fits(), 720);
    }
}
