use log::debug;
use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{ParamSet, Tensor};
use oxidize_select_pipeline::Pipeline;
use oxidize_select_preprocessing::class_indices;

use crate::folds::{Fold, Splitter};
use crate::parallel::{run_units, NJobs};

/// Fit a fresh copy of `template` configured with `params` on the fold's
/// training rows and return its accuracy on the fold's test rows.
pub fn fit_and_score(
    template: &Pipeline,
    params: &ParamSet,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    fold: &Fold,
) -> MlResult<f64> {
    let mut model = template.with_params(params)?;
    model.fit(&x.select_rows(&fold.train)?, &y.select_rows(&fold.train)?)?;
    model.score(&x.select_rows(&fold.test)?, &y.select_rows(&fold.test)?)
}

/// Every class of `y` must occur in both parts of every fold.
pub fn check_folds(y: &Tensor<f64>, folds: &[Fold]) -> MlResult<()> {
    let classes: Vec<f64> = class_indices(y).into_iter().map(|(c, _)| c).collect();
    for (k, fold) in folds.iter().enumerate() {
        for (part, idx) in [("training", &fold.train), ("test", &fold.test)] {
            let labels = y.select_rows(idx)?;
            if let Some(missing) = classes.iter().find(|&c| !labels.data().contains(c)) {
                return Err(MlError::DegenerateFold(format!(
                    "fold {} {} part has no samples of class {}",
                    k, part, missing
                )));
            }
        }
    }
    Ok(())
}

/// Accuracy of `pipeline` on each fold of `cv`, in fold order.
///
/// The pipeline is cloned per fold and never fitted itself. Any failing fold
/// fails the whole call.
pub fn cross_val_score(
    pipeline: &Pipeline,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    cv: &dyn Splitter,
    n_jobs: NJobs,
) -> MlResult<Vec<f64>> {
    let folds = cv.split(y)?;
    check_folds(y, &folds)?;
    let no_params = ParamSet::new();

    let scores = run_units(folds.len(), n_jobs, |k| {
        let score = fit_and_score(pipeline, &no_params, x, y, &folds[k]);
        debug!("fold {}: {:?}", k, score);
        score
    })?;
    scores.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folds::{KFold, StratifiedKFold};
    use oxidize_select_datasets::make_classification;
    use oxidize_select_pipeline::{make_pipeline, ClassifierKind};

    #[test]
    fn test_manual_loop_matches_cross_val_score() {
        let (x, y) = make_classification(120, 4, 0.4, 1.5, Some(11)).unwrap();
        let pipeline = make_pipeline(ClassifierKind::LogisticRegression);

        for k in [2, 5, 10] {
            let cv = StratifiedKFold::new(k).with_shuffle(Some(1));
            let mut manual = Vec::new();
            for fold in cv.split(&y).unwrap() {
                let mut model = pipeline.clone();
                model
                    .fit(&x.select_rows(&fold.train).unwrap(), &y.select_rows(&fold.train).unwrap())
                    .unwrap();
                manual.push(
                    model
                        .score(&x.select_rows(&fold.test).unwrap(), &y.select_rows(&fold.test).unwrap())
                        .unwrap(),
                );
            }

            let sequential = cross_val_score(&pipeline, &x, &y, &cv, NJobs::Fixed(1)).unwrap();
            let parallel = cross_val_score(&pipeline, &x, &y, &cv, NJobs::Fixed(4)).unwrap();
            assert_eq!(manual, sequential);
            assert_eq!(manual, parallel);
            assert_eq!(sequential.len(), k);
        }
    }

    #[test]
    fn test_scores_are_accuracies() {
        let (x, y) = make_classification(100, 3, 0.5, 4.0, Some(2)).unwrap();
        let scores = cross_val_score(
            &make_pipeline(ClassifierKind::DecisionTree),
            &x,
            &y,
            &StratifiedKFold::new(5),
            NJobs::All,
        )
        .unwrap();
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(scores.iter().sum::<f64>() / 5.0 > 0.8);
    }

    #[test]
    fn test_degenerate_fold_detected() {
        // Unshuffled KFold over sorted labels puts all of class 1 in the last fold.
        let x: Tensor<f64> = Tensor::from_vec2d(&(0..10).map(|i| vec![i as f64]).collect::<Vec<_>>()).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[0., 0., 0., 0., 0., 0., 0., 0., 1., 1.]);
        let result = cross_val_score(
            &make_pipeline(ClassifierKind::LogisticRegression),
            &x,
            &y,
            &KFold::new(5),
            NJobs::Fixed(1),
        );
        assert!(matches!(result, Err(MlError::DegenerateFold(_))));
    }
}
