use oxidize_select_core::error::MlResult;
use oxidize_select_core::params::split_param_name;
use oxidize_select_core::{Estimator, MlError, ParamSet, Tensor, Transformer};
use oxidize_select_linear::LogisticRegression;
use oxidize_select_metrics::accuracy;
use oxidize_select_preprocessing::StandardScaler;
use oxidize_select_svm::{Kernel, SVC};
use oxidize_select_tree::DecisionTreeClassifier;
use serde::{Deserialize, Serialize};

/// A machine learning pipeline: chain transformers + final estimator.
///
/// Transformers are fitted on exactly the rows passed to [`Pipeline::fit`]
/// and only applied (never refitted) by `predict` and `score`, so scaling
/// statistics cannot absorb held-out data.
#[derive(Clone)]
pub struct Pipeline {
    transformers: Vec<Box<dyn Transformer>>,
    estimator: Option<Box<dyn Estimator>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            transformers: Vec::new(),
            estimator: None,
        }
    }

    /// Add a transformer step.
    pub fn add_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Set the final estimator.
    pub fn set_estimator(mut self, estimator: Box<dyn Estimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Standardization followed by `estimator`.
    pub fn standardized(estimator: Box<dyn Estimator>) -> Self {
        Pipeline::new()
            .add_transformer(Box::new(StandardScaler::<f64>::new()))
            .set_estimator(estimator)
    }

    /// Step names in order, e.g. `["scaler", "svc"]`.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.transformers
            .iter()
            .map(|t| t.name())
            .chain(self.estimator.iter().map(|e| e.name()))
            .collect()
    }

    /// Fit all transformers and the estimator.
    pub fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<()> {
        let estimator = self
            .estimator
            .as_mut()
            .ok_or_else(|| MlError::InvalidOperation("No estimator set".into()))?;

        let mut current_x = x.clone();
        for t in &mut self.transformers {
            current_x = t.fit_transform(&current_x)?;
        }
        estimator.fit(&current_x, y)
    }

    /// Transform through all transformers and predict with the estimator.
    pub fn predict(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let estimator = self
            .estimator
            .as_ref()
            .ok_or_else(|| MlError::InvalidOperation("No estimator set".into()))?;

        let mut current_x = x.clone();
        for t in &self.transformers {
            current_x = t.transform(&current_x)?;
        }
        estimator.predict(&current_x)
    }

    /// Accuracy of `predict(x)` against `y`.
    pub fn score(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<f64> {
        let pred = self.predict(x)?;
        accuracy(y, &pred)
    }

    /// Route each `step__param` entry to the step with that name.
    pub fn set_params(&mut self, params: &ParamSet) -> MlResult<()> {
        for (full_name, value) in params {
            let (step, param) = split_param_name(full_name)?;
            if let Some(t) = self.transformers.iter_mut().find(|t| t.name() == step) {
                t.set_param(param, value)?;
                continue;
            }
            match self.estimator.as_mut() {
                Some(e) if e.name() == step => e.set_param(param, value)?,
                _ => return Err(MlError::UnknownParameter(full_name.clone())),
            }
        }
        Ok(())
    }

    /// Unfitted copy of this pipeline configured with `params`.
    pub fn with_params(&self, params: &ParamSet) -> MlResult<Pipeline> {
        let mut p = self.clone();
        p.set_params(params)?;
        Ok(p)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("steps", &self.step_names()).finish()
    }
}

/// Classifier families the workflow compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    LogisticRegression,
    Svc,
    DecisionTree,
}

/// Standardized pipeline around a default-configured classifier of `kind`.
pub fn make_pipeline(kind: ClassifierKind) -> Pipeline {
    let estimator: Box<dyn Estimator> = match kind {
        ClassifierKind::LogisticRegression => Box::new(LogisticRegression::<f64>::default()),
        ClassifierKind::Svc => Box::new(SVC::<f64>::new(1.0, Kernel::Rbf, 200)),
        ClassifierKind::DecisionTree => Box::new(DecisionTreeClassifier::<f64>::default()),
    };
    Pipeline::standardized(estimator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxidize_select_core::ParamValue;
    use std::sync::{Arc, Mutex};

    /// Passes data through unchanged and records the row count of every fit.
    #[derive(Clone)]
    struct RecordingTransformer {
        fitted_rows: Arc<Mutex<Vec<usize>>>,
    }

    impl Transformer for RecordingTransformer {
        fn name(&self) -> &'static str {
            "recorder"
        }
        fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()> {
            self.fitted_rows.lock().unwrap().push(x.n_rows()?);
            Ok(())
        }
        fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
            Ok(x.clone())
        }
        fn boxed_clone(&self) -> Box<dyn Transformer> {
            Box::new(self.clone())
        }
    }

    fn data() -> (Tensor<f64>, Tensor<f64>) {
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![0.0, 10.0], vec![0.5, 11.0], vec![1.0, 10.5], vec![0.2, 9.5],
            vec![5.0, 30.0], vec![5.5, 31.0], vec![6.0, 29.0], vec![5.2, 30.5],
        ]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        (x, y)
    }

    #[test]
    fn test_pipeline_fit_score() {
        let (x, y) = data();
        for kind in [ClassifierKind::LogisticRegression, ClassifierKind::Svc, ClassifierKind::DecisionTree] {
            let mut pipe = make_pipeline(kind);
            pipe.fit(&x, &y).unwrap();
            assert_eq!(pipe.score(&x, &y).unwrap(), 1.0, "{:?}", kind);
        }
    }

    #[test]
    fn test_transformers_fit_only_on_fit_data() {
        let (x, y) = data();
        let fitted_rows = Arc::new(Mutex::new(Vec::new()));
        let mut pipe = Pipeline::new()
            .add_transformer(Box::new(RecordingTransformer { fitted_rows: fitted_rows.clone() }))
            .set_estimator(Box::new(LogisticRegression::<f64>::default()));

        let train = x.select_rows(&[0, 1, 4, 5, 6]).unwrap();
        let y_train = y.select_rows(&[0, 1, 4, 5, 6]).unwrap();
        pipe.fit(&train, &y_train).unwrap();
        pipe.score(&x, &y).unwrap();
        pipe.predict(&x).unwrap();

        assert_eq!(*fitted_rows.lock().unwrap(), vec![5]);
    }

    #[test]
    fn test_set_params_routes_by_step() {
        let mut pipe = make_pipeline(ClassifierKind::Svc);
        assert_eq!(pipe.step_names(), vec!["scaler", "svc"]);

        let mut params = ParamSet::new();
        params.insert("svc__c".into(), ParamValue::Float(10.0));
        params.insert("svc__kernel".into(), ParamValue::from("linear"));
        pipe.set_params(&params).unwrap();

        let mut unknown = ParamSet::new();
        unknown.insert("logisticregression__c".into(), ParamValue::Float(1.0));
        assert!(matches!(pipe.set_params(&unknown), Err(MlError::UnknownParameter(_))));

        let mut scaler_param = ParamSet::new();
        scaler_param.insert("scaler__with_mean".into(), ParamValue::Int(0));
        assert!(pipe.set_params(&scaler_param).is_err());
    }

    #[test]
    fn test_with_params_leaves_template_untouched() {
        let template = make_pipeline(ClassifierKind::Svc);
        let mut params = ParamSet::new();
        params.insert("svc__c".into(), ParamValue::Float(-1.0));
        assert!(template.with_params(&params).is_err());

        let (x, y) = data();
        let mut fresh = template.clone();
        fresh.fit(&x, &y).unwrap();
    }

    #[test]
    fn test_missing_estimator() {
        let (x, y) = data();
        let mut pipe = Pipeline::new();
        assert!(pipe.fit(&x, &y).is_err());
        assert!(pipe.predict(&x).is_err());
    }
}
