//! # oxidize-select
//!
//! Reproducible model selection for tabular binary classification.
//!
//! ## Modules
//!
//! - **core**: Tensor, hyperparameter values, the `Estimator`/`Transformer` traits
//! - **preprocessing**: StandardScaler, LabelEncoder, stratified train/test split
//! - **linear**: L2-regularized logistic regression
//! - **tree**: CART decision tree classifier
//! - **svm**: SVC with linear, RBF and polynomial kernels
//! - **metrics**: accuracy, confusion matrix
//! - **io**: CSV from files and HTTP(S) URLs
//! - **datasets**: Breast Cancer Wisconsin loader, make_classification
//! - **pipeline**: scaler + classifier pipelines with `step__param` routing
//! - **model_selection**: k-fold CV, grid, randomized and successive-halving search, nested CV
//! - **workflow**: the end-to-end evaluation sequence behind the `oxidize-select` binary

/// Core tensor and estimator traits.
pub use oxidize_select_core as core;

/// Data preprocessing.
pub use oxidize_select_preprocessing as preprocessing;

/// Linear models.
pub use oxidize_select_linear as linear;

/// Tree-based models.
pub use oxidize_select_tree as tree;

/// Support vector machines.
pub use oxidize_select_svm as svm;

/// Evaluation metrics.
pub use oxidize_select_metrics as metrics;

/// CSV input.
pub use oxidize_select_io as io;

/// Datasets.
pub use oxidize_select_datasets as datasets;

/// Pipelines.
pub use oxidize_select_pipeline as pipeline;

/// Cross-validation and hyperparameter search.
pub use oxidize_select_model_selection as model_selection;

pub mod config;
pub mod error;
pub mod report;
pub mod workflow;

pub use config::WorkflowConfig;
pub use error::{WorkflowError, WorkflowResult};

/// Prelude: commonly used types.
pub mod prelude {
    pub use oxidize_select_core::{Estimator, MlError, MlResult, ParamSet, ParamValue, Tensor, Transformer};
    pub use oxidize_select_datasets::{load_breast_cancer, make_classification, CsvLayout};
    pub use oxidize_select_io::DataSource;
    pub use oxidize_select_model_selection::{
        cross_val_score, nested_cross_val_score, GridSearchCv, HalvingSearchCv, KFold, NJobs,
        ParamDistribution, ParamDistributions, ParamGrid, RandomizedSearchCv, Search,
        StratifiedKFold,
    };
    pub use oxidize_select_pipeline::{make_pipeline, ClassifierKind, Pipeline};
    pub use oxidize_select_preprocessing::stratified_train_test_split;
}
