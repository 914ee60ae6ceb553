use std::path::Path;

use oxidize_select_datasets::{CsvLayout, WDBC_URL};
use oxidize_select_model_selection::NJobs;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowResult;

/// Environment variable naming a JSON file with a [`WorkflowConfig`].
pub const CONFIG_ENV: &str = "OXIDIZE_SELECT_CONFIG";

/// Settings of the end-to-end workflow. Missing JSON fields take the defaults,
/// which reproduce the reference run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// File path or http(s) URL of the CSV table.
    pub source: String,
    pub layout: CsvLayout,
    pub test_ratio: f64,
    pub seed: u64,
    /// Folds of the manual and aggregate cross-validation and of the searches.
    pub n_folds: usize,
    pub n_jobs: NJobs,
    /// Values tried for SVC `c` and `gamma` by the grid search.
    pub param_range: Vec<f64>,
    /// Log-uniform bounds for SVC `c` and `gamma` in the sampled searches.
    pub log_uniform_range: (f64, f64),
    pub n_iter: usize,
    pub halving_factor: f64,
    pub inner_folds: usize,
    pub outer_folds: usize,
    /// Tree depths compared under nested CV; `None` grows full trees.
    pub tree_depths: Vec<Option<usize>>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            source: WDBC_URL.to_string(),
            layout: CsvLayout::default(),
            test_ratio: 0.20,
            seed: 1,
            n_folds: 10,
            n_jobs: NJobs::All,
            param_range: vec![0.0001, 0.001, 0.01, 0.1, 1.0, 10.0, 100.0, 1000.0],
            log_uniform_range: (0.0001, 1000.0),
            n_iter: 20,
            halving_factor: 1.5,
            inner_folds: 2,
            outer_folds: 5,
            tree_depths: (1..=7).map(Some).chain(std::iter::once(None)).collect(),
        }
    }
}

impl WorkflowConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> WorkflowResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Config from the file named by `OXIDIZE_SELECT_CONFIG`, or the defaults.
    pub fn from_env() -> WorkflowResult<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_json_file(path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}
