pub mod cross_val;
pub mod distributions;
pub mod folds;
pub mod grid;
pub mod halving;
pub mod nested;
pub mod parallel;
pub mod params;
pub mod randomized;
pub mod search;

#[cfg(test)]
mod testing;

pub use cross_val::{check_folds, cross_val_score, fit_and_score};
pub use distributions::{ParamDistribution, ParamDistributions};
pub use folds::{Fold, KFold, Splitter, StratifiedKFold};
pub use grid::GridSearchCv;
pub use halving::{CandidatePool, HalvingRound, HalvingSearchCv, MinResources, NCandidates};
pub use nested::{nested_cross_val_score, NestedCvResult};
pub use parallel::NJobs;
pub use params::ParamGrid;
pub use randomized::RandomizedSearchCv;
pub use search::{CandidateResult, Search, SearchResult};
