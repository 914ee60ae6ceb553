use std::fmt::Debug;

use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::Tensor;
use oxidize_select_preprocessing::class_indices;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One round of cross-validation: indices to fit on and indices to score on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partitions sample indices into cross-validation folds.
pub trait Splitter: Send + Sync + Debug {
    fn n_splits(&self) -> usize;
    /// Folds for the labels `y`; only the length matters to unstratified splitters.
    fn split(&self, y: &Tensor<f64>) -> MlResult<Vec<Fold>>;
}

fn check_n_splits(n_splits: usize, n_samples: usize) -> MlResult<()> {
    if n_splits < 2 {
        return Err(MlError::invalid_param(
            "n_splits",
            format!("must be at least 2, got {}", n_splits),
        ));
    }
    if n_samples < n_splits {
        return Err(MlError::invalid_param(
            "n_splits",
            format!("cannot have {} folds with only {} samples", n_splits, n_samples),
        ));
    }
    Ok(())
}

fn shuffle_rng(shuffle: bool, seed: Option<u64>) -> Option<StdRng> {
    shuffle.then(|| match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    })
}

/// Build folds from a fold number per sample. Both parts come out sorted.
fn folds_from_assignment(assignment: &[usize], n_splits: usize) -> Vec<Fold> {
    (0..n_splits)
        .map(|k| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..assignment.len()).partition(|&i| assignment[i] == k);
            Fold { train, test }
        })
        .collect()
}

/// Contiguous folds, optionally over a shuffled order. The first
/// `n % n_splits` folds hold one extra sample.
#[derive(Debug, Clone, PartialEq)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        KFold { n_splits, shuffle: false, seed: None }
    }

    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }
}

impl Splitter for KFold {
    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn split(&self, y: &Tensor<f64>) -> MlResult<Vec<Fold>> {
        let n = y.numel();
        check_n_splits(self.n_splits, n)?;

        let mut order: Vec<usize> = (0..n).collect();
        if let Some(mut rng) = shuffle_rng(self.shuffle, self.seed) {
            order.shuffle(&mut rng);
        }

        let (base, extra) = (n / self.n_splits, n % self.n_splits);
        let mut assignment = vec![0; n];
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = base + usize::from(k < extra);
            for &i in &order[start..start + size] {
                assignment[i] = k;
            }
            start += size;
        }
        Ok(folds_from_assignment(&assignment, self.n_splits))
    }
}

/// Folds that preserve class proportions.
///
/// Samples are ordered by class (within a class by index, or shuffled when
/// `shuffle` is set) and the sample at position `p` of that order is dealt
/// to fold `p % n_splits`. Every fold then holds within one sample of its
/// exact share of each class, and fold sizes differ by at most one.
#[derive(Debug, Clone, PartialEq)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        StratifiedKFold { n_splits, shuffle: false, seed: None }
    }

    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }
}

impl Splitter for StratifiedKFold {
    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn split(&self, y: &Tensor<f64>) -> MlResult<Vec<Fold>> {
        let n = y.numel();
        check_n_splits(self.n_splits, n)?;

        let groups = class_indices(y);
        if let Some((label, members)) = groups.iter().find(|(_, m)| m.len() < self.n_splits) {
            return Err(MlError::DegenerateFold(format!(
                "class {} has {} members, fewer than n_splits={}",
                label,
                members.len(),
                self.n_splits
            )));
        }

        let mut rng = shuffle_rng(self.shuffle, self.seed);
        let mut assignment = vec![0; n];
        let mut position = 0;
        for (_, mut members) in groups {
            if let Some(rng) = rng.as_mut() {
                members.shuffle(rng);
            }
            for i in members {
                assignment[i] = position % self.n_splits;
                position += 1;
            }
        }
        Ok(folds_from_assignment(&assignment, self.n_splits))
    }
}
