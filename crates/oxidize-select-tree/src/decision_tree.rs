use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::estimator::check_xy;
use oxidize_select_core::{Estimator, Float, ParamValue, Tensor};

/// A node in the decision tree.
#[derive(Debug, Clone)]
enum TreeNode<T: Float> {
    /// Internal node: rows with `x[feature_idx] <= threshold` go left.
    Split {
        feature_idx: usize,
        threshold: T,
        left: Box<TreeNode<T>>,
        right: Box<TreeNode<T>>,
    },
    Leaf { class: usize },
}

/// Best split found for one node.
struct SplitCandidate<T> {
    feature: usize,
    threshold: T,
    impurity: f64,
}

/// Decision Tree Classifier using CART (Gini impurity).
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier<T: Float> {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    tree: Option<TreeNode<T>>,
    pub n_classes: usize,
    n_features: usize,
}

impl<T: Float> Default for DecisionTreeClassifier<T> {
    fn default() -> Self {
        DecisionTreeClassifier::new(None, 2, 1)
    }
}

impl<T: Float> DecisionTreeClassifier<T> {
    pub fn new(max_depth: Option<usize>, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        DecisionTreeClassifier {
            max_depth,
            min_samples_split,
            min_samples_leaf,
            tree: None,
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> MlResult<()> {
        if self.min_samples_split < 2 {
            return Err(MlError::invalid_param("min_samples_split", "must be at least 2"));
        }
        if self.min_samples_leaf < 1 {
            return Err(MlError::invalid_param("min_samples_leaf", "must be at least 1"));
        }
        let n = x.n_rows()?;
        if y.numel() != n {
            return Err(MlError::ShapeMismatch { expected: vec![n], got: y.shape_vec() });
        }
        if n == 0 {
            return Err(MlError::EmptyTensor);
        }

        let classes: Vec<usize> = y.data().iter().map(|v| v.to_f64().round() as usize).collect();
        self.n_classes = classes.iter().max().map_or(1, |&c| c + 1);
        self.n_features = x.n_cols()?;

        let indices: Vec<usize> = (0..n).collect();
        self.tree = Some(self.build_tree(x, &classes, indices, 0)?);
        Ok(())
    }

    fn class_counts(&self, classes: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[classes[i]] += 1;
        }
        counts
    }

    fn build_tree(
        &self,
        x: &Tensor<T>,
        classes: &[usize],
        indices: Vec<usize>,
        depth: usize,
    ) -> MlResult<TreeNode<T>> {
        let counts = self.class_counts(classes, &indices);
        let majority = majority_class(&counts);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if pure
            || self.max_depth.is_some_and(|d| depth >= d)
            || indices.len() < self.min_samples_split
        {
            return Ok(TreeNode::Leaf { class: majority });
        }

        let Some(best) = self.best_split(x, classes, &indices, &counts)? else {
            return Ok(TreeNode::Leaf { class: majority });
        };

        let mut left = Vec::new();
        let mut right = Vec::new();
        for i in indices {
            if x.get(&[i, best.feature])? <= best.threshold {
                left.push(i);
            } else {
                right.push(i);
            }
        }

        Ok(TreeNode::Split {
            feature_idx: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build_tree(x, classes, left, depth + 1)?),
            right: Box::new(self.build_tree(x, classes, right, depth + 1)?),
        })
    }

    /// Sweep each feature in sorted order, tracking class counts on the left.
    fn best_split(
        &self,
        x: &Tensor<T>,
        classes: &[usize],
        indices: &[usize],
        counts: &[usize],
    ) -> MlResult<Option<SplitCandidate<T>>> {
        let n = indices.len();
        let parent = gini(counts, n);
        let mut best: Option<SplitCandidate<T>> = None;

        for feature in 0..x.n_cols()? {
            let mut column: Vec<(T, usize)> = indices
                .iter()
                .map(|&i| Ok((x.get(&[i, feature])?, classes[i])))
                .collect::<MlResult<_>>()?;
            column.sort_by(|a, b| a.0.to_f64().total_cmp(&b.0.to_f64()));

            let mut left_counts = vec![0usize; self.n_classes];
            for split_at in 1..n {
                left_counts[column[split_at - 1].1] += 1;
                let (lo, hi) = (column[split_at - 1].0, column[split_at].0);
                if !(lo < hi) {
                    continue;
                }
                let n_left = split_at;
                let n_right = n - split_at;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }
                let right_counts: Vec<usize> =
                    counts.iter().zip(&left_counts).map(|(&t, &l)| t - l).collect();
                let impurity = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / n as f64;

                if impurity < parent && best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (lo + hi) / T::TWO,
                        impurity,
                    });
                }
            }
        }
        Ok(best)
    }

    fn traverse(&self, node: &TreeNode<T>, row: &[T]) -> usize {
        match node {
            TreeNode::Leaf { class } => *class,
            TreeNode::Split { feature_idx, threshold, left, right } => {
                if row[*feature_idx] <= *threshold {
                    self.traverse(left, row)
                } else {
                    self.traverse(right, row)
                }
            }
        }
    }

    pub fn predict(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let tree = self.tree.as_ref().ok_or(MlError::NotFitted)?;
        if x.n_cols()? != self.n_features {
            return Err(MlError::ShapeMismatch {
                expected: vec![x.n_rows()?, self.n_features],
                got: x.shape_vec(),
            });
        }
        let predictions: Vec<T> = x
            .rows()?
            .map(|row| T::from_usize(self.traverse(tree, row)))
            .collect();
        Ok(Tensor::from_slice(&predictions))
    }

    /// Depth of the fitted tree; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn walk<T: Float>(node: &TreeNode<T>) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.tree.as_ref().map_or(0, walk)
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

/// Most frequent class; ties go to the smaller class index.
fn majority_class(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .fold((0, 0), |(best, best_count), (cls, &c)| {
            if c > best_count { (cls, c) } else { (best, best_count) }
        })
        .0
}

impl Estimator for DecisionTreeClassifier<f64> {
    fn name(&self) -> &'static str {
        "decisiontreeclassifier"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<()> {
        check_xy(x, y)?;
        DecisionTreeClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        DecisionTreeClassifier::predict(self, x)
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> MlResult<()> {
        match name {
            "max_depth" => {
                self.max_depth = if value.is_none() {
                    None
                } else {
                    Some(value.expect_usize(name)?)
                }
            }
            "min_samples_split" => self.min_samples_split = value.expect_usize(name)?,
            "min_samples_leaf" => self.min_samples_leaf = value.expect_usize(name)?,
            _ => return Err(MlError::UnknownParameter(format!("{}__{}", self.name(), name))),
        }
        Ok(())
    }

    fn boxed_clone(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}
