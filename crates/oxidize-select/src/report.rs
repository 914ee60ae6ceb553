use std::fmt;

use oxidize_select_core::params::format_params;
use oxidize_select_core::ParamSet;
use oxidize_select_model_selection::HalvingRound;
use serde::Serialize;

/// Fold scores with their mean and population standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvSummary {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl CvSummary {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let std = (scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt();
        CvSummary { scores, mean, std }
    }
}

impl fmt::Display for CvSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CV accuracy: {:.3} +/- {:.3}", self.mean, self.std)
    }
}

/// One iteration of the hand-written stratified k-fold loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldReport {
    /// 1-based.
    pub fold: usize,
    /// Training samples per class, class 0 first.
    pub class_counts: Vec<usize>,
    pub accuracy: f64,
}

impl fmt::Display for FoldReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<String> = self.class_counts.iter().map(|c| c.to_string()).collect();
        write!(
            f,
            "Fold: {:02}, Class distr.: [{}], Acc.: {:.3}",
            self.fold,
            counts.join(" "),
            self.accuracy
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldoutReport {
    pub test_accuracy: f64,
    /// Rows are true classes, columns predictions.
    pub confusion: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub name: String,
    pub n_candidates: usize,
    pub n_fits: usize,
    pub best_params: ParamSet,
    pub best_score: f64,
    /// Accuracy of the refitted winner on the held-out test set.
    pub test_accuracy: f64,
    /// Only filled by successive halving.
    pub rounds: Vec<HalvingRound>,
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} candidates, {} fits", self.n_candidates, self.n_fits)?;
        for r in &self.rounds {
            writeln!(
                f,
                "  round {}: {} candidates on {} samples",
                r.round, r.n_candidates, r.n_resources
            )?;
        }
        writeln!(f, "Best CV accuracy: {:.3}", self.best_score)?;
        writeln!(f, "Best params: {}", format_params(&self.best_params))?;
        write!(f, "Test accuracy: {:.3}", self.test_accuracy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedReport {
    pub label: String,
    pub summary: CvSummary,
    pub best_params: Vec<ParamSet>,
}

/// Everything the workflow measured, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowReport {
    pub n_train: usize,
    pub n_test: usize,
    pub holdout: HoldoutReport,
    pub manual_folds: Vec<FoldReport>,
    pub manual_cv: CvSummary,
    pub aggregate_cv: CvSummary,
    pub searches: Vec<SearchReport>,
    pub nested: Vec<NestedReport>,
}

impl WorkflowReport {
    /// `(title, body)` pairs for printing.
    pub fn sections(&self) -> Vec<(String, String)> {
        let mut sections = Vec::new();

        let confusion: Vec<String> = self
            .holdout
            .confusion
            .iter()
            .map(|row| format!("  {:?}", row))
            .collect();
        sections.push((
            "Hold-out evaluation (logistic regression)".to_string(),
            format!(
                "{} training / {} test samples\nTest accuracy: {:.3}\nConfusion matrix:\n{}",
                self.n_train,
                self.n_test,
                self.holdout.test_accuracy,
                confusion.join("\n")
            ),
        ));

        let mut manual: Vec<String> = self.manual_folds.iter().map(|f| f.to_string()).collect();
        manual.push(self.manual_cv.to_string());
        sections.push(("Stratified k-fold (manual loop)".to_string(), manual.join("\n")));

        sections.push((
            "Stratified k-fold (cross_val_score)".to_string(),
            format!(
                "CV accuracy scores: {:?}\n{}\nIdentical to manual loop: {}",
                self.aggregate_cv
                    .scores
                    .iter()
                    .map(|s| format!("{:.3}", s))
                    .collect::<Vec<_>>(),
                self.aggregate_cv,
                self.aggregate_cv.scores == self.manual_cv.scores
            ),
        ));

        for search in &self.searches {
            sections.push((search.name.clone(), search.to_string()));
        }

        for nested in &self.nested {
            let winners: Vec<String> = nested.best_params.iter().map(format_params).collect();
            sections.push((
                format!("Nested CV ({})", nested.label),
                format!("{}\nInner winners:\n  {}", nested.summary, winners.join("\n  ")),
            ));
        }
        sections
    }
}
