use std::collections::HashMap;

use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{Float, Tensor};

/// Encode categorical string labels as integer indices.
///
/// The class at position `i` of `classes` encodes to `i`.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
    class_to_idx: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder with a fixed class order, e.g. `["B", "M"]` for benign=0, malignant=1.
    pub fn with_classes(classes: &[&str]) -> Self {
        let mut enc = LabelEncoder::new();
        enc.set_classes(classes.iter().map(|c| c.to_string()).collect());
        enc
    }

    /// Learn classes from the data, in sorted order.
    pub fn fit(&mut self, labels: &[String]) {
        let mut unique: Vec<String> = labels.to_vec();
        unique.sort();
        unique.dedup();
        self.set_classes(unique);
    }

    fn set_classes(&mut self, classes: Vec<String>) {
        self.class_to_idx = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        self.classes = classes;
    }

    /// Encode labels; a label outside `classes` is an error.
    pub fn transform<T: Float>(&self, labels: &[String]) -> MlResult<Tensor<T>> {
        let data = labels
            .iter()
            .map(|l| {
                self.class_to_idx
                    .get(l.trim())
                    .map(|&i| T::from_usize(i))
                    .ok_or_else(|| MlError::InvalidOperation(format!("unknown label '{}'", l)))
            })
            .collect::<MlResult<Vec<T>>>()?;
        Ok(Tensor::from_slice(&data))
    }

    pub fn inverse_transform<T: Float>(&self, encoded: &Tensor<T>) -> MlResult<Vec<String>> {
        encoded
            .data()
            .iter()
            .map(|v| {
                let idx = v.to_f64().round() as usize;
                self.classes
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| MlError::InvalidOperation(format!("no class for code {}", v)))
            })
            .collect()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fixed_mapping() {
        let enc = LabelEncoder::with_classes(&["B", "M"]);
        let y: Tensor<f64> = enc.transform(&labels(&["M", "B", "M"])).unwrap();
        assert_eq!(y.data(), &[1.0, 0.0, 1.0]);
        assert_eq!(enc.inverse_transform(&y).unwrap(), labels(&["M", "B", "M"]));
    }

    #[test]
    fn test_fit_sorts_classes() {
        let mut enc = LabelEncoder::new();
        enc.fit(&labels(&["M", "B", "B"]));
        assert_eq!(enc.classes, labels(&["B", "M"]));
        assert_eq!(enc.n_classes(), 2);
    }

    #[test]
    fn test_unknown_label() {
        let enc = LabelEncoder::with_classes(&["B", "M"]);
        assert!(enc.transform::<f64>(&labels(&["X"])).is_err());
    }
}
