use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::Tensor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Generate a shuffled two-class Gaussian problem.
///
/// `round(n_samples * positive_ratio)` rows get label 1. Each class is an
/// isotropic unit-variance blob; the class-1 centre sits `separation` away
/// from the origin along every feature.
pub fn make_classification(
    n_samples: usize,
    n_features: usize,
    positive_ratio: f64,
    separation: f64,
    seed: Option<u64>,
) -> MlResult<(Tensor<f64>, Tensor<f64>)> {
    if !(0.0..=1.0).contains(&positive_ratio) {
        return Err(MlError::invalid_param(
            "positive_ratio",
            format!("must be in [0, 1], got {}", positive_ratio),
        ));
    }
    if n_features == 0 {
        return Err(MlError::invalid_param("n_features", "must be at least 1"));
    }
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let n_pos = (n_samples as f64 * positive_ratio).round() as usize;
    let mut labels: Vec<f64> = (0..n_samples).map(|i| if i < n_pos { 1.0 } else { 0.0 }).collect();
    labels.shuffle(&mut rng);

    let mut features = Vec::with_capacity(n_samples * n_features);
    for &label in &labels {
        let centre = label * separation;
        for _ in 0..n_features {
            // Box-Muller
            let u1: f64 = rng.gen::<f64>().max(1e-10);
            let u2: f64 = rng.gen::<f64>();
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            features.push(centre + z);
        }
    }

    Ok((
        Tensor::new(features, vec![n_samples, n_features])?,
        Tensor::from_slice(&labels),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_classification_counts() {
        let (x, y) = make_classification(400, 5, 0.6, 2.0, Some(7)).unwrap();
        assert_eq!(x.shape_vec(), vec![400, 5]);
        assert_eq!(y.data().iter().filter(|&&v| v == 1.0).count(), 240);
        // Shuffled, not sorted by class.
        assert!(y.data()[..240].iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_make_classification_reproducible() {
        let a = make_classification(50, 3, 0.4, 1.0, Some(3)).unwrap();
        let b = make_classification(50, 3, 0.4, 1.0, Some(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_ratio() {
        assert!(make_classification(10, 2, 1.5, 1.0, Some(0)).is_err());
    }
}
