use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{Float, Tensor};

fn check_lengths<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> MlResult<()> {
    if y_true.numel() != y_pred.numel() {
        return Err(MlError::ShapeMismatch {
            expected: y_true.shape_vec(),
            got: y_pred.shape_vec(),
        });
    }
    if y_true.numel() == 0 {
        return Err(MlError::EmptyTensor);
    }
    Ok(())
}

/// Fraction of predictions equal to the true label.
pub fn accuracy<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> MlResult<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .data()
        .iter()
        .zip(y_pred.data())
        .filter(|(&a, &b)| (a - b).abs() < T::HALF)
        .count();
    Ok(correct as f64 / y_true.numel() as f64)
}

/// Confusion matrix indexed `[true][predicted]`.
pub fn confusion_matrix<T: Float>(
    y_true: &Tensor<T>,
    y_pred: &Tensor<T>,
    n_classes: usize,
) -> MlResult<Vec<Vec<usize>>> {
    check_lengths(y_true, y_pred)?;
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.data().iter().zip(y_pred.data()) {
        let ti = t.to_f64().round() as usize;
        let pi = p.to_f64().round() as usize;
        if ti < n_classes && pi < n_classes {
            matrix[ti][pi] += 1;
        }
    }
    Ok(matrix)
}
