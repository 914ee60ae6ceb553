use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{Float, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Row indices of each class, classes in ascending label order and indices
/// in their original order.
pub fn class_indices<T: Float>(y: &Tensor<T>) -> Vec<(T, Vec<usize>)> {
    let mut order: Vec<usize> = (0..y.numel()).collect();
    let labels = y.data();
    order.sort_by(|&a, &b| labels[a].to_f64().total_cmp(&labels[b].to_f64()));

    let mut groups: Vec<(T, Vec<usize>)> = Vec::new();
    for idx in order {
        match groups.last_mut() {
            Some((label, members)) if *label == labels[idx] => members.push(idx),
            _ => groups.push((labels[idx], vec![idx])),
        }
    }
    groups
}

/// Split `n_select` slots across classes proportionally to `counts`.
///
/// Each class gets the floor of its exact share; leftover slots go to the
/// largest fractional parts, ties to the earlier class.
pub fn proportional_allocation(counts: &[usize], n_select: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_select as f64 / total as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut leftover = n_select.saturating_sub(alloc.iter().sum());

    let mut by_remainder: Vec<usize> = (0..counts.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &c in by_remainder.iter().cycle().take(counts.len() * 2) {
        if leftover == 0 {
            break;
        }
        if alloc[c] < counts[c] {
            alloc[c] += 1;
            leftover -= 1;
        }
    }
    alloc
}

/// Draw `n_select` row indices preserving class proportions.
///
/// Returns `(selected, rest)`; both lists are shuffled.
pub fn stratified_sample_indices<T: Float>(
    y: &Tensor<T>,
    n_select: usize,
    seed: Option<u64>,
) -> MlResult<(Vec<usize>, Vec<usize>)> {
    let n = y.numel();
    if n_select > n {
        return Err(MlError::invalid_param(
            "n_select",
            format!("cannot select {} of {} samples", n_select, n),
        ));
    }
    let groups = class_indices(y);
    let counts: Vec<usize> = groups.iter().map(|(_, m)| m.len()).collect();
    let alloc = proportional_allocation(&counts, n_select);

    let mut rng = seeded_rng(seed);
    let mut selected = Vec::with_capacity(n_select);
    let mut rest = Vec::with_capacity(n - n_select);
    for ((_, members), take) in groups.into_iter().zip(alloc) {
        let mut members = members;
        members.shuffle(&mut rng);
        selected.extend_from_slice(&members[..take]);
        rest.extend_from_slice(&members[take..]);
    }
    selected.shuffle(&mut rng);
    rest.shuffle(&mut rng);
    Ok((selected, rest))
}

/// Split data into training and test sets with the same class proportions.
///
/// The test set holds `ceil(n * test_ratio)` rows. Returns
/// `(x_train, x_test, y_train, y_test)`.
pub fn stratified_train_test_split<T: Float>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    test_ratio: f64,
    seed: Option<u64>,
) -> MlResult<(Tensor<T>, Tensor<T>, Tensor<T>, Tensor<T>)> {
    let n = x.n_rows()?;
    if n != y.numel() {
        return Err(MlError::ShapeMismatch {
            expected: vec![n],
            got: y.shape_vec(),
        });
    }
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(MlError::invalid_param(
            "test_ratio",
            format!("must lie in (0, 1), got {}", test_ratio),
        ));
    }

    let n_test = (n as f64 * test_ratio).ceil() as usize;
    let n_classes = class_indices(y).len();
    if n_test < n_classes || n - n_test < n_classes {
        return Err(MlError::invalid_param(
            "test_ratio",
            format!(
                "{} test and {} train rows cannot hold all {} classes",
                n_test,
                n - n_test,
                n_classes
            ),
        ));
    }

    let (test_idx, train_idx) = stratified_sample_indices(y, n_test, seed)?;
    Ok((
        x.select_rows(&train_idx)?,
        x.select_rows(&test_idx)?,
        y.select_rows(&train_idx)?,
        y.select_rows(&test_idx)?,
    ))
}
