use log::info;
use oxidize_select_core::Tensor;
use oxidize_select_io::{parse_field, read_records, DataError, DataResult, DataSource};
use oxidize_select_preprocessing::LabelEncoder;
use serde::{Deserialize, Serialize};

/// Public location of the Wisconsin Diagnostic Breast Cancer table.
pub const WDBC_URL: &str =
    "https://archive.ics.uci.edu/ml/machine-learning-databases/breast-cancer-wisconsin/wdbc.data";

/// Column positions of a headerless binary-classification table.
///
/// Defaults to the WDBC layout: column 0 is an ID, column 1 the diagnosis
/// (`B`/`M`), columns 2..32 the 30 real-valued features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvLayout {
    pub label_column: usize,
    pub feature_columns: Vec<usize>,
    /// Label text encoded as 0.
    pub negative_label: String,
    /// Label text encoded as 1.
    pub positive_label: String,
    pub has_headers: bool,
}

impl Default for CsvLayout {
    fn default() -> Self {
        CsvLayout {
            label_column: 1,
            feature_columns: (2..32).collect(),
            negative_label: "B".into(),
            positive_label: "M".into(),
            has_headers: false,
        }
    }
}

/// Load the breast cancer table from a file or URL.
///
/// Returns an `n x p` feature matrix and labels with `B -> 0`, `M -> 1`.
pub fn load_breast_cancer(
    source: &DataSource,
    layout: &CsvLayout,
) -> DataResult<(Tensor<f64>, Tensor<f64>)> {
    let records = read_records(source, layout.has_headers)?;
    let (x, y) = parse_breast_cancer(&records, layout)?;
    let positives = y.data().iter().filter(|&&v| v == 1.0).count();
    info!(
        "loaded {} records with {} features ({} labelled '{}')",
        y.numel(),
        layout.feature_columns.len(),
        positives,
        layout.positive_label
    );
    Ok((x, y))
}

/// Turn raw string records into features and encoded labels.
pub fn parse_breast_cancer(
    records: &[Vec<String>],
    layout: &CsvLayout,
) -> DataResult<(Tensor<f64>, Tensor<f64>)> {
    if layout.feature_columns.is_empty() {
        return Err(DataError::Invalid("layout selects no feature columns".into()));
    }
    let width = layout
        .feature_columns
        .iter()
        .copied()
        .chain(std::iter::once(layout.label_column))
        .max()
        .unwrap_or(0)
        + 1;

    let mut features = Vec::with_capacity(records.len() * layout.feature_columns.len());
    let mut labels = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        if record.len() < width {
            return Err(DataError::Malformed {
                record: i,
                reason: format!("expected at least {} fields, found {}", width, record.len()),
            });
        }
        for &col in &layout.feature_columns {
            features.push(parse_field(&record[col], i, col)?);
        }
        labels.push(record[layout.label_column].clone());
    }

    let encoder = LabelEncoder::with_classes(&[layout.negative_label.as_str(), layout.positive_label.as_str()]);
    let y: Tensor<f64> = encoder.transform(&labels)?;
    for code in [0.0, 1.0] {
        if !y.data().contains(&code) {
            return Err(DataError::Invalid(format!(
                "label '{}' never occurs; two classes are required",
                encoder.classes[code as usize]
            )));
        }
    }

    let x = Tensor::new(features, vec![records.len(), layout.feature_columns.len()])?;
    Ok((x, y))
}
