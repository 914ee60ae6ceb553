use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Where a CSV table comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Path(PathBuf),
    Url(String),
}

impl DataSource {
    /// `http://` and `https://` locations are URLs, anything else a file path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            DataSource::Url(location.to_string())
        } else {
            DataSource::Path(PathBuf::from(location))
        }
    }
}

impl FromStr for DataSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DataSource::parse(s))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Path(p) => write!(f, "{}", p.display()),
            DataSource::Url(u) => write!(f, "{}", u),
        }
    }
}

/// Read every record of a comma-separated table as raw string fields.
pub fn read_records(source: &DataSource, has_headers: bool) -> DataResult<Vec<Vec<String>>> {
    info!("reading CSV from {}", source);
    match source {
        DataSource::Path(path) => {
            let file = std::fs::File::open(path)?;
            parse_records(file, has_headers)
        }
        DataSource::Url(url) => {
            let body = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
            debug!("fetched {} bytes", body.len());
            parse_records(body.as_ref(), has_headers)
        }
    }
}

/// Parse records from any reader; blank fields are kept, trimming is left to callers.
pub fn parse_records<R: Read>(reader: R, has_headers: bool) -> DataResult<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    if rows.is_empty() {
        return Err(DataError::Invalid("no records found".into()));
    }
    Ok(rows)
}

/// Parse one numeric field, naming the record on failure.
pub fn parse_field(field: &str, record: usize, column: usize) -> DataResult<f64> {
    let value: f64 = field.trim().parse().map_err(|_| DataError::Malformed {
        record,
        reason: format!("column {} is not numeric: '{}'", column, field),
    })?;
    if !value.is_finite() {
        return Err(DataError::Malformed {
            record,
            reason: format!("column {} is not finite: '{}'", column, field),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(
            DataSource::parse("https://example.org/wdbc.data"),
            DataSource::Url("https://example.org/wdbc.data".into())
        );
        assert_eq!(
            "data/wdbc.data".parse::<DataSource>().unwrap(),
            DataSource::Path(PathBuf::from("data/wdbc.data"))
        );
    }

    #[test]
    fn test_parse_records_headerless() {
        let text = "1,M,1.5,2.5\n2,B,3.0,4.0\n";
        let rows = parse_records(text.as_bytes(), false).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["2", "B", "3.0", "4.0"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_records("".as_bytes(), false), Err(DataError::Invalid(_))));
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field(" 1.25 ", 0, 2).unwrap(), 1.25);
        assert!(matches!(parse_field("abc", 3, 2), Err(DataError::Malformed { record: 3, .. })));
        assert!(parse_field("NaN", 0, 2).is_err());
    }

    #[test]
    fn test_missing_file() {
        let source = DataSource::Path(PathBuf::from("/nonexistent/wdbc.data"));
        assert!(matches!(read_records(&source, false), Err(DataError::Io(_))));
    }
}
