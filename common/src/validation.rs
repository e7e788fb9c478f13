//! Parse uploaded prediction tables and check them against the answer key.

use crate::{AnswerKey, BAD_PAYER_LABEL, GOOD_PAYER_LABEL, Label};
use log::warn;
use std::fmt;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("the file has {found} rows but {expected} were expected")]
    RowCountMismatch { found: usize, expected: usize },
    #[error("the file must contain exactly one column with the predictions, found {found}")]
    ColumnCountMismatch { found: usize },
    #[error("could not read the prediction file: {0}")]
    MalformedCsv(String),
}

/// Some cells held neither label. Those rows were left out of scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappableLabelWarning {
    pub dropped_rows: Vec<usize>,
}

impl fmt::Display for UnmappableLabelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} values are not '{BAD_PAYER_LABEL}' or '{GOOD_PAYER_LABEL}' and were ignored",
            self.dropped_rows.len()
        )
    }
}

/// A user-supplied table. The first CSV record is the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl PredictionTable {
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// # Errors
    /// Returns `MalformedCsv` if the input is empty, not UTF-8, or has ragged records.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ValidationError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ValidationError::MalformedCsv(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() {
            return Err(ValidationError::MalformedCsv("the file is empty".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ValidationError::MalformedCsv(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// # Errors
    /// See [`PredictionTable::from_csv_reader`].
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        Self::from_csv_reader(bytes)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cells of the first column, in row order.
    pub fn first_column(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(|row| row.first().map_or("", String::as_str))
    }
}

/// A prediction tagged with the row it came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IndexedPrediction {
    pub row: usize,
    pub label: Label,
}

/// Predictions that survived label mapping, still aligned to their original rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappedPredictions {
    predictions: Vec<IndexedPrediction>,
    dropped_rows: Vec<usize>,
}

impl MappedPredictions {
    #[must_use]
    pub fn predictions(&self) -> &[IndexedPrediction] {
        &self.predictions
    }

    #[must_use]
    pub fn dropped_rows(&self) -> &[usize] {
        &self.dropped_rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    #[must_use]
    pub fn warning(&self) -> Option<UnmappableLabelWarning> {
        if self.dropped_rows.is_empty() {
            None
        } else {
            Some(UnmappableLabelWarning {
                dropped_rows: self.dropped_rows.clone(),
            })
        }
    }
}

/// Map a cell to a label. The match is exact and case-sensitive.
#[must_use]
pub fn map_label(cell: &str) -> Option<Label> {
    match cell {
        BAD_PAYER_LABEL => Some(Label::Bad),
        GOOD_PAYER_LABEL => Some(Label::Good),
        _ => None,
    }
}

/// # Errors
/// Returns `RowCountMismatch` unless the table has one row per answer key entry.
pub fn check_row_count(
    table: &PredictionTable,
    answer_key: &AnswerKey,
) -> Result<(), ValidationError> {
    if table.row_count() == answer_key.len() {
        Ok(())
    } else {
        Err(ValidationError::RowCountMismatch {
            found: table.row_count(),
            expected: answer_key.len(),
        })
    }
}

/// # Errors
/// Returns `ColumnCountMismatch` unless the table has exactly one column.
pub fn check_column_count(table: &PredictionTable) -> Result<(), ValidationError> {
    if table.column_count() == 1 {
        Ok(())
    } else {
        Err(ValidationError::ColumnCountMismatch {
            found: table.column_count(),
        })
    }
}

/// Check the table shape and map every cell to a label.
/// Rows that do not map are dropped by index and reported through
/// [`MappedPredictions::warning`]; they never fail the submission.
///
/// # Errors
/// Returns the first shape violation found, rows before columns.
pub fn validate(
    table: &PredictionTable,
    answer_key: &AnswerKey,
) -> Result<MappedPredictions, ValidationError> {
    check_row_count(table, answer_key)?;
    check_column_count(table)?;

    let mut mapped = MappedPredictions::default();
    for (row, cell) in table.first_column().enumerate() {
        match map_label(cell) {
            Some(label) => mapped.predictions.push(IndexedPrediction { row, label }),
            None => mapped.dropped_rows.push(row),
        }
    }

    if let Some(warning) = mapped.warning() {
        warn!("{warning}: rows {:?}", warning.dropped_rows);
    }

    Ok(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(column: &[&str]) -> PredictionTable {
        PredictionTable::new(
            vec!["prediction".to_string()],
            column.iter().map(|c| vec![(*c).to_string()]).collect(),
        )
    }

    #[test_log::test]
    fn test_parse_csv_with_header() {
        let csv = "prediction\nbad payer\ngood payer\nbad payer\n";
        let table = PredictionTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.first_column().collect::<Vec<_>>(),
            vec!["bad payer", "good payer", "bad payer"]
        );
    }

    #[test_log::test]
    fn test_parse_csv_with_crlf_and_two_columns() {
        let csv = "id,prediction\r\n1,bad payer\r\n2,good payer\r\n";
        let table = PredictionTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 2);
    }

    #[test_log::test]
    fn test_parse_csv_rejects_ragged_and_empty_input() {
        let ragged = "prediction\nbad payer\ngood payer,extra\n";
        assert!(matches!(
            PredictionTable::from_csv_bytes(ragged.as_bytes()),
            Err(ValidationError::MalformedCsv(_))
        ));
        assert!(matches!(
            PredictionTable::from_csv_bytes(b""),
            Err(ValidationError::MalformedCsv(_))
        ));
        assert!(matches!(
            PredictionTable::from_csv_bytes(&[b'p', 0xff, 0xfe, b'\n']),
            Err(ValidationError::MalformedCsv(_))
        ));
    }

    #[test_log::test]
    fn test_map_label_is_exact() {
        assert_eq!(map_label("bad payer"), Some(Label::Bad));
        assert_eq!(map_label("good payer"), Some(Label::Good));
        assert_eq!(map_label("Bad Payer"), None);
        assert_eq!(map_label(" bad payer"), None);
        assert_eq!(map_label("1"), None);
    }

    #[test_log::test]
    fn test_validate_maps_all_rows() {
        let key = AnswerKey::new(&[1, 0, 1]).unwrap();
        let mapped = validate(&table(&["bad payer", "good payer", "good payer"]), &key).unwrap();
        assert_eq!(mapped.len(), 3);
        assert!(mapped.dropped_rows().is_empty());
        assert!(mapped.warning().is_none());
        assert_eq!(
            mapped.predictions()[2],
            IndexedPrediction {
                row: 2,
                label: Label::Good
            }
        );
    }

    #[test_log::test]
    fn test_validate_drops_unmapped_rows_by_index() {
        let key = AnswerKey::new(&[1, 0, 1, 0]).unwrap();
        let mapped = validate(&table(&["bad payer", "maybe", "bad payer", "GOOD"]), &key).unwrap();
        assert_eq!(mapped.dropped_rows(), &[1, 3]);
        let rows: Vec<usize> = mapped.predictions().iter().map(|p| p.row).collect();
        assert_eq!(rows, vec![0, 2]);
        assert_eq!(
            mapped.warning(),
            Some(UnmappableLabelWarning {
                dropped_rows: vec![1, 3]
            })
        );
    }

    #[test_log::test]
    fn test_row_count_mismatch_regardless_of_columns() {
        let key = AnswerKey::new(&[1, 0, 1]).unwrap();
        let short = table(&["bad payer", "good payer"]);
        assert_eq!(
            validate(&short, &key),
            Err(ValidationError::RowCountMismatch {
                found: 2,
                expected: 3
            })
        );

        let wide = PredictionTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["x".to_string(), "y".to_string()]; 4],
        );
        assert_eq!(
            check_row_count(&wide, &key),
            Err(ValidationError::RowCountMismatch {
                found: 4,
                expected: 3
            })
        );
    }

    #[test_log::test]
    fn test_column_count_mismatch_regardless_of_rows() {
        let key = AnswerKey::new(&[1, 0]).unwrap();
        let wide = PredictionTable::new(
            vec!["id".to_string(), "prediction".to_string()],
            vec![
                vec!["1".to_string(), "bad payer".to_string()],
                vec!["2".to_string(), "good payer".to_string()],
            ],
        );
        assert_eq!(
            validate(&wide, &key),
            Err(ValidationError::ColumnCountMismatch { found: 2 })
        );

        let wide_and_short = PredictionTable::new(
            vec!["id".to_string(), "prediction".to_string()],
            vec![vec!["1".to_string(), "bad payer".to_string()]],
        );
        assert_eq!(
            check_column_count(&wide_and_short),
            Err(ValidationError::ColumnCountMismatch { found: 2 })
        );
    }
}
