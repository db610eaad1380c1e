//! Result records and the result matrix derived from them.
//!
//! The matrix has one row per question, in test order, and one column per
//! validator, in configured order, followed by `custom_evaluation` and
//! `graph`. A trailing `average` row holds the mean of every score column.

use crate::error::{EvaluationError, EvaluationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const GRAPH_COLUMN: &str = "graph";
pub const AVERAGE_ROW: &str = "average";

/// One validator's verdict, serialized as `{"<name>": <passed>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, bool>",
    into = "BTreeMap<String, bool>"
)]
pub struct ValidationOutcome {
    pub validator_name: String,
    pub passed: bool,
}

impl ValidationOutcome {
    pub fn new(validator_name: impl Into<String>, passed: bool) -> Self {
        Self {
            validator_name: validator_name.into(),
            passed,
        }
    }
}

impl From<ValidationOutcome> for BTreeMap<String, bool> {
    fn from(outcome: ValidationOutcome) -> Self {
        BTreeMap::from([(outcome.validator_name, outcome.passed)])
    }
}

impl TryFrom<BTreeMap<String, bool>> for ValidationOutcome {
    type Error = String;

    fn try_from(map: BTreeMap<String, bool>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "a validation outcome has exactly one entry, found {}",
                map.len()
            ));
        }
        let (validator_name, passed) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty validation outcome".to_string())?;
        Ok(Self {
            validator_name,
            passed,
        })
    }
}

/// Everything measured for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub question: String,
    pub graph: String,
    pub results: Vec<ValidationOutcome>,
}

impl ResultRecord {
    pub fn column_names(&self) -> Vec<&str> {
        self.results
            .iter()
            .map(|outcome| outcome.validator_name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Flag(bool),
    Mean(f64),
    Text(String),
    Empty,
}

impl Cell {
    /// Numeric value for charting; text cells have none.
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Flag(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            Cell::Mean(mean) => Some(*mean),
            Cell::Text(_) | Cell::Empty => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub label: String,
    pub cells: Vec<Cell>,
}

/// Validator-major view: one row per column, one column per question plus `average`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransposedTable {
    pub header: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultMatrix {
    columns: Vec<String>,
    records: Vec<ResultRecord>,
    rows: Vec<MatrixRow>,
    average: MatrixRow,
}

impl ResultMatrix {
    /// Folds result records into the matrix. Every record must report the
    /// same columns, in the same order, as the first one.
    pub fn aggregate(records: Vec<ResultRecord>) -> EvaluationResult<Self> {
        let score_columns: Vec<String> = records
            .first()
            .map(|first| first.column_names().into_iter().map(String::from).collect())
            .unwrap_or_default();

        for record in &records {
            let found = record.column_names();
            if found != score_columns {
                return Err(EvaluationError::ColumnMismatch {
                    question: record.question.clone(),
                    expected: score_columns.clone(),
                    found: found.into_iter().map(String::from).collect(),
                });
            }
        }

        let mut passed_counts = vec![0usize; score_columns.len()];
        let rows: Vec<MatrixRow> = records
            .iter()
            .map(|record| {
                let mut cells: Vec<Cell> = record
                    .results
                    .iter()
                    .zip(passed_counts.iter_mut())
                    .map(|(outcome, count)| {
                        if outcome.passed {
                            *count += 1;
                        }
                        Cell::Flag(outcome.passed)
                    })
                    .collect();
                cells.push(Cell::Text(record.graph.clone()));
                MatrixRow {
                    label: record.question.clone(),
                    cells,
                }
            })
            .collect();

        let mut average_cells: Vec<Cell> = if records.is_empty() {
            Vec::new()
        } else {
            passed_counts
                .iter()
                .map(|count| Cell::Mean(*count as f64 / records.len() as f64))
                .collect()
        };
        average_cells.push(Cell::Empty);

        let mut columns = score_columns;
        columns.push(GRAPH_COLUMN.to_string());

        Ok(Self {
            columns,
            records,
            rows,
            average: MatrixRow {
                label: AVERAGE_ROW.to_string(),
                cells: average_cells,
            },
        })
    }

    /// All column names, `graph` last.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Columns that carry scores, i.e. all but `graph`.
    pub fn score_columns(&self) -> &[String] {
        &self.columns[..self.columns.len() - 1]
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn average_row(&self) -> &MatrixRow {
        &self.average
    }

    /// Mean per score column; `None` for a column when there are no records.
    pub fn averages(&self) -> Vec<Option<f64>> {
        self.score_columns()
            .iter()
            .enumerate()
            .map(|(i, _)| self.average.cells.get(i).and_then(Cell::value))
            .collect()
    }

    pub fn transposed(&self) -> TransposedTable {
        let mut header: Vec<String> = self.rows.iter().map(|row| row.label.clone()).collect();
        header.push(AVERAGE_ROW.to_string());

        let rows = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| MatrixRow {
                label: column.clone(),
                cells: self
                    .rows
                    .iter()
                    .chain(std::iter::once(&self.average))
                    .map(|row| row.cells.get(i).cloned().unwrap_or(Cell::Empty))
                    .collect(),
            })
            .collect();

        TransposedTable { header, rows }
    }
}
