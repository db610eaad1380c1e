//! Report writers.
//!
//! All reports are views of one [`ResultMatrix`]:
//!
//! - `<prefix>.json`: the result records, lossless
//! - `<prefix>.csv`: one row per question plus the average row
//! - `<prefix>.by-validator.csv`: the same table transposed
//! - `<prefix>.chart.json`: a line chart description with one series per
//!   question and an `avg` series, value axis fixed to `[0, 1]`

use crate::aggregate::{Cell, MatrixRow, ResultMatrix};
use crate::error::{EvaluationError, EvaluationResult};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_SHEET_NAME: &str = "QanarySystemQualityControl";

const AVERAGE_LABEL: &str = "average:";
const AVERAGE_SERIES: &str = "avg";

/// `<output_dir>/<sheet_name>_<YYYY-MM-DD_HH-MM-SS>`
pub fn report_prefix(output_dir: &Path, sheet_name: &str, at: DateTime<Local>) -> PathBuf {
    output_dir.join(format!("{}_{}", sheet_name, at.format("%Y-%m-%d_%H-%M-%S")))
}

/// Appends `suffix` to the prefix's file name. Sheet names may contain dots,
/// so `Path::with_extension` is not usable here.
pub fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub transposed_csv: PathBuf,
    pub chart: PathBuf,
}

impl ReportPaths {
    pub fn for_prefix(prefix: &Path) -> Self {
        Self {
            json: with_suffix(prefix, ".json"),
            csv: with_suffix(prefix, ".csv"),
            transposed_csv: with_suffix(prefix, ".by-validator.csv"),
            chart: with_suffix(prefix, ".chart.json"),
        }
    }
}

fn write_file(path: &Path, contents: &[u8]) -> EvaluationResult<()> {
    let report_error = |source| EvaluationError::Report {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(report_error)?;
    }

    let mut file = File::create(path).map_err(report_error)?;
    file.write_all(contents).map_err(report_error)?;
    file.write_all(b"\n").map_err(report_error)?;
    Ok(())
}

fn to_json<T: Serialize>(path: &Path, value: &T) -> EvaluationResult<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| EvaluationError::Report {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}

pub fn write_json(path: &Path, matrix: &ResultMatrix) -> EvaluationResult<()> {
    write_file(path, &to_json(path, &matrix.records())?)?;
    println!("JSON file written to '{}'.", path.display());
    Ok(())
}

fn escape_csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders a mean with at most four decimals and at least one.
fn format_mean(mean: f64) -> String {
    let fixed = format!("{:.4}", mean);
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Flag(flag) => flag.to_string(),
        Cell::Mean(mean) => format_mean(*mean),
        Cell::Text(text) => escape_csv_cell(text),
        Cell::Empty => String::new(),
    }
}

fn csv_line(label: &str, cells: &[Cell]) -> String {
    std::iter::once(escape_csv_cell(label))
        .chain(cells.iter().map(format_cell))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn render_csv(matrix: &ResultMatrix) -> String {
    let header: Vec<String> = std::iter::once("question".to_string())
        .chain(matrix.columns().iter().map(|c| escape_csv_cell(c)))
        .collect();

    let mut lines = vec![header.join(",")];
    lines.extend(matrix.rows().iter().map(|row| csv_line(&row.label, &row.cells)));
    lines.push(csv_line(AVERAGE_LABEL, &matrix.average_row().cells));
    lines.join("\n")
}

pub fn write_csv(path: &Path, matrix: &ResultMatrix) -> EvaluationResult<()> {
    write_file(path, render_csv(matrix).as_bytes())?;
    println!("CSV file written to '{}'.", path.display());
    Ok(())
}

/// Validator-major table: one row per column, one column per question.
pub fn render_transposed_csv(matrix: &ResultMatrix) -> String {
    let table = matrix.transposed();
    let header: Vec<String> = std::iter::once(String::new())
        .chain(table.header.iter().map(|q| escape_csv_cell(q)))
        .collect();

    let mut lines = vec![header.join(",")];
    lines.extend(table.rows.iter().map(|row| csv_line(&row.label, &row.cells)));
    lines.join("\n")
}

pub fn write_transposed_csv(path: &Path, matrix: &ResultMatrix) -> EvaluationResult<()> {
    write_file(path, render_transposed_csv(matrix).as_bytes())?;
    println!("CSV file written to '{}'.", path.display());
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAxis {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStyle {
    pub marker: String,
    pub marker_size: f64,
    pub marker_border: String,
    pub marker_fill: String,
    pub line_color: String,
    pub line_width: f64,
}

impl SeriesStyle {
    fn average() -> Self {
        Self {
            marker: "square".to_string(),
            marker_size: 8.0,
            marker_border: "black".to_string(),
            marker_fill: "yellow".to_string(),
            line_color: "black".to_string(),
            line_width: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<SeriesStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub chart_type: String,
    pub title: String,
    pub size: ChartSize,
    pub categories: Vec<String>,
    pub value_axis: ValueAxis,
    pub series: Vec<ChartSeries>,
}

fn series_values(row: &MatrixRow, score_columns: usize) -> Vec<f64> {
    row.cells
        .iter()
        .take(score_columns)
        .map(|cell| cell.value().unwrap_or(0.0))
        .collect()
}

pub fn chart_spec(matrix: &ResultMatrix, sheet_name: &str) -> ChartSpec {
    let categories = matrix.score_columns().to_vec();
    let score_columns = categories.len();

    let mut series: Vec<ChartSeries> = matrix
        .rows()
        .iter()
        .map(|row| ChartSeries {
            name: row.label.clone(),
            values: series_values(row, score_columns),
            style: None,
        })
        .collect();
    series.push(ChartSeries {
        name: AVERAGE_SERIES.to_string(),
        values: series_values(matrix.average_row(), score_columns),
        style: Some(SeriesStyle::average()),
    });

    ChartSpec {
        chart_type: "line".to_string(),
        title: sheet_name.to_string(),
        size: ChartSize {
            width: matrix.columns().len() as u32 * 50 + 400,
            height: 500,
        },
        categories,
        value_axis: ValueAxis { min: 0.0, max: 1.0 },
        series,
    }
}

pub fn write_chart(path: &Path, matrix: &ResultMatrix, sheet_name: &str) -> EvaluationResult<()> {
    write_file(path, &to_json(path, &chart_spec(matrix, sheet_name))?)?;
    println!("Chart file written to '{}'.", path.display());
    Ok(())
}

pub fn write_reports(
    prefix: &Path,
    sheet_name: &str,
    matrix: &ResultMatrix,
) -> EvaluationResult<ReportPaths> {
    let paths = ReportPaths::for_prefix(prefix);
    write_json(&paths.json, matrix)?;
    write_csv(&paths.csv, matrix)?;
    write_transposed_csv(&paths.transposed_csv, matrix)?;
    write_chart(&paths.chart, matrix, sheet_name)?;
    info!(
        json = %paths.json.display(),
        csv = %paths.csv.display(),
        transposed_csv = %paths.transposed_csv.display(),
        chart = %paths.chart.display(),
        "reports written"
    );
    Ok(paths)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub runtime_secs: u64,
    pub questions: usize,
    pub validators: usize,
    pub custom_scorer: String,
    pub reports: ReportPaths,
}
