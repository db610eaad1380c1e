pub mod aggregate;
pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod report;
pub mod run;
pub mod scoring;
pub mod template;
pub mod validator;

pub use aggregate::{
    Cell, MatrixRow, ResultMatrix, ResultRecord, TransposedTable, ValidationOutcome, AVERAGE_ROW,
    GRAPH_COLUMN,
};
pub use config::{TestCase, TestDefinition, TEST_DEFINITION_FILE};
pub use error::{EvaluationError, EvaluationResult};
pub use events::{EvaluationEvent, EventSink, MemorySink, TracingSink};
pub use orchestrator::Evaluator;
pub use report::{
    chart_spec, render_csv, render_transposed_csv, report_prefix, with_suffix, write_reports,
    ChartSpec, ReportPaths, RunSummary, DEFAULT_SHEET_NAME,
};
pub use run::{execute, RunOptions};
pub use scoring::{
    AlwaysTrue, CustomScorer, NonEmptyGraph, ScorerContract, ScorerRegistry, CUSTOM_EVALUATION,
};
pub use template::{load_templates, render, ValidatorTemplate, GRAPH_ID_PLACEHOLDER};
