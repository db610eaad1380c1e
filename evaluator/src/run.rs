use crate::aggregate::ResultMatrix;
use crate::config::TestDefinition;
use crate::error::EvaluationResult;
use crate::events::{EvaluationEvent, EventSink};
use crate::orchestrator::Evaluator;
use crate::report::{write_reports, RunSummary};
use crate::scoring::ScorerRegistry;
use crate::validator::duration_ms;
use chrono::Utc;
use qanary_client::{AnsweringSystem, StoreConnector};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding the test definition and the validator templates.
    pub directory: PathBuf,
    /// Report files are written as `<prefix>.<extension>`.
    pub prefix: PathBuf,
    pub sheet_name: String,
}

/// Evaluates every test and writes the reports.
///
/// Reports are only written once all tests have been evaluated; any error
/// before that leaves no report files behind.
pub async fn execute(
    options: &RunOptions,
    definition: &TestDefinition,
    registry: &ScorerRegistry,
    answering: Box<dyn AnsweringSystem>,
    connector: Box<dyn StoreConnector>,
    sink: Arc<dyn EventSink>,
) -> EvaluationResult<RunSummary> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let start = Instant::now();
    info!(%run_id, directory = %options.directory.display(), "starting evaluation run");

    let evaluator = Evaluator::from_definition(
        definition,
        &options.directory,
        registry,
        answering,
        connector,
        sink.clone(),
    )?;

    let records = evaluator.evaluate_tests(&definition.tests).await?;
    let runtime_ms = duration_ms(start.elapsed());
    sink.record(EvaluationEvent::RunFinished {
        records: records.len(),
        runtime_ms,
    });

    let matrix = ResultMatrix::aggregate(records)?;
    sink.record(EvaluationEvent::MatrixBuilt {
        rows: matrix.rows().len(),
        columns: matrix.columns().to_vec(),
        averages: matrix.averages(),
    });

    let reports = write_reports(&options.prefix, &options.sheet_name, &matrix)?;

    Ok(RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        runtime_secs: (runtime_ms + 500) / 1000,
        questions: matrix.rows().len(),
        validators: evaluator.templates().len(),
        custom_scorer: evaluator.scorer_name().to_string(),
        reports,
    })
}
