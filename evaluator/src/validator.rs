use crate::aggregate::ValidationOutcome;
use crate::config::TestCase;
use crate::error::{EvaluationError, EvaluationResult};
use crate::events::{EvaluationEvent, EventSink};
use crate::template::ValidatorTemplate;
use qanary_client::StoreConnection;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Wall-clock duration rounded to whole milliseconds.
pub fn duration_ms(duration: Duration) -> u64 {
    ((duration.as_nanos() + 500_000) / 1_000_000) as u64
}

/// Awaits `future` and returns its output with the elapsed milliseconds.
pub async fn timed<F, T>(future: F) -> (T, u64)
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let output = future.await;
    (output, duration_ms(start.elapsed()))
}

/// Runs one boolean query. Store failures become `ValidatorExecution` errors.
pub async fn execute(
    connection: &dyn StoreConnection,
    test: &TestCase,
    template_name: &str,
    query: &str,
) -> EvaluationResult<bool> {
    match connection.ask(query).await {
        Ok(result) => {
            info!(
                question = %test.question,
                template = template_name,
                result,
                "validation query executed"
            );
            Ok(result)
        }
        Err(source) => {
            error!(
                template = template_name,
                endpoint = %connection.endpoint(),
                error = %source,
                query,
                "query could not be executed"
            );
            Err(EvaluationError::ValidatorExecution {
                template: template_name.to_string(),
                query: query.to_string(),
                source,
            })
        }
    }
}

/// Renders, executes and times one validator for one test case.
pub async fn run_validator(
    connection: &dyn StoreConnection,
    test: &TestCase,
    template: &ValidatorTemplate,
    graph_id: &str,
    sink: &dyn EventSink,
) -> EvaluationResult<ValidationOutcome> {
    let query = template.render(graph_id, test);
    sink.record(EvaluationEvent::QueryRendered {
        template: template.name().to_string(),
        query: query.clone(),
    });

    let (result, latency_ms) = timed(execute(connection, test, template.name(), &query)).await;
    let passed = result?;

    sink.record(EvaluationEvent::ValidatorFinished {
        question: test.question.clone(),
        template: template.name().to_string(),
        passed,
        latency_ms,
    });

    Ok(ValidationOutcome::new(template.name(), passed))
}
