use crate::aggregate::{ResultRecord, ValidationOutcome};
use crate::config::{TestCase, TestDefinition};
use crate::error::{EvaluationError, EvaluationResult};
use crate::events::{EvaluationEvent, EventSink};
use crate::scoring::{CustomScorer, ScorerRegistry, CUSTOM_EVALUATION};
use crate::template::{load_templates, ValidatorTemplate};
use crate::validator::{run_validator, timed};
use qanary_client::{
    AnsweringResult, AnsweringSystem, QanaryConfig, QuestionRequest, StoreConnection,
    StoreConnector,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Drives every test case through dispatch, validation and custom scoring.
///
/// Test cases are processed one after another and the first error ends the
/// run, so a finished run always has a record for every configured test.
pub struct Evaluator {
    qanary: QanaryConfig,
    answering: Box<dyn AnsweringSystem>,
    connector: Box<dyn StoreConnector>,
    templates: Vec<ValidatorTemplate>,
    scorer: Arc<dyn CustomScorer>,
    sink: Arc<dyn EventSink>,
}

impl Evaluator {
    pub fn new(
        qanary: QanaryConfig,
        answering: Box<dyn AnsweringSystem>,
        connector: Box<dyn StoreConnector>,
        templates: Vec<ValidatorTemplate>,
        scorer: Arc<dyn CustomScorer>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            qanary,
            answering,
            connector,
            templates,
            scorer,
            sink,
        }
    }

    /// Loads templates from `directory` and resolves the custom scorer.
    /// Both happen before anything is sent to the answering system.
    pub fn from_definition(
        definition: &TestDefinition,
        directory: &Path,
        registry: &ScorerRegistry,
        answering: Box<dyn AnsweringSystem>,
        connector: Box<dyn StoreConnector>,
        sink: Arc<dyn EventSink>,
    ) -> EvaluationResult<Self> {
        let templates = load_templates(directory, &definition.validators)?;
        let scorer = registry.load(definition.custom_validation.as_deref())?;

        Ok(Self::new(
            definition.qanary.clone(),
            answering,
            connector,
            templates,
            scorer,
            sink,
        ))
    }

    pub fn templates(&self) -> &[ValidatorTemplate] {
        &self.templates
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    pub async fn evaluate_tests(&self, tests: &[TestCase]) -> EvaluationResult<Vec<ResultRecord>> {
        self.sink.record(EvaluationEvent::RunStarted {
            questions: tests.len(),
            validators: self.templates.iter().map(|t| t.name().to_string()).collect(),
            custom_scorer: self.scorer.name().to_string(),
        });

        let mut results = Vec::with_capacity(tests.len());
        for (nr, test) in tests.iter().enumerate() {
            let record = self.evaluate_test(nr, test).await?;
            results.push(record);
        }

        info!(records = results.len(), "complete results collected");
        Ok(results)
    }

    pub async fn evaluate_test(&self, nr: usize, test: &TestCase) -> EvaluationResult<ResultRecord> {
        debug!(nr, test = ?test, "test");

        let answer = self.dispatch(test).await?;
        self.sink.record(EvaluationEvent::QuestionDispatched {
            index: nr,
            question: test.question.clone(),
            out_graph: answer.out_graph.clone(),
            endpoint: answer.endpoint.clone(),
        });

        let mut results = Vec::with_capacity(self.templates.len() + 1);
        {
            let connection = self.connect(&answer.endpoint).await?;
            for template in &self.templates {
                let outcome = run_validator(
                    connection.as_ref(),
                    test,
                    template,
                    &answer.out_graph,
                    self.sink.as_ref(),
                )
                .await?;
                results.push(outcome);
            }
        }

        let custom = self.custom_score(test, &answer).await?;
        results.push(ValidationOutcome::new(CUSTOM_EVALUATION, custom));

        Ok(ResultRecord {
            question: test.question.clone(),
            graph: answer.out_graph,
            results,
        })
    }

    async fn dispatch(&self, test: &TestCase) -> EvaluationResult<AnsweringResult> {
        let request = QuestionRequest::new(test.question.clone(), self.qanary.componentlist.clone());
        info!(
            system = %self.answering.system_name(),
            question = %test.question,
            "dispatching question"
        );
        self.answering
            .ask_question(&request)
            .await
            .map_err(|source| EvaluationError::AnsweringDispatch {
                question: test.question.clone(),
                source,
            })
    }

    /// The endpoint comes from the answering system's response, not the configuration.
    async fn connect(&self, endpoint: &str) -> EvaluationResult<Box<dyn StoreConnection>> {
        self.connector
            .connect(endpoint, &self.qanary.credentials())
            .await
            .map_err(|source| EvaluationError::StoreConnection {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    async fn custom_score(&self, test: &TestCase, answer: &AnsweringResult) -> EvaluationResult<bool> {
        let connection = self.connect(&answer.endpoint).await?;
        let (result, latency_ms) = timed(self.scorer.validate(
            test,
            self.sink.as_ref(),
            &self.qanary,
            connection.as_ref(),
            &answer.out_graph,
        ))
        .await;
        let passed = result?;

        self.sink.record(EvaluationEvent::CustomScoreFinished {
            question: test.question.clone(),
            scorer: self.scorer.name().to_string(),
            passed,
            latency_ms,
        });
        Ok(passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::capture::CapturedLog;
    use crate::events::MemorySink;
    use async_trait::async_trait;
    use qanary_client::{ClientError, ClientResult, StoreCredentials};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StaticSystem {
        graphs: HashMap<String, AnsweringResult>,
    }

    #[async_trait]
    impl AnsweringSystem for StaticSystem {
        async fn ask_question(&self, request: &QuestionRequest) -> ClientResult<AnsweringResult> {
            self.graphs
                .get(&request.question)
                .cloned()
                .ok_or_else(|| ClientError::MalformedResponse {
                    message: "no outGraph".to_string(),
                })
        }

        fn system_name(&self) -> &'static str {
            "static"
        }
    }

    /// Answers `true` for queries containing "pass", counts connections per endpoint.
    #[derive(Clone, Default)]
    struct KeywordStore {
        connections: Arc<Mutex<Vec<String>>>,
    }

    struct KeywordConnection {
        endpoint: String,
    }

    #[async_trait]
    impl StoreConnection for KeywordConnection {
        async fn ask(&self, query: &str) -> ClientResult<bool> {
            Ok(query.contains("pass"))
        }

        fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    #[async_trait]
    impl StoreConnector for KeywordStore {
        async fn connect(
            &self,
            endpoint: &str,
            _credentials: &StoreCredentials,
        ) -> ClientResult<Box<dyn StoreConnection>> {
            self.connections.lock().unwrap().push(endpoint.to_string());
            Ok(Box::new(KeywordConnection {
                endpoint: endpoint.to_string(),
            }))
        }
    }

    fn system(entries: &[(&str, &str, &str)]) -> Box<StaticSystem> {
        Box::new(StaticSystem {
            graphs: entries
                .iter()
                .map(|(question, graph, endpoint)| {
                    (
                        question.to_string(),
                        AnsweringResult {
                            out_graph: graph.to_string(),
                            endpoint: endpoint.to_string(),
                        },
                    )
                })
                .collect(),
        })
    }

    fn evaluator(answering: Box<StaticSystem>, store: KeywordStore, sink: MemorySink) -> Evaluator {
        let templates = vec![
            ValidatorTemplate::parse("V1", "ASK FROM <GRAPHID> { <pass> ?p ?o }").unwrap(),
            ValidatorTemplate::parse("V2", "ASK FROM <GRAPHID> { <X> ?p ?o }").unwrap(),
        ];
        Evaluator::new(
            QanaryConfig::default(),
            answering,
            Box::new(store),
            templates,
            ScorerRegistry::with_builtins().load(None).unwrap(),
            Arc::new(sink),
        )
    }

    #[tokio::test]
    async fn test_record_has_validators_then_custom_score() {
        let store = KeywordStore::default();
        let sink = MemorySink::new();
        let evaluator = evaluator(system(&[("Q1", "g1", "http://e1")]), store.clone(), sink.clone());

        let tests = vec![TestCase::new("Q1").with_replacement("<X>", "42")];
        let records = evaluator.evaluate_tests(&tests).await.unwrap();

        assert_eq!(
            records,
            vec![ResultRecord {
                question: "Q1".to_string(),
                graph: "g1".to_string(),
                results: vec![
                    ValidationOutcome::new("V1", true),
                    ValidationOutcome::new("V2", false),
                    ValidationOutcome::new(CUSTOM_EVALUATION, true),
                ],
            }]
        );
        assert_eq!(sink.count("validator_finished"), 2);
        assert_eq!(sink.count("custom_score_finished"), 1);
    }

    #[tokio::test]
    async fn test_connections_use_response_endpoint() {
        let store = KeywordStore::default();
        let evaluator = evaluator(
            system(&[("Q1", "g1", "http://e1"), ("Q2", "g2", "http://e2")]),
            store.clone(),
            MemorySink::new(),
        );

        evaluator
            .evaluate_tests(&[TestCase::new("Q1"), TestCase::new("Q2")])
            .await
            .unwrap();

        // one connection for the validators, a fresh one for the custom scorer
        assert_eq!(
            *store.connections.lock().unwrap(),
            vec!["http://e1", "http://e1", "http://e2", "http://e2"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_failure_aborts_run() {
        let store = KeywordStore::default();
        let sink = MemorySink::new();
        let evaluator = evaluator(system(&[("Q1", "g1", "http://e1")]), store.clone(), sink.clone());

        let result = evaluator
            .evaluate_tests(&[TestCase::new("Q1"), TestCase::new("unknown"), TestCase::new("Q1")])
            .await;

        assert!(matches!(
            result,
            Err(EvaluationError::AnsweringDispatch { question, .. }) if question == "unknown"
        ));
        assert_eq!(sink.count("question_dispatched"), 1);
        assert_eq!(store.connections.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_logs_answering_system() {
        let log = CapturedLog::default();
        let _guard = tracing::subscriber::set_default(log.subscriber());
        let evaluator = evaluator(
            system(&[("Q1", "g1", "http://e1")]),
            KeywordStore::default(),
            MemorySink::new(),
        );

        evaluator.evaluate_tests(&[TestCase::new("Q1")]).await.unwrap();

        let output = log.contents();
        assert!(output.contains("dispatching question"));
        assert!(output.contains("system=static"));
    }
}
