//! Run log events.
//!
//! Components never log through a process-wide handle. They receive an
//! [`EventSink`] and report what happened as [`EvaluationEvent`]s; the sink
//! decides where the events end up (the `tracing` run log, the console, a
//! test buffer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EvaluationEvent {
    RunStarted {
        questions: usize,
        validators: Vec<String>,
        custom_scorer: String,
    },
    QuestionDispatched {
        index: usize,
        question: String,
        out_graph: String,
        endpoint: String,
    },
    QueryRendered {
        template: String,
        query: String,
    },
    ValidatorFinished {
        question: String,
        template: String,
        passed: bool,
        latency_ms: u64,
    },
    CustomScoreFinished {
        question: String,
        scorer: String,
        passed: bool,
        latency_ms: u64,
    },
    /// Free-form message from a custom scorer.
    ScorerMessage {
        scorer: String,
        message: String,
    },
    MatrixBuilt {
        rows: usize,
        columns: Vec<String>,
        averages: Vec<Option<f64>>,
    },
    RunFinished {
        records: usize,
        runtime_ms: u64,
    },
}

impl EvaluationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::QuestionDispatched { .. } => "question_dispatched",
            Self::QueryRendered { .. } => "query_rendered",
            Self::ValidatorFinished { .. } => "validator_finished",
            Self::CustomScoreFinished { .. } => "custom_score_finished",
            Self::ScorerMessage { .. } => "scorer_message",
            Self::MatrixBuilt { .. } => "matrix_built",
            Self::RunFinished { .. } => "run_finished",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: EvaluationEvent);
}

/// Forwards events to `tracing`, optionally echoing progress to stdout.
#[derive(Debug, Default)]
pub struct TracingSink {
    console: bool,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    fn echo(&self, event: &EvaluationEvent) {
        match event {
            EvaluationEvent::QuestionDispatched {
                index, question, ..
            } => println!("\n{}. test: {}", index, question),
            EvaluationEvent::ValidatorFinished {
                passed, latency_ms, ..
            } => println!(" ... {} ({} ms)", passed, latency_ms),
            EvaluationEvent::CustomScoreFinished {
                scorer,
                passed,
                latency_ms,
                ..
            } => println!(
                "run the external custom function: {} --> {} ({} ms)",
                scorer, passed, latency_ms
            ),
            EvaluationEvent::RunFinished { runtime_ms, .. } => {
                println!("\nruntime: {} secs", (*runtime_ms as f64 / 1000.0).round())
            }
            _ => {}
        }
    }
}

impl EventSink for TracingSink {
    fn record(&self, event: EvaluationEvent) {
        if self.console {
            self.echo(&event);
        }

        match &event {
            EvaluationEvent::RunStarted {
                questions,
                validators,
                custom_scorer,
            } => info!(
                questions,
                validators = ?validators,
                custom_scorer = %custom_scorer,
                "evaluation started"
            ),
            EvaluationEvent::QuestionDispatched {
                index,
                question,
                out_graph,
                endpoint,
            } => info!(
                index,
                question = %question,
                out_graph = %out_graph,
                endpoint = %endpoint,
                "question answered by Qanary system"
            ),
            EvaluationEvent::QueryRendered { template, query } => {
                info!(template = %template, query = %query, "rendered validation query")
            }
            EvaluationEvent::ValidatorFinished {
                question,
                template,
                passed,
                latency_ms,
            } => info!(
                question = %question,
                template = %template,
                passed,
                latency_ms,
                "validator finished"
            ),
            EvaluationEvent::CustomScoreFinished {
                question,
                scorer,
                passed,
                latency_ms,
            } => info!(
                question = %question,
                scorer = %scorer,
                passed,
                latency_ms,
                "custom function finished"
            ),
            EvaluationEvent::ScorerMessage { scorer, message } => {
                info!(scorer = %scorer, "{}", message)
            }
            EvaluationEvent::MatrixBuilt {
                rows,
                columns,
                averages,
            } => info!(
                rows,
                columns = ?columns,
                averages = ?averages,
                "final result table"
            ),
            EvaluationEvent::RunFinished {
                records,
                runtime_ms,
            } => info!(records, runtime_ms, "evaluation finished"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub at: DateTime<Utc>,
    pub event: EvaluationEvent,
}

/// Keeps every event in memory; cloning shares the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EvaluationEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|recorded| recorded.event.clone())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: EvaluationEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedEvent {
                at: Utc::now(),
                event,
            });
    }
}
