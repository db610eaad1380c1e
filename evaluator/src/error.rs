use qanary_client::ClientError;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure that ends an evaluation run. Nothing is recovered per test case.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Template '{template}' is invalid: {reason}")]
    TemplateFormat { template: String, reason: String },

    #[error("Custom validation '{name}' could not be loaded: {reason}")]
    ExtensionLoad { name: String, reason: String },

    #[error("Custom validation '{name}' does not fulfil the scorer contract: {reason}")]
    ExtensionContract { name: String, reason: String },

    #[error("Qanary request for question '{question}' failed: {source}")]
    AnsweringDispatch {
        question: String,
        #[source]
        source: ClientError,
    },

    #[error("Triplestore connection to '{endpoint}' failed: {source}")]
    StoreConnection {
        endpoint: String,
        #[source]
        source: ClientError,
    },

    #[error("query of '{template}' could not be executed: {source}\n{query}")]
    ValidatorExecution {
        template: String,
        query: String,
        #[source]
        source: ClientError,
    },

    #[error("Custom scorer '{scorer}' failed: {reason}")]
    Scoring { scorer: String, reason: String },

    #[error("Result record for '{question}' has columns {found:?}, expected {expected:?}")]
    ColumnMismatch {
        question: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Failed to write report '{}': {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EvaluationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;
