use crate::types::{AnsweringResult, QuestionRequest, StoreCredentials};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// A question answering system that writes its findings into a result graph.
#[async_trait]
pub trait AnsweringSystem: Send + Sync {
    async fn ask_question(&self, request: &QuestionRequest) -> ClientResult<AnsweringResult>;

    fn system_name(&self) -> &'static str;
}

/// An open connection to one triplestore database.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Evaluates a boolean (ASK) query.
    async fn ask(&self, query: &str) -> ClientResult<bool>;

    fn endpoint(&self) -> &str;
}

#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &StoreCredentials,
    ) -> ClientResult<Box<dyn StoreConnection>>;
}

pub(crate) fn map_transport_error(err: reqwest::Error, service: &str) -> ClientError {
    if err.is_timeout() {
        ClientError::ServiceUnavailable {
            message: format!("Request to {} timed out", service),
        }
    } else if err.is_connect() {
        ClientError::ServiceUnavailable {
            message: format!("Cannot connect to {}", service),
        }
    } else {
        ClientError::Network(err)
    }
}
