pub mod config;
pub mod provider;
pub mod qanary;
pub mod triplestore;
pub mod types;

pub use config::QanaryConfig;
pub use provider::{
    AnsweringSystem, ClientError, ClientResult, StoreConnection, StoreConnector,
};
pub use qanary::QanaryProvider;
pub use triplestore::{HttpStoreConnection, HttpStoreConnector};
pub use types::{AnsweringResult, AskResponse, QuestionRequest, StoreCredentials};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::provider::*;
    pub use crate::qanary::*;
    pub use crate::triplestore::*;
    pub use crate::types::*;
}
