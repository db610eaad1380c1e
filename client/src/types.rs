use serde::{Deserialize, Serialize};

/// Form key under which the component list is sent, once per component.
pub const COMPONENTLIST_KEY: &str = "componentlist[]";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRequest {
    pub question: String,
    pub componentlist: Vec<String>,
}

impl QuestionRequest {
    pub fn new(question: impl Into<String>, componentlist: Vec<String>) -> Self {
        Self {
            question: question.into(),
            componentlist,
        }
    }

    /// Url-encoded form body: `question` first, then one entry per component in order.
    pub fn form_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(self.componentlist.len() + 1);
        pairs.push(("question", self.question.as_str()));
        for component in &self.componentlist {
            pairs.push((COMPONENTLIST_KEY, component.as_str()));
        }
        pairs
    }
}

/// The part of a Qanary response the evaluation depends on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnsweringResult {
    #[serde(rename = "outGraph")]
    pub out_graph: String,
    pub endpoint: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub username: String,
    pub password: String,
    pub database: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// SPARQL JSON results document of an ASK query.
#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub boolean: bool,
}
