//! Custom scoring extension point.
//!
//! A run may name one custom scorer in `custom-validation`. Scorers are
//! registered under a name in a [`ScorerRegistry`]; the name is resolved and
//! the scorer's declared contract is checked once, before the first question
//! is dispatched. Without a configured name the [`AlwaysTrue`] stub is used.

use crate::config::TestCase;
use crate::error::{EvaluationError, EvaluationResult};
use crate::events::{EvaluationEvent, EventSink};
use async_trait::async_trait;
use qanary_client::{QanaryConfig, StoreConnection};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

pub const VALIDATE_OPERATION: &str = "validate";

pub const VALIDATE_PARAMETERS: [&str; 5] =
    ["test", "logger", "configuration", "connection", "graph_id"];

/// Result column name of the custom score.
pub const CUSTOM_EVALUATION: &str = "custom_evaluation";

/// The invocation surface a scorer declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorerContract {
    pub operation: String,
    pub parameters: Vec<String>,
}

impl ScorerContract {
    pub fn new(operation: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            operation: operation.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(VALIDATE_OPERATION, &VALIDATE_PARAMETERS)
    }
}

#[async_trait]
pub trait CustomScorer: Send + Sync {
    fn name(&self) -> &str;

    fn contract(&self) -> ScorerContract {
        ScorerContract::standard()
    }

    async fn validate(
        &self,
        test: &TestCase,
        logger: &dyn EventSink,
        configuration: &QanaryConfig,
        connection: &dyn StoreConnection,
        graph_id: &str,
    ) -> EvaluationResult<bool>;
}

/// Default scorer: every question passes.
pub struct AlwaysTrue;

#[async_trait]
impl CustomScorer for AlwaysTrue {
    fn name(&self) -> &str {
        "always-true"
    }

    async fn validate(
        &self,
        _test: &TestCase,
        _logger: &dyn EventSink,
        _configuration: &QanaryConfig,
        _connection: &dyn StoreConnection,
        _graph_id: &str,
    ) -> EvaluationResult<bool> {
        Ok(true)
    }
}

/// Passes when the result graph holds at least one triple.
pub struct NonEmptyGraph;

impl NonEmptyGraph {
    pub fn query(graph_id: &str) -> String {
        format!("ASK FROM <{}> {{ ?s ?p ?o }}", graph_id)
    }
}

#[async_trait]
impl CustomScorer for NonEmptyGraph {
    fn name(&self) -> &str {
        "non-empty-graph"
    }

    async fn validate(
        &self,
        test: &TestCase,
        logger: &dyn EventSink,
        _configuration: &QanaryConfig,
        connection: &dyn StoreConnection,
        graph_id: &str,
    ) -> EvaluationResult<bool> {
        let populated = connection
            .ask(&Self::query(graph_id))
            .await
            .map_err(|e| EvaluationError::Scoring {
                scorer: self.name().to_string(),
                reason: e.to_string(),
            })?;

        logger.record(EvaluationEvent::ScorerMessage {
            scorer: self.name().to_string(),
            message: format!(
                "graph {} of '{}' is {}",
                graph_id,
                test.question,
                if populated { "populated" } else { "empty" }
            ),
        });
        Ok(populated)
    }
}

pub struct ScorerRegistry {
    scorers: HashMap<String, Arc<dyn CustomScorer>>,
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self {
            scorers: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AlwaysTrue));
        registry.register(Arc::new(NonEmptyGraph));
        registry
    }

    /// Adds a scorer; a scorer with the same name is replaced.
    pub fn register(&mut self, scorer: Arc<dyn CustomScorer>) {
        let name = scorer.name().to_string();
        self.scorers.insert(name, scorer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CustomScorer>> {
        self.scorers.get(name).cloned()
    }

    pub fn list_scorers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scorers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Resolves the configured scorer and checks its contract.
    pub fn load(&self, name: Option<&str>) -> EvaluationResult<Arc<dyn CustomScorer>> {
        let scorer: Arc<dyn CustomScorer> = match name {
            None => Arc::new(AlwaysTrue),
            Some(name) => self.get(name).ok_or_else(|| {
                error!(scorer = name, "custom validation not registered");
                EvaluationError::ExtensionLoad {
                    name: name.to_string(),
                    reason: format!("no scorer registered, available: {:?}", self.list_scorers()),
                }
            })?,
        };

        verify_contract(scorer.as_ref())?;
        Ok(scorer)
    }
}

impl Default for ScorerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

pub fn verify_contract(scorer: &dyn CustomScorer) -> EvaluationResult<()> {
    let contract = scorer.contract();

    if contract.operation != VALIDATE_OPERATION {
        error!(
            scorer = scorer.name(),
            operation = %contract.operation,
            "method '{}' NOT found", VALIDATE_OPERATION
        );
        return Err(EvaluationError::ExtensionContract {
            name: scorer.name().to_string(),
            reason: format!("needs to provide the operation '{}'", VALIDATE_OPERATION),
        });
    }

    if contract.parameters.len() != VALIDATE_PARAMETERS.len() {
        let reason = format!(
            "operation '{}' has to take {} parameters (typically: {}), found {}",
            VALIDATE_OPERATION,
            VALIDATE_PARAMETERS.len(),
            VALIDATE_PARAMETERS.join(", "),
            contract.parameters.len()
        );
        error!(scorer = scorer.name(), "{}", reason);
        return Err(EvaluationError::ExtensionContract {
            name: scorer.name().to_string(),
            reason,
        });
    }

    info!(scorer = scorer.name(), "method '{}' found", VALIDATE_OPERATION);
    Ok(())
}
