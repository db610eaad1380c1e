use crate::error::{EvaluationError, EvaluationResult};
use qanary_client::QanaryConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

pub const TEST_DEFINITION_FILE: &str = "qanary-test-definition.json";

/// One question plus the values substituted into every validator template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub question: String,
    /// Applied in document order.
    #[serde(default)]
    pub replacements: Map<String, Value>,
}

impl TestCase {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            replacements: Map::new(),
        }
    }

    pub fn with_replacement(mut self, placeholder: impl Into<String>, value: impl Into<Value>) -> Self {
        self.replacements.insert(placeholder.into(), value.into());
        self
    }

    /// Placeholder/value pairs as query text. Strings are used verbatim,
    /// other scalars with their JSON rendering.
    pub fn replacement_pairs(&self) -> Vec<(&str, String)> {
        self.replacements
            .iter()
            .map(|(placeholder, value)| (placeholder.as_str(), replacement_text(value)))
            .collect()
    }
}

fn replacement_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// The `qanary-test-definition.json` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestDefinition {
    pub qanary: QanaryConfig,
    #[serde(rename = "validation-sparql-templates")]
    pub validators: Vec<String>,
    #[serde(rename = "custom-validation", default)]
    pub custom_validation: Option<String>,
    pub tests: Vec<TestCase>,
}

impl TestDefinition {
    pub fn from_json(raw: &str) -> EvaluationResult<Self> {
        let definition: Self = serde_json::from_str(raw).map_err(|e| {
            EvaluationError::configuration(format!("invalid test definition: {}", e))
        })?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn load(directory: &Path) -> EvaluationResult<Self> {
        let path = directory.join(TEST_DEFINITION_FILE);
        let raw = fs::read_to_string(&path).map_err(|e| {
            EvaluationError::configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        let definition = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            validators = definition.validators.len(),
            tests = definition.tests.len(),
            custom_validation = definition.custom_validation.as_deref().unwrap_or("<none>"),
            "loaded test definition"
        );
        Ok(definition)
    }

    pub fn validate(&self) -> EvaluationResult<()> {
        self.qanary
            .validate()
            .map_err(|msg| EvaluationError::configuration(format!("qanary: {}", msg)))?;

        if self.validators.is_empty() {
            return Err(EvaluationError::configuration(
                "validation-sparql-templates must name at least one template",
            ));
        }

        if self.tests.is_empty() {
            return Err(EvaluationError::configuration(
                "tests must contain at least one test case",
            ));
        }

        for (nr, test) in self.tests.iter().enumerate() {
            if test.question.trim().is_empty() {
                return Err(EvaluationError::configuration(format!(
                    "test {} has an empty question",
                    nr
                )));
            }

            if let Some((placeholder, _)) = test
                .replacements
                .iter()
                .find(|(_, value)| value.is_array() || value.is_object())
            {
                return Err(EvaluationError::configuration(format!(
                    "replacement '{}' of test {} must be a scalar value",
                    placeholder, nr
                )));
            }
        }

        Ok(())
    }

    /// Human readable configuration dump printed at the start of a run.
    pub fn describe(&self) -> String {
        let mut text = String::from("current configuration:\n");
        text.push_str(&format!("    qanary system: {}\n", self.qanary.system_url));
        text.push_str(&format!("    components: {:?}\n", self.qanary.componentlist));
        text.push_str(&format!(
            "    {} validation SPARQL templates: {:?}\n",
            self.validators.len(),
            self.validators
        ));
        text.push_str(&format!(
            "    custom module containing validation method: {}\n",
            self.custom_validation.as_deref().unwrap_or("None")
        ));
        text.push_str(&format!("    {} test questions:\n", self.tests.len()));
        for test in &self.tests {
            text.push_str(&format!("        {}\n", test.question));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"{
        "qanary": {
            "system_url": "http://localhost:8080/startquestionansweringwithtextquestion",
            "componentlist": ["NED-DBpediaSpotlight", "QueryBuilder"],
            "qanary_triplestore_endpoint": "http://localhost:5820",
            "qanary_triplestore_username": "admin",
            "qanary_triplestore_password": "admin",
            "qanary_triplestore_database": "qanary"
        },
        "validation-sparql-templates": ["annotation-exists.rq", "answer-correct.rq"],
        "tests": [
            {"question": "What is the capital of Germany?", "replacements": {"<RESOURCE>": "dbr:Berlin", "<COUNT>": 1}},
            {"question": "Who wrote Faust?"}
        ]
    }"#;

    #[test]
    fn test_parse_definition() {
        let definition = TestDefinition::from_json(DEFINITION).unwrap();

        assert_eq!(
            definition.validators,
            vec!["annotation-exists.rq", "answer-correct.rq"]
        );
        assert_eq!(definition.custom_validation, None);
        assert_eq!(definition.tests.len(), 2);
        assert!(definition.tests[1].replacements.is_empty());
        assert_eq!(definition.qanary.componentlist.len(), 2);
    }

    #[test]
    fn test_replacement_pairs_render_scalars() {
        let definition = TestDefinition::from_json(DEFINITION).unwrap();
        let pairs = definition.tests[0].replacement_pairs();

        assert_eq!(
            pairs,
            vec![
                ("<RESOURCE>", "dbr:Berlin".to_string()),
                ("<COUNT>", "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_tests_key_is_configuration_error() {
        let raw = r#"{
            "qanary": {"system_url": "http://localhost:8080", "qanary_triplestore_database": "qanary"},
            "validation-sparql-templates": ["a.rq"]
        }"#;
        assert!(matches!(
            TestDefinition::from_json(raw),
            Err(EvaluationError::Configuration { .. })
        ));
    }

    #[test]
    fn test_empty_validator_list_is_rejected() {
        let raw = r#"{
            "qanary": {"system_url": "http://localhost:8080", "qanary_triplestore_database": "qanary"},
            "validation-sparql-templates": [],
            "tests": [{"question": "Q1"}]
        }"#;
        let err = TestDefinition::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("at least one template"));
    }

    #[test]
    fn test_structured_replacement_is_rejected() {
        let raw = r#"{
            "qanary": {"system_url": "http://localhost:8080", "qanary_triplestore_database": "qanary"},
            "validation-sparql-templates": ["a.rq"],
            "tests": [{"question": "Q1", "replacements": {"<X>": [1, 2]}}]
        }"#;
        let err = TestDefinition::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("'<X>'"));
    }

    #[test]
    fn test_load_reads_definition_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TEST_DEFINITION_FILE), DEFINITION).unwrap();

        let definition = TestDefinition::load(dir.path()).unwrap();
        assert_eq!(definition.tests[0].question, "What is the capital of Germany?");
        assert!(definition.describe().contains("2 validation SPARQL templates"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TestDefinition::load(dir.path()),
            Err(EvaluationError::Configuration { .. })
        ));
    }
}
