use crate::config::TestCase;
use crate::error::{EvaluationError, EvaluationResult};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Marker replaced by the IRI of the result graph.
pub const GRAPH_ID_PLACEHOLDER: &str = "<GRAPHID>";

const BOOLEAN_QUERY_KEYWORD: &str = "ASK";

/// A validated boolean query skeleton, loaded once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorTemplate {
    name: String,
    text: String,
}

impl ValidatorTemplate {
    pub fn parse(name: impl Into<String>, text: impl Into<String>) -> EvaluationResult<Self> {
        let name = name.into();
        let text = text.into();
        check_template(&name, &text)?;
        Ok(Self { name, text })
    }

    pub fn load(directory: &Path, name: &str) -> EvaluationResult<Self> {
        let path = directory.join(name);
        let text = fs::read_to_string(&path).map_err(|e| {
            EvaluationError::configuration(format!(
                "failed to read validator template {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(name, text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Fills in the graph IRI and the test's replacements.
    ///
    /// Replacement values are inserted as plain text without any escaping, so
    /// a value can change the structure of the query. Test definitions are
    /// trusted input.
    pub fn render(&self, graph_id: &str, test: &TestCase) -> String {
        let mut query = self
            .text
            .replace(GRAPH_ID_PLACEHOLDER, &format!("<{}>", graph_id));

        for (placeholder, value) in test.replacement_pairs() {
            debug!(template = %self.name, placeholder, value = %value, "replace");
            query = query.replace(placeholder, &value);
        }

        query
    }
}

fn check_template(name: &str, text: &str) -> EvaluationResult<()> {
    if !text.contains(GRAPH_ID_PLACEHOLDER) {
        return Err(EvaluationError::TemplateFormat {
            template: name.to_string(),
            reason: format!("does NOT contain the placeholder '{}'", GRAPH_ID_PLACEHOLDER),
        });
    }

    if !text.to_uppercase().contains(BOOLEAN_QUERY_KEYWORD) {
        return Err(EvaluationError::TemplateFormat {
            template: name.to_string(),
            reason: format!(
                "seems NOT to be an {} query (the string '{}' is not contained)",
                BOOLEAN_QUERY_KEYWORD, BOOLEAN_QUERY_KEYWORD
            ),
        });
    }

    Ok(())
}

/// Checks a template and renders it in one step.
pub fn render(template_text: &str, graph_id: &str, test: &TestCase) -> EvaluationResult<String> {
    let template = ValidatorTemplate::parse("<inline>", template_text)?;
    Ok(template.render(graph_id, test))
}

/// Loads every configured template, failing on the first invalid one.
pub fn load_templates(directory: &Path, names: &[String]) -> EvaluationResult<Vec<ValidatorTemplate>> {
    let templates = names
        .iter()
        .map(|name| ValidatorTemplate::load(directory, name))
        .collect::<EvaluationResult<Vec<_>>>()?;

    info!(
        directory = %directory.display(),
        count = templates.len(),
        "validator templates loaded"
    );
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "PREFIX qa: <http://www.wdaqua.eu/qa#>\n\
        ASK FROM <GRAPHID> { ?a a qa:AnnotationOfInstance ; qa:hasBody <RESOURCE> . }";

    #[test]
    fn test_render_wraps_graph_and_substitutes() {
        let test = TestCase::new("Q1").with_replacement("<RESOURCE>", "dbr:Berlin");
        let query = render(TEMPLATE, "urn:graph:g1", &test).unwrap();

        assert!(query.contains("ASK FROM <urn:graph:g1>"));
        assert!(query.contains("qa:hasBody dbr:Berlin"));
        assert!(!query.contains(GRAPH_ID_PLACEHOLDER));
        assert!(!query.contains("<RESOURCE>"));
    }

    #[test]
    fn test_replacements_apply_in_document_order() {
        let test: TestCase = serde_json::from_str(
            r#"{"question": "Q1", "replacements": {"<Z>": "1", "<A>": "<Z>"}}"#,
        )
        .unwrap();
        let keys: Vec<&str> = test.replacements.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["<Z>", "<A>"]);

        let query = render("ASK FROM <GRAPHID> { <A> ?p ?o }", "g1", &test).unwrap();
        assert_eq!(query, "ASK FROM <g1> { <Z> ?p ?o }");
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let template = ValidatorTemplate::parse(
            "twice.rq",
            "ASK { GRAPH <GRAPHID> { <X> ?p ?o } GRAPH <GRAPHID> { ?s ?p <X> } }",
        )
        .unwrap();
        let test = TestCase::new("Q1").with_replacement("<X>", 42);
        let query = template.render("g1", &test);

        assert_eq!(query, "ASK { GRAPH <g1> { 42 ?p ?o } GRAPH <g1> { ?s ?p 42 } }");
    }

    #[test]
    fn test_unknown_placeholder_is_a_no_op() {
        let test = TestCase::new("Q1").with_replacement("<NOT_THERE>", "value");
        let query = render("ask from <GRAPHID> {}", "g1", &test).unwrap();
        assert_eq!(query, "ask from <g1> {}");
    }

    #[test]
    fn test_missing_graph_marker_is_rejected() {
        for text in ["ASK { ?s ?p ?o }", "ASK FROM <GRAPH> {}", ""] {
            let err = render(text, "g1", &TestCase::new("Q1")).unwrap_err();
            assert!(matches!(err, EvaluationError::TemplateFormat { .. }), "{}", text);
        }
    }

    #[test]
    fn test_non_boolean_query_is_rejected() {
        let err = ValidatorTemplate::parse("select.rq", "SELECT * FROM <GRAPHID> WHERE { ?s ?p ?o }")
            .unwrap_err();
        match err {
            EvaluationError::TemplateFormat { template, reason } => {
                assert_eq!(template, "select.rq");
                assert!(reason.contains("ASK"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_keyword_check_is_case_insensitive() {
        assert!(ValidatorTemplate::parse("lower.rq", "ask from <GRAPHID> { }").is_ok());
    }

    #[test]
    fn test_load_templates_keeps_configured_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.rq"), "ASK FROM <GRAPHID> { ?s ?p ?o }").unwrap();
        fs::write(dir.path().join("a.rq"), "ASK FROM <GRAPHID> { ?s a ?o }").unwrap();

        let names = vec!["b.rq".to_string(), "a.rq".to_string()];
        let templates = load_templates(dir.path(), &names).unwrap();
        let loaded: Vec<&str> = templates.iter().map(|t| t.name()).collect();
        assert_eq!(loaded, vec!["b.rq", "a.rq"]);
    }

    #[test]
    fn test_load_templates_fails_on_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.rq"), "ASK FROM <GRAPHID> {}").unwrap();
        fs::write(dir.path().join("broken.rq"), "ASK {}").unwrap();

        let names = vec!["ok.rq".to_string(), "broken.rq".to_string()];
        assert!(matches!(
            load_templates(dir.path(), &names),
            Err(EvaluationError::TemplateFormat { template, .. }) if template == "broken.rq"
        ));
    }

    #[test]
    fn test_load_templates_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let names = vec!["missing.rq".to_string()];
        assert!(matches!(
            load_templates(dir.path(), &names),
            Err(EvaluationError::Configuration { .. })
        ));
    }
}
