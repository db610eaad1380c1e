use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::StoreCredentials;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Connection parameters for a Qanary system and its triplestore.
///
/// Field names follow the `qanary` object of the test definition document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QanaryConfig {
    pub system_url: String,
    #[serde(default)]
    pub componentlist: Vec<String>,
    #[serde(default)]
    pub qanary_triplestore_endpoint: String,
    #[serde(default)]
    pub qanary_triplestore_username: String,
    #[serde(default)]
    pub qanary_triplestore_password: String,
    pub qanary_triplestore_database: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QanaryConfig {
    fn default() -> Self {
        Self {
            system_url: "http://localhost:8080/startquestionansweringwithtextquestion"
                .to_string(),
            componentlist: Vec::new(),
            qanary_triplestore_endpoint: "http://localhost:5820".to_string(),
            qanary_triplestore_username: "admin".to_string(),
            qanary_triplestore_password: "admin".to_string(),
            qanary_triplestore_database: "qanary".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl QanaryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_url(mut self, system_url: impl Into<String>) -> Self {
        self.system_url = system_url.into();
        self
    }

    pub fn with_components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.componentlist = components.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_triplestore_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.qanary_triplestore_endpoint = endpoint.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.qanary_triplestore_username = username.into();
        self.qanary_triplestore_password = password.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.qanary_triplestore_database = database.into();
        self
    }

    /// Partial seconds round up.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Credential bundle used for every store connection of a run.
    pub fn credentials(&self) -> StoreCredentials {
        StoreCredentials {
            username: self.qanary_triplestore_username.clone(),
            password: self.qanary_triplestore_password.clone(),
            database: self.qanary_triplestore_database.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.system_url.is_empty() {
            return Err("System URL cannot be empty".to_string());
        }

        if !self.system_url.starts_with("http://") && !self.system_url.starts_with("https://") {
            return Err("System URL must start with http:// or https://".to_string());
        }

        if self.qanary_triplestore_database.is_empty() {
            return Err("Triplestore database cannot be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_timeout_rounds_partial_seconds_up() {
        let config = QanaryConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout_secs, 1);
        assert!(config.validate().is_ok());

        let config = QanaryConfig::default().with_timeout(Duration::from_millis(2500));
        assert_eq!(config.timeout(), Duration::from_secs(3));

        let config = QanaryConfig::default().with_timeout(Duration::from_secs(10));
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_default_config() {
        let config = QanaryConfig::default();
        assert_eq!(config.qanary_triplestore_database, "qanary");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = QanaryConfig::new()
            .with_system_url("https://qa.example.com/startquestionansweringwithtextquestion")
            .with_components(["NED-DBpediaSpotlight", "QueryBuilder"])
            .with_credentials("reader", "secret")
            .with_database("results")
            .with_timeout(Duration::from_secs(10));

        assert_eq!(config.componentlist, vec!["NED-DBpediaSpotlight", "QueryBuilder"]);
        assert_eq!(config.timeout_secs, 10);

        let credentials = config.credentials();
        assert_eq!(credentials.username, "reader");
        assert_eq!(credentials.password, "secret");
        assert_eq!(credentials.database, "results");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = QanaryConfig::default();

        config.system_url = "".to_string();
        assert!(config.validate().is_err());

        config.system_url = "localhost:8080".to_string();
        assert!(config.validate().is_err());

        config.system_url = "http://localhost:8080".to_string();
        config.qanary_triplestore_database = "".to_string();
        assert!(config.validate().is_err());

        config.qanary_triplestore_database = "qanary".to_string();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_document_keys() {
        let raw = r#"{
            "system_url": "http://localhost:8080/startquestionansweringwithtextquestion",
            "componentlist": ["A", "B"],
            "qanary_triplestore_endpoint": "http://localhost:5820",
            "qanary_triplestore_username": "admin",
            "qanary_triplestore_password": "admin",
            "qanary_triplestore_database": "qanary"
        }"#;

        let config: QanaryConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.componentlist, vec!["A", "B"]);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
