use crate::provider::{
    map_transport_error, ClientError, ClientResult, StoreConnection, StoreConnector,
};
use crate::types::{AskResponse, StoreCredentials};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Opens SPARQL protocol connections against Stardog-style servers,
/// where each database answers queries at `{endpoint}/{database}/query`.
pub struct HttpStoreConnector {
    timeout: Duration,
}

impl HttpStoreConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl StoreConnector for HttpStoreConnector {
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &StoreCredentials,
    ) -> ClientResult<Box<dyn StoreConnection>> {
        let connection = HttpStoreConnection::new(endpoint, credentials.clone(), self.timeout)?;
        debug!(
            endpoint = %endpoint,
            database = %credentials.database,
            "opened triplestore connection"
        );
        Ok(Box::new(connection))
    }
}

pub struct HttpStoreConnection {
    http_client: reqwest::Client,
    endpoint: String,
    query_url: String,
    credentials: StoreCredentials,
}

impl HttpStoreConnection {
    pub fn new(
        endpoint: &str,
        credentials: StoreCredentials,
        timeout: Duration,
    ) -> ClientResult<Self> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ClientError::InvalidConfig {
                message: format!("Triplestore endpoint must be an http(s) URL: '{}'", endpoint),
            });
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        let query_url = Self::query_url(endpoint, &credentials.database);

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
            query_url,
            credentials,
        })
    }

    fn query_url(endpoint: &str, database: &str) -> String {
        format!("{}/{}/query", endpoint.trim_end_matches('/'), database)
    }

    fn parse_response(body: &str) -> ClientResult<bool> {
        let response: AskResponse =
            serde_json::from_str(body).map_err(|e| ClientError::MalformedResponse {
                message: format!("expected a boolean SPARQL result: {}", e),
            })?;
        Ok(response.boolean)
    }
}

#[async_trait]
impl StoreConnection for HttpStoreConnection {
    async fn ask(&self, query: &str) -> ClientResult<bool> {
        let http_response = self
            .http_client
            .post(&self.query_url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await
            .map_err(|e| map_transport_error(e, "triplestore"))?;

        let status = http_response.status();
        let body = http_response.text().await.map_err(ClientError::Network)?;

        if !status.is_success() {
            return Err(ClientError::QueryFailed {
                message: format!("triplestore returned {}: {}", status, body),
            });
        }

        Self::parse_response(&body)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn credentials() -> StoreCredentials {
        StoreCredentials {
            username: "admin".to_string(),
            password: "admin".to_string(),
            database: "qanary".to_string(),
        }
    }

    #[test]
    fn test_query_url_joins_database() {
        assert_eq!(
            HttpStoreConnection::query_url("http://localhost:5820/", "qanary"),
            "http://localhost:5820/qanary/query"
        );
        assert_eq!(
            HttpStoreConnection::query_url("http://localhost:5820", "qanary"),
            "http://localhost:5820/qanary/query"
        );
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let result = HttpStoreConnection::new("ftp://store", credentials(), Duration::from_secs(5));
        assert!(matches!(result, Err(ClientError::InvalidConfig { .. })));
    }

    #[test]
    fn test_parse_boolean_result() {
        assert!(HttpStoreConnection::parse_response(r#"{"head": {}, "boolean": true}"#).unwrap());
        assert!(!HttpStoreConnection::parse_response(r#"{"boolean": false}"#).unwrap());
        assert!(matches!(
            HttpStoreConnection::parse_response(r#"{"results": {"bindings": []}}"#),
            Err(ClientError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_ask_sends_query_with_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/qanary/query")
            // admin:admin
            .match_header("authorization", "Basic YWRtaW46YWRtaW4=")
            .match_header("accept", SPARQL_RESULTS_JSON)
            .match_body(Matcher::UrlEncoded(
                "query".into(),
                "ASK FROM <urn:g1> { ?s ?p ?o }".into(),
            ))
            .with_status(200)
            .with_body(r#"{"head": {}, "boolean": true}"#)
            .create_async()
            .await;

        let connector = HttpStoreConnector::new(Duration::from_secs(5));
        let connection = connector.connect(&server.url(), &credentials()).await.unwrap();
        let result = connection.ask("ASK FROM <urn:g1> { ?s ?p ?o }").await.unwrap();

        assert!(result);
        assert_eq!(connection.endpoint(), server.url());
    }

    #[tokio::test]
    async fn test_ask_reports_query_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/qanary/query")
            .with_status(400)
            .with_body("SPARQL parse error")
            .create_async()
            .await;

        let connector = HttpStoreConnector::new(Duration::from_secs(5));
        let connection = connector.connect(&server.url(), &credentials()).await.unwrap();
        let result = connection.ask("ASK {").await;

        match result {
            Err(ClientError::QueryFailed { message }) => {
                assert!(message.contains("SPARQL parse error"));
            }
            other => panic!("expected QueryFailed, got {:?}", other.map(|_| ())),
        }
    }
}
