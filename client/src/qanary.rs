use crate::config::QanaryConfig;
use crate::provider::{map_transport_error, AnsweringSystem, ClientError, ClientResult};
use crate::types::{AnsweringResult, QuestionRequest};
use async_trait::async_trait;
use tracing::info;

/// HTTP client for the Qanary `startquestionansweringwithtextquestion` endpoint.
pub struct QanaryProvider {
    http_client: reqwest::Client,
    system_url: String,
}

impl QanaryProvider {
    pub fn new(config: &QanaryConfig) -> ClientResult<Self> {
        config
            .validate()
            .map_err(|msg| ClientError::InvalidConfig { message: msg })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            system_url: config.system_url.clone(),
        })
    }

    pub fn system_url(&self) -> &str {
        &self.system_url
    }

    /// Shell command reproducing the request, for the run log.
    pub fn to_curl(&self, request: &QuestionRequest) -> String {
        let mut command = String::from("curl -X POST");
        for (key, value) in request.form_pairs() {
            command.push_str(&format!(
                " --data-urlencode '{}={}'",
                key,
                value.replace('\'', "'\\''")
            ));
        }
        command.push_str(&format!(" '{}'", self.system_url));
        command
    }

    fn parse_response(body: &str) -> ClientResult<AnsweringResult> {
        serde_json::from_str(body).map_err(|e| ClientError::MalformedResponse {
            message: format!("expected an object with 'outGraph' and 'endpoint': {}", e),
        })
    }
}

#[async_trait]
impl AnsweringSystem for QanaryProvider {
    async fn ask_question(&self, request: &QuestionRequest) -> ClientResult<AnsweringResult> {
        info!(
            question = %request.question,
            components = ?request.componentlist,
            "request parameter for Qanary system"
        );
        info!(curl = %self.to_curl(request), "request as curl");

        let http_response = self
            .http_client
            .post(&self.system_url)
            .form(&request.form_pairs())
            .send()
            .await
            .map_err(|e| map_transport_error(e, "Qanary system"))?;

        let status = http_response.status();
        let body = http_response.text().await.map_err(ClientError::Network)?;
        info!(status = status.as_u16(), "HTTP response from Qanary system");

        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let result = Self::parse_response(&body)?;
        info!(
            out_graph = %result.out_graph,
            endpoint = %result.endpoint,
            "response of Qanary system"
        );

        Ok(result)
    }

    fn system_name(&self) -> &'static str {
        "qanary"
    }
}
