//! Hosted inference backend.
//!
//! Calls the Hugging Face inference endpoint for the configured model over
//! HTTPS using reqwest.

use crate::config::Config;
use crate::model::{GenerationParams, ModelError, SummaryModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!("mailsumma/", env!("CARGO_PKG_VERSION"));

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_length: usize,
    min_length: usize,
    num_beams: usize,
    length_penalty: f64,
    early_stopping: bool,
    do_sample: bool,
    truncation: &'static str,
}

impl From<&GenerationParams> for InferenceParameters {
    fn from(params: &GenerationParams) -> Self {
        Self {
            max_length: params.max_length,
            min_length: params.min_length,
            num_beams: params.num_beams,
            length_penalty: params.length_penalty,
            early_stopping: params.early_stopping,
            do_sample: params.do_sample,
            truncation: "only_first",
        }
    }
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
    use_cache: bool,
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

/// Summarisation through the hosted inference API
pub struct HostedModel {
    client: Client,
    name: String,
    url: String,
    token: String,
}

impl HostedModel {
    /// Build the HTTP client; fails when no API token is configured
    pub fn new(config: &Config) -> Result<Self, ModelError> {
        let token = config.api_token()?.to_string();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            name: config.model.name.clone(),
            url: endpoint_url(&config.model.endpoint, &config.model.name),
            token,
        })
    }
}

/// Join the endpoint base and the model name
fn endpoint_url(endpoint: &str, model: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), model.trim_start_matches('/'))
}

/// Pull the summary out of a successful response body
fn parse_summary(body: &str) -> Result<String, ModelError> {
    let items: Vec<SummaryItem> = serde_json::from_str(body)
        .map_err(|e| ModelError::Generation(format!("unexpected response: {}", e)))?;
    items
        .into_iter()
        .next()
        .map(|item| item.summary_text)
        .ok_or(ModelError::EmptyOutput)
}

/// Best-effort message from an error response body
fn parse_error(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl SummaryModel for HostedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String, ModelError> {
        let request = InferenceRequest {
            inputs: text,
            parameters: params.into(),
            options: InferenceOptions {
                wait_for_model: true,
                use_cache: false,
            },
        };

        tracing::debug!(url = %self.url, chars = text.chars().count(), "requesting hosted summary");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: parse_error(&body),
            });
        }

        parse_summary(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GENERATION;

    #[test]
    fn joins_endpoint_and_model() {
        assert_eq!(
            endpoint_url("https://example.test/models/", "/sshleifer/distilbart-cnn-12-6"),
            "https://example.test/models/sshleifer/distilbart-cnn-12-6"
        );
    }

    #[test]
    fn parses_summary_text() {
        let body = r#"[{"summary_text": " The meeting moved to Friday. "}]"#;
        assert_eq!(parse_summary(body).unwrap(), " The meeting moved to Friday. ");
    }

    #[test]
    fn empty_array_is_empty_output() {
        assert!(matches!(parse_summary("[]"), Err(ModelError::EmptyOutput)));
    }

    #[test]
    fn malformed_body_is_generation_error() {
        assert!(matches!(
            parse_summary(r#"{"unexpected": true}"#),
            Err(ModelError::Generation(_))
        ));
    }

    #[test]
    fn error_body_is_unwrapped() {
        assert_eq!(parse_error(r#"{"error": "Model is loading"}"#), "Model is loading");
        assert_eq!(parse_error("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn request_mirrors_generation_parameters() {
        let request = InferenceRequest {
            inputs: "text",
            parameters: (&GENERATION).into(),
            options: InferenceOptions {
                wait_for_model: true,
                use_cache: false,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["parameters"]["max_length"], 130);
        assert_eq!(json["parameters"]["min_length"], 30);
        assert_eq!(json["parameters"]["do_sample"], false);
    }

    #[test]
    fn new_requires_token() {
        let config = Config::default();
        assert!(matches!(HostedModel::new(&config), Err(ModelError::Config(_))));
    }
}
