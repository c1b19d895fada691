use super::LanguageModel;
use crate::config::LlmConfig;
use crate::embedding_backend::parse_base_url;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client.
///
/// Requests are not retried; callers own the fallback policy.
pub struct HttpLanguageModel {
    client: Client,
    endpoint: Url,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl HttpLanguageModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let endpoint = parse_base_url(&config.base_url)?
            .join("chat/completions")
            .map_err(|e| Error::Config(format!("Invalid language model URL: {}", e)))?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key(),
        })
    }

    fn failure(&self, message: impl Into<String>) -> Error {
        Error::LlmGeneration {
            message: message.into(),
            model: self.model.clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(Error::RateLimitExceeded { retry_after_secs });
        }

        let response = response
            .error_for_status()
            .map_err(|e| self.failure(e.to_string()))?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.failure(format!("malformed completion: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.failure("completion contained no message content"))?;

        debug!(model = %self.model, chars = content.len(), "Received completion");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> LlmConfig {
        LlmConfig {
            model: "gpt-4o".to_string(),
            base_url: format!("{}/v1", server.uri()),
            api_key_env: String::new(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_complete_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "What is Revlon?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "A sale-of-control duty."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let llm = HttpLanguageModel::new(&config(&server)).unwrap();
        let reply = llm.complete("be brief", "What is Revlon?").await.unwrap();
        assert_eq!(reply, "A sale-of-control duty.");
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "17"))
            .expect(1)
            .mount(&server)
            .await;

        let llm = HttpLanguageModel::new(&config(&server)).unwrap();
        let err = llm.complete("s", "u").await.unwrap_err();
        assert!(matches!(
            err,
            Error::RateLimitExceeded {
                retry_after_secs: Some(17)
            }
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let llm = HttpLanguageModel::new(&config(&server)).unwrap();
        let err = llm.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, Error::LlmGeneration { .. }));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let llm = HttpLanguageModel::new(&config(&server)).unwrap();
        assert!(llm.complete("s", "u").await.is_err());
    }
}
