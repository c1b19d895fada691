use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct EmbedTextRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    Data { data: Vec<EmbeddingData> },
    Embeddings { embeddings: Vec<Vec<f32>> },
    Vectors { vectors: Vec<Vec<f32>> },
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl EmbeddingResponse {
    fn into_embeddings(self) -> Vec<Vec<f32>> {
        match self {
            EmbeddingResponse::Embeddings { embeddings } => embeddings,
            EmbeddingResponse::Vectors { vectors } => vectors,
            EmbeddingResponse::Data { mut data } => {
                // OpenAI documents `index` but does not promise ordering.
                if data.iter().all(|d| d.index.is_some()) {
                    data.sort_by_key(|d| d.index);
                }
                data.into_iter().map(|d| d.embedding).collect()
            }
        }
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint
pub struct EmbeddingBackendClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    retries: usize,
}

impl EmbeddingBackendClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key(),
            retries: config.max_retries,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid embedding backend URL: {}", e)))
    }

    async fn send_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        model: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.retries {
            let req = request
                .try_clone()
                .ok_or_else(|| Error::embedding(model, "Failed to clone backend request"))?;
            match req.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => {
                        return ok
                            .json::<T>()
                            .await
                            .map_err(|e| Error::embedding(model, e.to_string()))
                    }
                    Err(e) => last_err = Some(Error::embedding(model, e.to_string())),
                },
                Err(e) => last_err = Some(Error::embedding(model, e.to_string())),
            }

            if attempt < self.retries {
                warn!(attempt = attempt + 1, "Embedding request failed, retrying");
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::embedding(model, "Embedding backend request failed")))
    }

    pub async fn embed_text(&self, model: &str, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint("embeddings")?;
        let body = EmbedTextRequest { model, input };
        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let parsed: EmbeddingResponse = self.send_with_retry(model, request).await?;
        Ok(parsed.into_embeddings())
    }
}

/// Parse a base URL so that relative endpoint joins keep its path
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let mut base = raw.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_keeps_version_path() {
        let base = parse_base_url("https://api.openai.com/v1").unwrap();
        assert_eq!(
            base.join("embeddings").unwrap().as_str(),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn test_response_shapes() {
        let data: EmbeddingResponse = serde_json::from_str(
            r#"{"data": [{"embedding": [0.5], "index": 1}, {"embedding": [0.25], "index": 0}]}"#,
        )
        .unwrap();
        assert_eq!(data.into_embeddings(), vec![vec![0.25], vec![0.5]]);

        let plain: EmbeddingResponse =
            serde_json::from_str(r#"{"embeddings": [[1.0, 2.0]]}"#).unwrap();
        assert_eq!(plain.into_embeddings(), vec![vec![1.0, 2.0]]);

        let vectors: EmbeddingResponse = serde_json::from_str(r#"{"vectors": [[3.0]]}"#).unwrap();
        assert_eq!(vectors.into_embeddings(), vec![vec![3.0]]);
    }
}
