//! Remote embedding generator over an OpenAI-compatible HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{Embedding, EmbeddingError, EmbeddingProvider};

/// Configuration for the remote embedder.
#[derive(Debug, Clone)]
pub struct RemoteEmbedderConfig {
    pub api_key: String,
    /// Model to use (default: text-embedding-3-small).
    pub model: String,
    /// Base URL (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Expected vector dimension (default: 1536).
    pub dimension: usize,
}

impl RemoteEmbedderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimension: 1536,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

/// Embedding provider backed by a remote HTTP service.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    config: RemoteEmbedderConfig,
}

impl RemoteEmbedder {
    pub fn new(config: RemoteEmbedderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self::new(RemoteEmbedderConfig::new(api_key))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Unavailable("empty response".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbeddingRequest {
            input: texts.iter().map(|t| t.to_string()).collect(),
            model: self.config.model.clone(),
        };

        let url = format!("{}/embeddings", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EmbeddingError::Unavailable(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Unavailable(format!("parse error: {}", e)))?;

        debug!(count = parsed.data.len(), "generated embeddings");

        Ok(parsed
            .data
            .into_iter()
            .map(|d| Embedding::new(d.embedding))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RemoteEmbedderConfig::new("test-key");
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.dimension, 1536);
    }

    #[test]
    fn test_config_builder() {
        let config = RemoteEmbedderConfig::new("key")
            .with_model("text-embedding-3-large")
            .with_dimension(3072)
            .with_base_url("https://custom.example.com/v1");
        assert_eq!(config.model, "text-embedding-3-large");
        assert_eq!(config.dimension, 3072);
        assert_eq!(config.base_url, "https://custom.example.com/v1");
    }

    #[test]
    fn test_provider_metadata() {
        let provider = RemoteEmbedder::from_api_key("test-key");
        assert_eq!(provider.dimension(), 1536);
        assert_eq!(provider.model_id(), "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_embed_batch_empty_input() {
        let provider = RemoteEmbedder::from_api_key("test-key");
        let result = provider.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_maps_to_unavailable() {
        let config = RemoteEmbedderConfig::new("key").with_base_url("http://127.0.0.1:1");
        let provider = RemoteEmbedder::new(config);
        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Unavailable(_)));
    }
}
