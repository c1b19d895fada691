//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for embedding backends
//! - An OpenAI-compatible HTTP backend
//! - Batched embedding with cooperative pauses for index builds

mod http_backend;

pub use http_backend::*;

use crate::error::{Error, Result};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::time::Duration;
use tracing::{debug, info};

/// Scale a vector to unit length; zero vectors are returned unchanged
pub fn normalize_embedding(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding(self.model_name(), "backend returned no vector"))
    }

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Batching options for [`embed_in_batches`]
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub pause: Duration,
}

/// Embed texts in fixed-size batches, pausing between batches.
///
/// Any failing batch aborts the whole run with an error naming the batch
/// (1-based) and the model. Returned vectors are L2-normalised.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    options: BatchOptions,
    progress: Option<&ProgressBar>,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = options.batch_size.max(1);
    let total_batches = texts.len().div_ceil(batch_size);
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for (i, chunk) in texts.chunks(batch_size).enumerate() {
        let batch = i + 1;
        debug!(batch, total_batches, size = chunk.len(), "Embedding batch");

        let embeddings = embedder
            .embed(chunk.to_vec())
            .await
            .map_err(|e| batch_error(embedder.model_name(), batch, total_batches, e))?;

        if embeddings.len() != chunk.len() {
            return Err(batch_error(
                embedder.model_name(),
                batch,
                total_batches,
                Error::DataValidation(format!(
                    "expected {} vectors, got {}",
                    chunk.len(),
                    embeddings.len()
                )),
            ));
        }

        all_embeddings.extend(embeddings.iter().map(|v| normalize_embedding(v)));

        if let Some(pb) = progress {
            pb.inc(chunk.len() as u64);
        }

        if batch < total_batches && !options.pause.is_zero() {
            tokio::time::sleep(options.pause).await;
        }
    }

    info!(
        vectors = all_embeddings.len(),
        batches = total_batches,
        model = embedder.model_name(),
        "Generated embeddings"
    );
    Ok(all_embeddings)
}

fn batch_error(model: &str, batch: usize, total: usize, source: Error) -> Error {
    let message = match source {
        Error::EmbeddingGeneration { message, .. } => message,
        other => other.to_string(),
    };
    Error::EmbeddingGeneration {
        message,
        model: model.to_string(),
        batch: format!("{}/{}", batch, total),
    }
}
