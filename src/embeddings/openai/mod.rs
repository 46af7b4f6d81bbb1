#[cfg(test)]
mod tests;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::EmbeddingProvider;
use crate::config::Config;
use crate::http::{build_agent, endpoint, send_once};
use crate::{QaError, Result};

const EMBEDDINGS_PATH: &str = "v1/embeddings";

#[derive(Clone)]
pub struct OpenAiEmbeddings {
    base_url: Url,
    api_key: String,
    model: String,
    dimension: usize,
    batch_size: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl fmt::Debug for OpenAiEmbeddings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbeddings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbeddings {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .openai_url()
            .map_err(|e| QaError::Config(e.to_string()))?;

        Ok(Self {
            base_url,
            api_key: config.openai.api_key.clone(),
            model: config.openai.embedding_model.clone(),
            dimension: config.openai.embedding_dimension as usize,
            batch_size: config.openai.batch_size,
            agent: build_agent(Duration::from_secs(config.openai.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = endpoint(&self.base_url, EMBEDDINGS_PATH)?;
        let request_json = serde_json::to_string(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        })
        .map_err(|e| anyhow::anyhow!("Failed to serialize embedding request: {}", e))?;

        let response_text = send_once(&url, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let mut response: EmbeddingResponse = serde_json::from_str(&response_text)
            .map_err(|e| QaError::Upstream(format!("Failed to parse embedding response: {}", e)))?;

        if response.data.len() != texts.len() {
            return Err(QaError::Upstream(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|data| data.index);

        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(QaError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }
}

impl EmbeddingProvider for OpenAiEmbeddings {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        self.request_embeddings(&[text.to_string()])?
            .pop()
            .ok_or_else(|| QaError::Upstream("Embedding response was empty".to_string()))
    }

    /// Embed texts in batches of the configured size
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size.max(1) as usize) {
            vectors.extend(self.request_embeddings(chunk)?);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }
}
