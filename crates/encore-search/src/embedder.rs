//! Text embedding providers.
//!
//! The [`Embedder`] trait is the seam between the vector index and
//! whichever model turns text into vectors. [`OpenAiEmbedder`] talks to
//! any service implementing the OpenAI `/embeddings` API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

const PROVIDER: &str = "OpenAI";

/// Default OpenAI-compatible API base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync + fmt::Debug {
    /// Embed one text.
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>>;

    /// Embed many texts in one call. The output is in input order.
    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Embedding client for the OpenAI embeddings API.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbedder {
    /// Create a client. Fails when `api_key` is empty.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> ProviderResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey {
                provider: PROVIDER.to_string(),
            });
        }

        let http = Client::builder()
            .user_agent(concat!("encore/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    async fn request(&self, input: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        log::debug!("Embedding {} text(s) with {}", input.len(), self.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input,
            })
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                provider: PROVIDER.to_string(),
            });
        }

        let response = response.error_for_status().map_err(|e| ProviderError::Http {
            provider: PROVIDER.to_string(),
            message: e.to_string(),
        })?;

        let body: EmbeddingResponse = response.json().await.map_err(|e| ProviderError::Parse {
            provider: PROVIDER.to_string(),
            message: e.to_string(),
        })?;

        ordered_vectors(body, input.len())
    }
}

/// Vectors from `body` in request order.
///
/// The API may return entries out of order; each carries the index of the
/// input it belongs to.
fn ordered_vectors(body: EmbeddingResponse, expected: usize) -> ProviderResult<Vec<Vec<f32>>> {
    let mut data = body.data;
    if data.len() != expected {
        return Err(ProviderError::CountMismatch {
            provider: PROVIDER.to_string(),
            expected,
            got: data.len(),
        });
    }
    data.sort_by_key(|d| d.index);

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| ProviderError::EmptyResponse {
            provider: PROVIDER.to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}
