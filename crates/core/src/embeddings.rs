use crate::error::{EmbeddingError, IngestError};
use crate::pool::WorkerPool;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

/// Synchronous text embedder. Implementations are CPU- or I/O-bound and must only be called
/// from the worker pool, never from an async task directly.
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Deterministic hashed character-trigram embedder; no model download required.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
    /// Inputs longer than this many characters are rejected.
    pub max_input_chars: Option<usize>,
}

impl CharacterNgramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            max_input_chars: None,
        }
    }
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if let Some(max) = self.max_input_chars {
            if chars.len() > max {
                return Err(EmbeddingError::InputTooLong {
                    len: chars.len(),
                    max,
                });
            }
        }

        let mut vector = vec![0f32; self.dimensions.max(1)];
        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// Uses the blocking reqwest client; the client is created lazily on the first call so it
/// is built on a worker thread rather than inside the async runtime.
#[derive(Debug)]
pub struct HttpEmbedder {
    config: HttpEmbedderConfig,
    client: OnceLock<Client>,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
        }
    }
}

impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let client = self.client.get_or_init(Client::new);
        let mut request = client.post(&self.config.endpoint).json(&EmbeddingRequest {
            input: text,
            model: self.config.model.as_deref(),
        });

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(EmbeddingError::Unavailable(format!(
                "embedding request to {} returned {}",
                self.config.endpoint,
                response.status()
            )));
        }

        let payload: EmbeddingResponse = response.json()?;
        first_embedding(payload, self.config.dimensions)
    }
}

/// Embeds a single text on the worker pool, wrapped in the `{"data":[{"embedding":..}]}` shape.
pub async fn embed_text(
    pool: &WorkerPool,
    embedder: Arc<dyn Embedder>,
    text: String,
) -> Result<EmbeddingResponse, IngestError> {
    if text.trim().is_empty() {
        return Err(IngestError::InvalidArgument("text must not be empty".to_string()));
    }

    let embedding = pool.run(move || embedder.encode(&text)).await??;
    Ok(EmbeddingResponse {
        data: vec![EmbeddingData { embedding }],
    })
}

fn first_embedding(payload: EmbeddingResponse, expected: usize) -> Result<Vec<f32>, EmbeddingError> {
    let embedding = payload
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .ok_or_else(|| EmbeddingError::Unavailable("embedding response had no data".to_string()))?;

    if embedding.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }

    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.encode("Hydraulic pressure and flow").unwrap();
        let second = embedder.encode("Hydraulic pressure and flow").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder::new(32);
        let vector = embedder.encode("abc").unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[test]
    fn overlong_input_is_rejected() {
        let embedder = CharacterNgramEmbedder {
            dimensions: 8,
            max_input_chars: Some(4),
        };
        assert!(matches!(
            embedder.encode("too long"),
            Err(EmbeddingError::InputTooLong { len: 8, max: 4 })
        ));
    }

    #[test]
    fn response_dimension_is_checked() {
        let payload: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2]}]}"#).unwrap();
        assert!(matches!(
            first_embedding(payload, 3),
            Err(EmbeddingError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn empty_response_is_unavailable() {
        let payload: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(matches!(
            first_embedding(payload, 3),
            Err(EmbeddingError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn embed_text_wraps_vector_in_data_envelope() {
        let pool = WorkerPool::new(1);
        let response = embed_text(&pool, Arc::new(CharacterNgramEmbedder::new(16)), "hello".to_string())
            .await
            .unwrap();

        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].embedding.len(), 16);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["data"][0]["embedding"].is_array());
    }

    #[tokio::test]
    async fn embed_text_rejects_blank_input() {
        let pool = WorkerPool::new(1);
        let result = embed_text(&pool, Arc::new(CharacterNgramEmbedder::default()), "  ".to_string()).await;
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
    }
}
