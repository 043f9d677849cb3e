//! Embedding generation for the semantic claim store.
//!
//! OpenAI ada-002 vectors, 1536 dimensions. The dimension is a crate-wide
//! constant; every vector column and every similarity query assumes it.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use llm_client::LlmClient;

use super::traits::BaseEmbeddingService;

/// Dimension of every embedding in the system.
pub const EMBEDDING_DIM: usize = 1536;

const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// OpenAI-backed embedding service.
#[derive(Clone)]
pub struct EmbeddingService {
    client: Arc<LlmClient>,
}

impl EmbeddingService {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BaseEmbeddingService for EmbeddingService {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            bail!("cannot generate embedding for empty text");
        }

        let embedding = self
            .client
            .create_embedding(text, EMBEDDING_MODEL)
            .await
            .context("embedding request failed")?;

        if embedding.len() != EMBEDDING_DIM {
            bail!(
                "unexpected embedding dimension: {} (expected {})",
                embedding.len(),
                EMBEDDING_DIM
            );
        }

        Ok(embedding)
    }
}

/// Cosine similarity between two vectors.
///
/// pgvector computes this natively in SQL; this is for in-process checks
/// and tests.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![0.3_f32, -0.5, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_yields_zero() {
        let a = vec![0.0_f32; 4];
        let b = vec![1.0_f32; 4];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn mismatched_dimensions_yield_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
