//! Pluggable embedding provider contract (spec §4.7).
//!
//! Model internals are out of scope; what matters here is the trait seam and
//! the Matryoshka-style truncation/normalization contract a provider must
//! honor. The shipped [`HashingEmbeddingProvider`] is a pure-Rust,
//! zero-download stand-in: deterministic, offline, good enough to exercise
//! the vector leg of recall fusion without committing the crate to an ONNX
//! runtime or a model download step.

use sha2::{Digest, Sha256};

use crate::error::{ContinuumError, Result};

/// Truncated, L2-normalized embedding width. Matches the teacher's
/// Matryoshka truncation target so downstream fusion math is unaffected by
/// which provider produced the vector.
pub const EMBEDDING_DIMENSIONS: usize = 256;

/// Maximum input length a provider is expected to accept without truncating
/// the text itself.
pub const MAX_TEXT_LENGTH: usize = 8192;

/// A provider of fixed-width, L2-normalized text embeddings.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Width of the vectors this provider returns.
    fn dimension(&self) -> usize;

    /// Short identifier surfaced in `/v1/stats`/doctor output, e.g. `"hashing"`.
    fn provider_name(&self) -> &str;
}

/// Truncates `vector` to [`EMBEDDING_DIMENSIONS`] (if longer) and
/// re-normalizes to unit length, exactly as a Matryoshka-trained model's
/// leading dimensions are valid on their own.
pub fn matryoshka_truncate(mut vector: Vec<f32>) -> Vec<f32> {
    if vector.len() > EMBEDDING_DIMENSIONS {
        vector.truncate(EMBEDDING_DIMENSIONS);
    }
    normalize(&mut vector);
    vector
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two equal-length vectors. Returns `0.0` on a
/// dimension mismatch rather than panicking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 { dot / denom } else { 0.0 }
}

/// Deterministic, offline embedding provider built from repeated SHA-256
/// hashing of sliding windows over the input. Not semantically meaningful in
/// the way a trained model is, but stable, collision-resistant enough for
/// recall re-ranking, and requires no network access or model cache.
#[derive(Debug, Clone, Default)]
pub struct HashingEmbeddingProvider;

impl HashingEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ContinuumError::Validation("cannot embed empty text".into()));
        }
        let text = if text.len() > MAX_TEXT_LENGTH { &text[..MAX_TEXT_LENGTH] } else { text };

        let mut vector = Vec::with_capacity(EMBEDDING_DIMENSIONS);
        let mut round: u32 = 0;
        while vector.len() < EMBEDDING_DIMENSIONS {
            let mut hasher = Sha256::new();
            hasher.update(round.to_le_bytes());
            hasher.update(text.as_bytes());
            let digest = hasher.finalize();
            for byte in digest.iter() {
                // Map a byte to roughly [-1, 1].
                vector.push((*byte as f32 - 128.0) / 128.0);
                if vector.len() == EMBEDDING_DIMENSIONS {
                    break;
                }
            }
            round += 1;
        }

        Ok(matryoshka_truncate(vector))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_deterministic() {
        let provider = HashingEmbeddingProvider::new();
        let a = provider.embed("hebbian learning").unwrap();
        let b = provider.embed("hebbian learning").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn embeddings_are_unit_length() {
        let provider = HashingEmbeddingProvider::new();
        let v = provider.embed("attention graph").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn empty_text_is_rejected() {
        let provider = HashingEmbeddingProvider::new();
        assert!(provider.embed("   ").is_err());
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![0.2, 0.4, 0.4];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn cosine_similarity_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }
}
