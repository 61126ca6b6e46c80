//! Deterministic local embedding backend.
//!
//! `HashEmbedder` maps whitespace tokens into a hashed bag-of-words
//! vector and L2-normalises it. It is cheap, offline, and stable across
//! process restarts, which is what the ingestion pipeline needs for
//! idempotent re-ingestion. Model-backed or hosted embedders plug in
//! behind the same `Embedder` trait.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use twox_hash::XxHash64;

use ragdb_core::traits::Embedder;
use ragdb_core::Result;

pub const DEFAULT_DIM: usize = 384;

pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// The backend used when nothing else is configured.
pub fn default_embedder(dim: usize) -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(dim))
}
