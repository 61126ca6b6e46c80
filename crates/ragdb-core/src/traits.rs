use crate::error::{Error, Result};
use crate::types::{ChunkId, IndexEntry, MetaFilter, QueryResult};

/// Converts text into fixed-dimension vectors. Implementations are
/// swappable (local model, hosted API); no caller depends on backend
/// identity. A partial backend failure fails the whole batch call, no
/// partial results are returned.
pub trait Embedder: Send + Sync {
    /// Dimensionality of every vector this instance produces.
    fn dim(&self) -> usize;

    /// Embed a batch of texts, 1:1 and order-preserving.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| Error::backend("embedder returned no vector for a one-element batch"))
    }
}

/// Nearest-neighbor store over `(chunk_id, vector, metadata)` triples.
///
/// Writes to the same chunk id are linearizable (last writer wins);
/// queries may run concurrently with writes and never observe a torn
/// entry. Deletion is idempotent.
pub trait VectorIndex: Send + Sync {
    /// Insert entries, replacing any that share a `chunk_id`.
    fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Remove entries by id; returns how many existed. Unknown ids are
    /// ignored.
    fn delete(&self, chunk_ids: &[ChunkId]) -> Result<usize>;

    /// Remove every entry belonging to a document; returns how many were
    /// removed.
    fn delete_by_document(&self, doc_id: &str) -> Result<usize>;

    /// Top-k entries by cosine similarity, highest score first, ties
    /// broken by insertion order. `k == 0` is an input error; fewer than
    /// `k` entries returns all of them.
    fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<QueryResult>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
