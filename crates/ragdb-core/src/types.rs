//! Domain types shared by the chunking, embedding, and index crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// Equality filter over entry metadata: every key must match exactly.
pub type MetaFilter = HashMap<String, String>;

/// A source document handed to the ingestion pipeline.
///
/// Documents are transient: once chunked, only the chunks persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub raw_text: String,
    pub source_path: String,
    pub metadata: Meta,
}

/// A bounded segment of a document, tagged with structural metadata.
///
/// `id` is deterministic given `(doc_id, seq)` so that re-ingesting the
/// same document overwrites its chunks instead of accumulating duplicates.
/// `metadata` always carries a flattened `headers` path ("Intro > Overview")
/// and `source_file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub seq: usize,
    pub content: String,
    pub metadata: Meta,
}

/// The unit stored in a vector index. Content is kept alongside the
/// vector so query results can be hydrated without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub content: String,
    pub vector: Vec<f32>,
    pub metadata: Meta,
}

/// One ranked hit from a similarity query. `score` is cosine similarity
/// in [-1, 1]; higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub chunk_id: ChunkId,
    pub content: String,
    pub metadata: Meta,
    pub score: f32,
}

/// Outcome of one ingestion. The pipeline always returns this, it never
/// propagates an error past its boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionResult {
    pub success: bool,
    pub message: String,
    pub chunks_processed: usize,
}

impl IngestionResult {
    pub fn ok(chunks_processed: usize) -> Self {
        Self {
            success: true,
            message: "document successfully ingested".to_string(),
            chunks_processed,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            chunks_processed: 0,
        }
    }
}

/// Short stable content hash used for identities. blake3 keeps ids
/// identical across process restarts, unlike a seeded hasher.
pub fn stable_hash(input: &str) -> String {
    let hex = blake3::hash(input.as_bytes()).to_hex();
    hex.as_str()[..16].to_string()
}

/// Deterministic chunk id from the owning document identity and the
/// chunk's position. The doc id is re-hashed so arbitrary caller-supplied
/// ids cannot collide through the `_` separator.
pub fn chunk_id(doc_id: &str, seq: usize) -> ChunkId {
    format!("{}_{}", stable_hash(doc_id), seq)
}

/// Document identity for a filesystem source. Callers should pass a
/// canonicalized path; the hash is over its textual form.
pub fn document_id_for_path(path: &Path) -> String {
    stable_hash(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_deterministic() {
        assert_eq!(chunk_id("doc-a", 3), chunk_id("doc-a", 3));
        assert_ne!(chunk_id("doc-a", 3), chunk_id("doc-a", 4));
        assert_ne!(chunk_id("doc-a", 3), chunk_id("doc-b", 3));
    }

    #[test]
    fn underscores_in_doc_ids_cannot_collide() {
        assert_ne!(chunk_id("a_1", 1), chunk_id("a", 11));
    }
}
