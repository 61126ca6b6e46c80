use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};
use walkdir::WalkDir;

use ragdb_core::chunker::{ChunkDraft, Chunker};
use ragdb_core::config::IngestSettings;
use ragdb_core::traits::{Embedder, VectorIndex};
use ragdb_core::types::{
    chunk_id, document_id_for_path, Chunk, Document, IndexEntry, IngestionResult, Meta,
};
use ragdb_core::{Error, Result};

const INGESTABLE_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Hard cap on chunks stored per document. Overflow is truncated and
    /// reported, not failed.
    pub max_chunks: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunks: IngestSettings::default().max_chunks,
        }
    }
}

impl From<IngestSettings> for PipelineConfig {
    fn from(s: IngestSettings) -> Self {
        Self {
            max_chunks: s.max_chunks,
        }
    }
}

/// Turns a document into embedded, indexed chunks.
///
/// Re-ingesting a document under the same identity overwrites its prior
/// chunk set. All fallible backend work (embedding) happens before any
/// index mutation, so a failed ingestion leaves the prior state intact.
pub struct IngestionPipeline<V: VectorIndex> {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<V>,
    config: PipelineConfig,
}

impl<V: VectorIndex> IngestionPipeline<V> {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        index: Arc<V>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            config,
        }
    }

    /// Ingest one document. Always returns a result object; errors are
    /// folded into it rather than propagated.
    pub fn ingest_document(&self, doc: &Document) -> IngestionResult {
        if doc.raw_text.trim().is_empty() {
            return IngestionResult::failure(format!(
                "no text content in document '{}'",
                doc.source_path
            ));
        }

        let mut drafts = self.chunker.split(&doc.raw_text);
        if drafts.is_empty() {
            return IngestionResult::failure(format!(
                "document '{}' produced no indexable chunks",
                doc.source_path
            ));
        }
        if drafts.len() > self.config.max_chunks {
            warn!(
                doc_id = %doc.id,
                total = drafts.len(),
                max_chunks = self.config.max_chunks,
                "chunk limit reached, truncating"
            );
            drafts.truncate(self.config.max_chunks);
        }

        let chunks: Vec<Chunk> = drafts
            .into_iter()
            .enumerate()
            .map(|(seq, draft)| build_chunk(doc, seq, draft))
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = match self.embedder.embed_batch(&texts) {
            Ok(v) => v,
            Err(e) => {
                error!(doc_id = %doc.id, error = %e, "embedding failed");
                return IngestionResult::failure(format!("embedding failed: {e}"));
            }
        };
        if vectors.len() != chunks.len() {
            return IngestionResult::failure(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            ));
        }

        // Prior version goes away only after the new one is fully
        // embedded; no stale chunks survive a successful ingest.
        if let Err(e) = self.index.delete_by_document(&doc.id) {
            error!(doc_id = %doc.id, error = %e, "failed to clear prior chunks");
            return IngestionResult::failure(format!("failed to clear prior chunks: {e}"));
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                chunk_id: chunk.id,
                doc_id: chunk.doc_id,
                content: chunk.content,
                vector,
                metadata: chunk.metadata,
            })
            .collect();
        let stored = entries.len();
        if let Err(e) = self.index.upsert(entries) {
            error!(doc_id = %doc.id, error = %e, "failed to store chunks");
            return IngestionResult::failure(format!("failed to store chunks: {e}"));
        }

        info!(doc_id = %doc.id, chunks = stored, "document ingested");
        IngestionResult::ok(stored)
    }

    /// Ingest a file from disk. Identity comes from the canonicalized
    /// path, so symlinked or relative spellings of the same file
    /// overwrite rather than duplicate.
    pub fn ingest_file(&self, path: &Path) -> IngestionResult {
        let resolved = match fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) => {
                return IngestionResult::failure(format!(
                    "file not found: {} ({e})",
                    path.display()
                ))
            }
        };
        let raw_text = match read_text(&resolved) {
            Ok(t) => t,
            Err(e) => {
                return IngestionResult::failure(format!(
                    "failed to read {}: {e}",
                    resolved.display()
                ))
            }
        };
        let doc = Document {
            id: document_id_for_path(&resolved),
            raw_text,
            source_path: resolved.display().to_string(),
            metadata: file_metadata(&resolved),
        };
        self.ingest_document(&doc)
    }

    /// Ingest uploaded bytes. Identity comes from the caller-supplied
    /// filename, never from any scratch location, so re-uploading the
    /// same file overwrites its chunks.
    pub fn ingest_bytes(&self, bytes: &[u8], filename: &str) -> IngestionResult {
        if filename.trim().is_empty() {
            return IngestionResult::failure("upload is missing a filename");
        }
        let raw_text = String::from_utf8_lossy(bytes).into_owned();
        let mut metadata = Meta::new();
        metadata.insert("filename".to_string(), filename.to_string());
        metadata.insert("file_size".to_string(), bytes.len().to_string());
        if let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) {
            metadata.insert("file_type".to_string(), format!(".{ext}"));
        }
        let doc = Document {
            id: ragdb_core::types::stable_hash(filename),
            raw_text,
            source_path: filename.to_string(),
            metadata,
        };
        self.ingest_document(&doc)
    }

    /// Ingest every markdown/text file under a directory, in sorted
    /// order. Per-file failures land in the per-file results.
    pub fn ingest_directory(&self, dir: &Path) -> Result<Vec<IngestionResult>> {
        let files = list_ingestable_files(dir)?;
        info!(dir = %dir.display(), files = files.len(), "ingesting directory");
        Ok(files.iter().map(|f| self.ingest_file(f)).collect())
    }

    /// Idempotent deletion entry point: tries a document cascade first,
    /// then a single chunk id. Unknown ids are a successful no-op.
    pub fn delete(&self, id: &str) -> bool {
        match self.index.delete_by_document(id) {
            Ok(n) if n > 0 => {
                info!(doc_id = %id, chunks = n, "document deleted");
                true
            }
            Ok(_) => match self.index.delete(&[id.to_string()]) {
                Ok(n) => {
                    info!(id = %id, chunks = n, "chunk delete completed");
                    true
                }
                Err(e) => {
                    error!(id = %id, error = %e, "delete failed");
                    false
                }
            },
            Err(e) => {
                error!(doc_id = %id, error = %e, "delete failed");
                false
            }
        }
    }
}

/// Files under `dir` the pipeline knows how to ingest, sorted for
/// deterministic ordering.
pub fn list_ingestable_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "not a directory: {}",
            dir.display()
        )));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .map_or(false, |ext| INGESTABLE_EXTENSIONS.contains(&ext))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn build_chunk(doc: &Document, seq: usize, draft: ChunkDraft) -> Chunk {
    let mut metadata = doc.metadata.clone();
    metadata.insert("headers".to_string(), draft.headers.join(" > "));
    metadata.insert("source_file".to_string(), doc.source_path.clone());
    Chunk {
        id: chunk_id(&doc.id, seq),
        doc_id: doc.id.clone(),
        seq,
        content: draft.content,
        metadata,
    }
}

fn read_text(path: &Path) -> std::io::Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned()),
    }
}

fn file_metadata(path: &Path) -> Meta {
    let mut meta = Meta::new();
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        meta.insert("filename".to_string(), name.to_string());
    }
    if let Ok(len) = fs::metadata(path).map(|m| m.len()) {
        meta.insert("file_size".to_string(), len.to_string());
    }
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        meta.insert("file_type".to_string(), format!(".{ext}"));
    }
    meta
}
