use std::fs;
use std::sync::Arc;

use ragdb_core::chunker::Chunker;
use ragdb_core::traits::{Embedder, VectorIndex};
use ragdb_core::types::{Document, Meta};
use ragdb_core::{Error, Result};
use ragdb_embed::HashEmbedder;
use ragdb_index::MemoryVectorIndex;
use ragdb_pipeline::{IngestionPipeline, PipelineConfig, RetrievalService};

const THREE_SECTIONS: &str =
    "# Intro\nintro body text\n\n## Details\ndetail body text\n\n# Conclusion\nfinal body text\n";

fn make_pipeline(
    max_chunks: usize,
) -> (
    IngestionPipeline<MemoryVectorIndex>,
    RetrievalService<MemoryVectorIndex>,
    Arc<MemoryVectorIndex>,
) {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));
    let index = Arc::new(MemoryVectorIndex::new());
    let pipeline = IngestionPipeline::new(
        Chunker::default(),
        Arc::clone(&embedder),
        Arc::clone(&index),
        PipelineConfig { max_chunks },
    );
    let retrieval = RetrievalService::new(embedder, Arc::clone(&index));
    (pipeline, retrieval, index)
}

fn doc(id: &str, text: &str) -> Document {
    Document {
        id: id.to_string(),
        raw_text: text.to_string(),
        source_path: format!("mem://{id}"),
        metadata: Meta::new(),
    }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dim(&self) -> usize {
        64
    }
    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::backend("embedding backend offline"))
    }
}

#[test]
fn three_section_document_yields_three_tagged_chunks() {
    let (pipeline, retrieval, index) = make_pipeline(500);
    let result = pipeline.ingest_document(&doc("doc-1", THREE_SECTIONS));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.chunks_processed, 3);
    assert_eq!(index.len(), 3);

    let results = retrieval.retrieve("detail body text", 10).expect("retrieve");
    assert_eq!(results.len(), 3);
    let details = results
        .iter()
        .find(|r| r.content.contains("detail body"))
        .expect("details chunk present");
    assert_eq!(
        details.metadata.get("headers").map(String::as_str),
        Some("Intro > Details")
    );
    assert_eq!(
        details.metadata.get("source_file").map(String::as_str),
        Some("mem://doc-1")
    );

    let intro = results
        .iter()
        .find(|r| r.content.contains("intro body"))
        .expect("intro chunk present");
    assert_eq!(intro.metadata.get("headers").map(String::as_str), Some("Intro"));
}

#[test]
fn reingestion_is_idempotent() {
    let (pipeline, _, index) = make_pipeline(500);
    let d = doc("doc-1", THREE_SECTIONS);
    assert!(pipeline.ingest_document(&d).success);
    assert!(pipeline.ingest_document(&d).success);
    assert_eq!(index.len(), 3, "second ingest must overwrite, not append");
}

#[test]
fn reingestion_removes_stale_chunks() {
    let (pipeline, retrieval, index) = make_pipeline(500);
    let v1 = doc("doc-1", "# A\nobsolete passage\n\n# B\nkept passage\n");
    let v2 = doc("doc-1", "# B\nkept passage\n");
    assert!(pipeline.ingest_document(&v1).success);
    assert_eq!(index.len(), 2);

    assert!(pipeline.ingest_document(&v2).success);
    assert_eq!(index.len(), 1);

    let results = retrieval.retrieve("obsolete passage", 10).expect("retrieve");
    assert!(
        results.iter().all(|r| !r.content.contains("obsolete")),
        "stale chunk still queryable"
    );
}

#[test]
fn failed_embedding_leaves_prior_state_intact() {
    let (pipeline, retrieval, index) = make_pipeline(500);
    let d = doc("doc-1", THREE_SECTIONS);
    assert!(pipeline.ingest_document(&d).success);
    assert_eq!(index.len(), 3);

    let failing = IngestionPipeline::new(
        Chunker::default(),
        Arc::new(FailingEmbedder),
        Arc::clone(&index),
        PipelineConfig::default(),
    );
    let result = failing.ingest_document(&d);
    assert!(!result.success);
    assert_eq!(result.chunks_processed, 0);
    assert!(result.message.contains("embedding failed"));

    // The previous version of the document is still fully queryable.
    assert_eq!(index.len(), 3);
    let results = retrieval.retrieve("intro body text", 10).expect("retrieve");
    assert_eq!(results.len(), 3);
}

#[test]
fn chunk_overflow_is_truncated_not_failed() {
    let (pipeline, _, index) = make_pipeline(2);
    let result = pipeline.ingest_document(&doc("doc-1", THREE_SECTIONS));
    assert!(result.success);
    assert_eq!(result.chunks_processed, 2);
    assert_eq!(index.len(), 2);
}

#[test]
fn empty_document_fails_cleanly() {
    let (pipeline, _, index) = make_pipeline(500);
    let result = pipeline.ingest_document(&doc("doc-1", "   \n  "));
    assert!(!result.success);
    assert_eq!(result.chunks_processed, 0);
    assert!(result.message.contains("no text content"));
    assert!(index.is_empty());
}

#[test]
fn headers_only_document_fails_cleanly() {
    let (pipeline, _, index) = make_pipeline(500);
    let result = pipeline.ingest_document(&doc("doc-1", "# A\n## B\n"));
    assert!(!result.success);
    assert!(result.message.contains("no indexable chunks"));
    assert!(index.is_empty());
}

#[test]
fn base_metadata_is_carried_onto_every_chunk() {
    let (pipeline, retrieval, _) = make_pipeline(500);
    let mut d = doc("doc-1", THREE_SECTIONS);
    d.metadata.insert("author".to_string(), "me".to_string());
    assert!(pipeline.ingest_document(&d).success);

    for r in retrieval.retrieve("anything at all", 10).expect("retrieve") {
        assert_eq!(r.metadata.get("author").map(String::as_str), Some("me"));
        assert!(r.metadata.contains_key("headers"));
        assert!(r.metadata.contains_key("source_file"));
    }
}

#[test]
fn ingest_directory_walks_and_is_idempotent() {
    let (pipeline, _, index) = make_pipeline(500);
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(tmp.path().join("a.md"), "# Alpha\nalpha content here\n").expect("write");
    fs::write(tmp.path().join("b.txt"), "bravo content here").expect("write");
    fs::write(tmp.path().join("c.bin"), [0u8, 1, 2]).expect("write");

    let results = pipeline.ingest_directory(tmp.path()).expect("ingest dir");
    assert_eq!(results.len(), 2, "binary file must be skipped");
    assert!(results.iter().all(|r| r.success));
    assert_eq!(index.len(), 2);

    // Same paths, same identities: nothing accumulates.
    let results = pipeline.ingest_directory(tmp.path()).expect("ingest dir");
    assert_eq!(results.len(), 2);
    assert_eq!(index.len(), 2);
}

#[test]
fn ingest_directory_rejects_non_directories() {
    let (pipeline, _, _) = make_pipeline(500);
    let err = pipeline
        .ingest_directory(std::path::Path::new("/definitely/not/here"))
        .expect_err("must fail");
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn ingest_missing_file_reports_failure() {
    let (pipeline, _, _) = make_pipeline(500);
    let result = pipeline.ingest_file(std::path::Path::new("/no/such/file.md"));
    assert!(!result.success);
    assert!(result.message.contains("file not found"));
}

#[test]
fn ingest_bytes_identity_comes_from_the_filename() {
    let (pipeline, retrieval, index) = make_pipeline(500);
    let body = b"# Report\nquarterly numbers look fine\n";

    let first = pipeline.ingest_bytes(body, "report.md");
    assert!(first.success, "{}", first.message);
    let n = index.len();

    // Re-uploading the same filename overwrites instead of duplicating.
    let second = pipeline.ingest_bytes(body, "report.md");
    assert!(second.success);
    assert_eq!(index.len(), n);

    let results = retrieval.retrieve("quarterly numbers", 5).expect("retrieve");
    let top = results.first().expect("hit");
    assert_eq!(
        top.metadata.get("source_file").map(String::as_str),
        Some("report.md")
    );
    assert_eq!(top.metadata.get("file_type").map(String::as_str), Some(".md"));
}

#[test]
fn ingest_bytes_requires_a_filename() {
    let (pipeline, _, _) = make_pipeline(500);
    let result = pipeline.ingest_bytes(b"text", "  ");
    assert!(!result.success);
}

#[test]
fn delete_is_idempotent_and_cascades() {
    let (pipeline, retrieval, index) = make_pipeline(500);
    assert!(pipeline.ingest_document(&doc("doomed", THREE_SECTIONS)).success);
    assert_eq!(index.len(), 3);

    assert!(pipeline.delete("doomed"));
    assert!(index.is_empty());
    let results = retrieval.retrieve("intro body text", 10).expect("retrieve");
    assert!(results.is_empty(), "deleted document still queryable");

    // Deleting again (or deleting garbage) is still a success.
    assert!(pipeline.delete("doomed"));
    assert!(pipeline.delete("never-existed"));
}

#[test]
fn blank_queries_are_rejected() {
    let (_, retrieval, _) = make_pipeline(500);
    let err = retrieval.retrieve("   ", 5).expect_err("must fail");
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn retrieval_failure_is_an_error_not_an_empty_list() {
    let index = Arc::new(MemoryVectorIndex::new());
    let retrieval = RetrievalService::new(Arc::new(FailingEmbedder), Arc::clone(&index));
    let err = retrieval.retrieve_default("anything").expect_err("must fail");
    assert!(matches!(err, Error::Backend(_)));
}
