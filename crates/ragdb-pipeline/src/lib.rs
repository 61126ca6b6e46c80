//! Orchestration layer: Chunker -> Embedder -> VectorIndex.
//!
//! `IngestionPipeline` and `RetrievalService` receive their embedder and
//! index at construction; lifecycle belongs to the caller, there is no
//! global state in here.

pub mod ingest;
pub mod retrieve;

pub use ingest::{IngestionPipeline, PipelineConfig};
pub use retrieve::{RetrievalService, DEFAULT_TOP_K};
