use std::sync::Arc;

use ragdb_core::traits::{Embedder, VectorIndex};
use ragdb_core::types::{MetaFilter, QueryResult};
use ragdb_core::{Error, Result};

pub const DEFAULT_TOP_K: usize = 5;

/// Answers a question against the index: embed once, query, return
/// results in rank order. A backend failure surfaces as an error, never
/// as a silently empty list.
pub struct RetrievalService<V: VectorIndex> {
    embedder: Arc<dyn Embedder>,
    index: Arc<V>,
}

impl<V: VectorIndex> RetrievalService<V> {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<V>) -> Self {
        Self { embedder, index }
    }

    pub fn retrieve(&self, query_text: &str, k: usize) -> Result<Vec<QueryResult>> {
        self.retrieve_filtered(query_text, k, None)
    }

    pub fn retrieve_default(&self, query_text: &str) -> Result<Vec<QueryResult>> {
        self.retrieve(query_text, DEFAULT_TOP_K)
    }

    pub fn retrieve_filtered(
        &self,
        query_text: &str,
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<QueryResult>> {
        if query_text.trim().is_empty() {
            return Err(Error::invalid_input("query text is empty"));
        }
        let vector = self.embedder.embed_one(query_text)?;
        self.index.query(&vector, k, filter)
    }
}
