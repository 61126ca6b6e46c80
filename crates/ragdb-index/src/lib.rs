//! In-memory nearest-neighbor index over `(chunk_id, vector, metadata)`.
//!
//! Brute-force cosine scan; fine for documentation-sized corpora. The
//! primary map and the `doc_id -> chunk ids` secondary map mutate under
//! one write guard, so a reader never sees one without the other.

pub mod snapshot;

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{ChunkId, IndexEntry, MetaFilter, QueryResult};
use ragdb_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Entry count past which a one-time warning suggests moving to an
    /// approximate index. The query contract does not change.
    pub linear_scan_warn: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            linear_scan_warn: 50_000,
        }
    }
}

struct Stored {
    entry: IndexEntry,
    norm: f32,
    rank: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ChunkId, Stored>,
    by_doc: HashMap<String, HashSet<ChunkId>>,
    dim: Option<usize>,
    next_rank: u64,
    scan_warned: bool,
}

pub struct MemoryVectorIndex {
    inner: RwLock<Inner>,
    config: IndexConfig,
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
        }
    }

    /// Rebuild an index from persisted entries, in their stored order.
    /// The secondary document map is reconstructed from the primary.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self> {
        let index = Self::new();
        index.upsert(entries)?;
        Ok(index)
    }

    /// Every entry, ordered by insertion rank. Used by the snapshot
    /// writer so persisted order matches query tie-break order.
    pub fn export_entries(&self) -> Vec<IndexEntry> {
        let inner = self.read();
        let mut stored: Vec<&Stored> = inner.entries.values().collect();
        stored.sort_by_key(|s| s.rank);
        stored.iter().map(|s| s.entry.clone()).collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl VectorIndex for MemoryVectorIndex {
    fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut inner = self.write();
        for entry in &entries {
            let dim = inner.dim.get_or_insert(entry.vector.len());
            if entry.vector.len() != *dim {
                return Err(Error::InvalidInput(format!(
                    "vector for chunk '{}' has dimension {}, index holds {}",
                    entry.chunk_id,
                    entry.vector.len(),
                    dim
                )));
            }
        }
        for entry in entries {
            let norm = l2_norm(&entry.vector);
            let chunk_id = entry.chunk_id.clone();
            let doc_id = entry.doc_id.clone();
            // Replacing an entry keeps its insertion rank so tie ordering
            // is unaffected by re-ingestion.
            let prior = inner
                .entries
                .get(&chunk_id)
                .map(|s| (s.entry.doc_id.clone(), s.rank));
            let rank = match prior {
                Some((old_doc, rank)) => {
                    if old_doc != doc_id {
                        detach(&mut inner.by_doc, &old_doc, &chunk_id);
                    }
                    rank
                }
                None => {
                    let r = inner.next_rank;
                    inner.next_rank += 1;
                    r
                }
            };
            inner
                .by_doc
                .entry(doc_id)
                .or_default()
                .insert(chunk_id.clone());
            inner.entries.insert(chunk_id, Stored { entry, norm, rank });
        }
        if !inner.scan_warned && inner.entries.len() > self.config.linear_scan_warn {
            inner.scan_warned = true;
            warn!(
                entries = inner.entries.len(),
                threshold = self.config.linear_scan_warn,
                "index has outgrown linear scans, consider an approximate backend"
            );
        }
        Ok(())
    }

    fn delete(&self, chunk_ids: &[ChunkId]) -> Result<usize> {
        let mut inner = self.write();
        let mut removed = 0;
        for id in chunk_ids {
            if let Some(stored) = inner.entries.remove(id) {
                detach(&mut inner.by_doc, &stored.entry.doc_id, id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn delete_by_document(&self, doc_id: &str) -> Result<usize> {
        let mut inner = self.write();
        let Some(ids) = inner.by_doc.remove(doc_id) else {
            return Ok(0);
        };
        let mut removed = 0;
        for id in &ids {
            if inner.entries.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<QueryResult>> {
        if k == 0 {
            return Err(Error::invalid_input("query k must be positive"));
        }
        let inner = self.read();
        if let Some(dim) = inner.dim {
            if vector.len() != dim {
                return Err(Error::InvalidInput(format!(
                    "query vector has dimension {}, index holds {}",
                    vector.len(),
                    dim
                )));
            }
        }
        let query_norm = l2_norm(vector);

        let mut scored: Vec<(f32, u64, &Stored)> = inner
            .entries
            .values()
            .filter(|s| filter.map_or(true, |f| matches_filter(&s.entry.metadata, f)))
            .map(|s| (cosine(vector, query_norm, &s.entry.vector, s.norm), s.rank, s))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, _, s)| QueryResult {
                chunk_id: s.entry.chunk_id.clone(),
                content: s.entry.content.clone(),
                metadata: s.entry.metadata.clone(),
                score,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.read().entries.len()
    }
}

fn detach(by_doc: &mut HashMap<String, HashSet<ChunkId>>, doc_id: &str, chunk_id: &ChunkId) {
    if let Some(set) = by_doc.get_mut(doc_id) {
        set.remove(chunk_id);
        if set.is_empty() {
            by_doc.remove(doc_id);
        }
    }
}

fn matches_filter(meta: &ragdb_core::types::Meta, filter: &MetaFilter) -> bool {
    filter
        .iter()
        .all(|(key, want)| meta.get(key).is_some_and(|have| have == want))
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with precomputed norms. A zero-norm operand yields
/// similarity 0 rather than dividing by zero.
fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}
