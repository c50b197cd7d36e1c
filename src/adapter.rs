//! Vector-store adapter.
//!
//! Wraps the host-injected search callback, validates its output against
//! the wire contract, and caches returned vectors for later PRF lookup.
//! This is the only I/O the core performs.
//!
//! The callback itself is modeled as a capability — `SearchFn` — rather
//! than a concrete store type, so the core never depends on a specific
//! storage backend, only on a function from query to raw hits.
//!
//! The cache is guarded by a `parking_lot::Mutex` rather than owned
//! exclusively: every access here is a write-or-read-then-clone, never a
//! long-lived shared read, so a plain mutex is enough. This lets the
//! pipeline's segment searches run concurrently across rayon's thread
//! pool while still writing into one shared per-request cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::error::{Result, SvveError};
use crate::math::ScoredHit;
use crate::DocId;

/// Raw response shape the host's callback returns: parallel `ids`,
/// `scores`, and `vectors` arrays (SoA — avoids a per-hit allocation on
/// the boundary).
#[derive(Debug, Clone)]
pub struct RawSearchResponse {
    pub ids: Vec<DocId>,
    pub scores: Vec<f32>,
    pub vectors: Vec<Vec<f32>>,
}

/// A document vector received from the store, keyed by its id.
#[derive(Debug, Clone, PartialEq)]
pub struct DocVector {
    pub id: DocId,
    pub vector: Vec<f32>,
}

/// The injected search capability. `query` is a projected or PRF-corrected
/// query of length `dim()`; `limit` bounds the number of hits requested.
///
/// Implementors return `Err` only for callback-level failures (the host's
/// store erroring out); shape/content violations of a successful response
/// are caught and classified by the adapter itself.
pub trait SearchFn: Send + Sync {
    fn call(&self, query: &[f32], limit: usize) -> anyhow::Result<RawSearchResponse>;
}

impl<F> SearchFn for F
where
    F: Fn(&[f32], usize) -> anyhow::Result<RawSearchResponse> + Send + Sync,
{
    fn call(&self, query: &[f32], limit: usize) -> anyhow::Result<RawSearchResponse> {
        self(query, limit)
    }
}

/// Wraps a `SearchFn`, enforces the callback contract, and caches
/// returned vectors for one request's worth of PRF lookups.
///
/// Owned exclusively by the request that constructs it; the cache never
/// outlives `execute_search`.
pub struct VectorStoreAdapter {
    search_fn: Arc<dyn SearchFn>,
    dim: usize,
    cache: Mutex<HashMap<DocId, DocVector>>,
}

impl VectorStoreAdapter {
    pub fn new(search_fn: Arc<dyn SearchFn>, dim: usize) -> Self {
        Self {
            search_fn,
            dim,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Invokes the callback and validates its response. On success, every
    /// returned `(id, vector)` pair overwrites any previous cache entry
    /// for that id (most-recent-write-wins). Safe to call concurrently
    /// from multiple threads against the same adapter.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredHit>> {
        let raw = self
            .search_fn
            .call(query, limit)
            .map_err(|e| SvveError::adapter_violation("callback", e.to_string()))?;

        if raw.ids.len() != raw.scores.len() || raw.ids.len() != raw.vectors.len() {
            return Err(SvveError::adapter_violation(
                "ids/scores/vectors",
                format!(
                    "length mismatch: ids={}, scores={}, vectors={}",
                    raw.ids.len(),
                    raw.scores.len(),
                    raw.vectors.len()
                ),
            ));
        }
        if raw.ids.len() > limit {
            return Err(SvveError::adapter_violation(
                "ids",
                format!("returned {} hits, exceeds limit {}", raw.ids.len(), limit),
            ));
        }

        let mut hits = Vec::with_capacity(raw.ids.len());
        for ((id, score), vector) in raw
            .ids
            .into_iter()
            .zip(raw.scores.into_iter())
            .zip(raw.vectors.into_iter())
        {
            if vector.len() != self.dim {
                return Err(SvveError::adapter_violation(
                    "vectors",
                    format!(
                        "document {id} returned vector of length {}, expected {}",
                        vector.len(),
                        self.dim
                    ),
                ));
            }
            let norm = crate::math::l2_norm(&vector);
            if norm <= 0.0 || !norm.is_finite() {
                return Err(SvveError::adapter_violation(
                    "vectors",
                    format!("document {id} returned a non-normalizable vector (norm={norm})"),
                ));
            }

            hits.push(ScoredHit { id, score });
            self.cache.lock().insert(id, DocVector { id, vector });
        }

        trace!(returned = hits.len(), limit, "adapter search completed");
        Ok(hits)
    }

    /// Returns vectors previously cached for `ids`. Never calls the
    /// backing store — PRF may only reference documents seen in an
    /// earlier search.
    pub fn fetch_vectors(&self, ids: &[DocId]) -> Result<Vec<DocVector>> {
        let mut out = Vec::with_capacity(ids.len());
        let cache = self.cache.lock();
        for &id in ids {
            match cache.get(&id) {
                Some(v) => out.push(v.clone()),
                None => {
                    warn!(id, "PRF requested a vector never seen by this adapter");
                    return Err(SvveError::CacheMiss(id));
                }
            }
        }
        Ok(out)
    }
}
