//! # svve — Segmented Vector Voting & Expansion
//!
//! Accelerates dense-vector Top-K retrieval on top of an already-populated
//! external vector store, without building any auxiliary index. Given a
//! single query embedding, [`Svve::search`] returns a ranked list of
//! document ids and scores whose quality is higher than a single naive
//! nearest-neighbor call to the backing store, at comparable or lower
//! latency.
//!
//! ## How it works
//!
//! 1. **Segment** the query into `N` contiguous coordinate sub-projections.
//! 2. **Search** each projection against the host's injected callback.
//! 3. **Vote**: merge the per-segment hit lists by document id and classify
//!    each by how many segments agreed on it.
//! 4. **Reformulate**: build a Rocchio-style PRF query from the centroid of
//!    the non-Noise survivors.
//! 5. **Refine**: re-search with the PRF query across growing limits until
//!    two consecutive rounds agree (Jaccard similarity + score-sum
//!    improvement), or a round cap is hit.
//!
//! This crate never touches the vector store directly — every I/O point is
//! the single [`adapter::SearchFn`] capability the host injects at
//! construction. No index is built or persisted; no projection matrices
//! are trained; the algorithm's tuning constants ([`SvveConfig`]) are
//! fixed at compile time rather than exposed as runtime knobs, since the
//! quality guarantees the test suite checks are tuned to these specific
//! values.
//!
//! ## Global allocator
//!
//! `mimalloc` replaces the system allocator for the whole process. The
//! hot path allocates per-segment projected queries and per-round
//! candidate vectors; mimalloc's per-thread size-segregated free lists
//! keep those allocations fast and contention-free under the rayon
//! thread pool used for parallel segment search and vote merging.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod adapter;
pub mod cancel;
pub mod error;
pub mod math;
pub mod pipeline;
pub mod prf;
pub mod segment;
pub mod vote;

/// Opaque document identifier. Never interpreted by the core.
pub type DocId = u32;

pub use adapter::{DocVector, RawSearchResponse, SearchFn, VectorStoreAdapter};
pub use cancel::CancellationToken;
pub use error::{Result, SvveError};
pub use math::ScoredHit;
pub use pipeline::{Svve, SvveConfig};
pub use vote::{VoteClass, VoteRecord};
