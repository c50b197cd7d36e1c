//! Iterative refiner.
//!
//! Re-searches the store with the PRF-corrected query at a growing limit
//! each round, merges hits into a running best-score map, and stops once
//! the Top-K has stabilized for two consecutive rounds (or `max_rounds`
//! is reached — that's a quality heuristic, not a correctness failure).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::adapter::VectorStoreAdapter;
use crate::cancel::CancellationToken;
use crate::error::{Result, SvveError};
use crate::math::{sort_desc_take, ScoredHit};
use crate::DocId;

const EPSILON: f32 = 1e-12;

/// Per-round limit schedule: `top_k * 2^min(round-1, 3)`, i.e.
/// `top_k, 2*top_k, 4*top_k, 8*top_k, 8*top_k, ...`. Monotonically
/// non-decreasing and capped so later rounds don't grow unbounded.
fn round_limit(top_k: usize, round: usize) -> usize {
    let exponent = (round.saturating_sub(1)).min(3);
    top_k * (1usize << exponent)
}

struct StabilityResult {
    jaccard: f32,
    improvement: f32,
}

fn stability(prev: &[ScoredHit], curr: &[ScoredHit]) -> StabilityResult {
    let prev_ids: HashSet<DocId> = prev.iter().map(|h| h.id).collect();
    let curr_ids: HashSet<DocId> = curr.iter().map(|h| h.id).collect();

    let intersection = prev_ids.intersection(&curr_ids).count();
    let union = prev_ids.union(&curr_ids).count();
    let jaccard = if union == 0 { 1.0 } else { intersection as f32 / union as f32 };

    let prev_sum: f32 = prev.iter().map(|h| h.score).sum();
    let curr_sum: f32 = curr.iter().map(|h| h.score).sum();
    let improvement = (curr_sum - prev_sum) / prev_sum.max(EPSILON);

    StabilityResult { jaccard, improvement }
}

/// Runs up to `max_rounds` re-search/merge/stability-check rounds against
/// `q_star`, returning the final Top-K. A result shorter than `top_k` is
/// acceptable — it means fewer than `top_k` distinct ids were ever seen.
#[allow(clippy::too_many_arguments)]
pub fn rerank_until_top_k(
    adapter: &VectorStoreAdapter,
    q_star: &[f32],
    top_k: usize,
    max_rounds: usize,
    jaccard_threshold: f32,
    improvement_threshold: f32,
    required_stable_rounds: u32,
    cancel: &CancellationToken,
) -> Result<Vec<ScoredHit>> {
    let mut best_seen: HashMap<DocId, f32> = HashMap::new();
    let mut prev_top: Vec<ScoredHit> = Vec::new();
    let mut consecutive_stable = 0u32;

    for round in 1..=max_rounds {
        if cancel.is_canceled() {
            return Err(SvveError::Canceled);
        }

        let limit = round_limit(top_k, round);
        let hits = adapter.search(q_star, limit)?;

        for hit in hits {
            let entry = best_seen.entry(hit.id).or_insert(f32::NEG_INFINITY);
            *entry = entry.max(hit.score);
        }

        let candidates: Vec<ScoredHit> = best_seen
            .iter()
            .map(|(&id, &score)| ScoredHit { id, score })
            .collect();
        let current_top = sort_desc_take(candidates, top_k);

        let stab = stability(&prev_top, &current_top);
        let is_stable = stab.jaccard >= jaccard_threshold && stab.improvement <= improvement_threshold;

        debug!(
            round,
            limit,
            candidates = best_seen.len(),
            jaccard = stab.jaccard,
            improvement = stab.improvement,
            is_stable,
            "refinement round completed"
        );

        if is_stable {
            consecutive_stable += 1;
        } else {
            consecutive_stable = 0;
        }

        prev_top = current_top;

        if consecutive_stable >= required_stable_rounds {
            break;
        }

        if cancel.is_canceled() {
            return Err(SvveError::Canceled);
        }
    }

    Ok(prev_top)
}
