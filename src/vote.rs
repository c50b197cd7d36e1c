//! Vote aggregator.
//!
//! Merges per-segment hit lists by document id, classifies each document
//! by how many segments voted for it, and selects the non-Noise survivors
//! that feed the PRF centroid.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::math::ScoredHit;
use crate::DocId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteRecord {
    pub id: DocId,
    pub votes: u8,
    pub rank_score: f32,
    pub best_score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteClass {
    Strong,
    Weak,
    Noise,
}

pub fn classify_vote(votes: u8) -> VoteClass {
    match votes {
        v if v >= 3 => VoteClass::Strong,
        2 => VoteClass::Weak,
        _ => VoteClass::Noise,
    }
}

fn fold_segment(acc: &mut HashMap<DocId, VoteRecord>, k_seg: usize, hits: &[ScoredHit]) {
    for (rank, hit) in hits.iter().enumerate() {
        let entry = acc.entry(hit.id).or_insert(VoteRecord {
            id: hit.id,
            votes: 0,
            rank_score: 0.0,
            best_score: f32::NEG_INFINITY,
        });
        entry.votes += 1;
        entry.rank_score += (k_seg as i64 - rank as i64) as f32;
        entry.best_score = entry.best_score.max(hit.score);
    }
}

/// Merges every segment's hit list into one set of vote records, sorted
/// in priority order: `votes` desc, `rank_score` desc, `best_score` desc,
/// `DocId` asc.
///
/// Runs as a rayon parallel fold with per-thread local accumulators,
/// reduced at the end. The final sort is always the single deterministic
/// comparator below, so parallelism in the fold never changes the order
/// of the result.
pub fn merge_segment_results(per_segment_hits: &[Vec<ScoredHit>], k_seg: usize) -> Vec<VoteRecord> {
    let merged: HashMap<DocId, VoteRecord> = per_segment_hits
        .par_iter()
        .fold(HashMap::new, |mut acc, hits| {
            fold_segment(&mut acc, k_seg, hits);
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (id, rec) in b {
                let entry = a.entry(id).or_insert(VoteRecord {
                    id,
                    votes: 0,
                    rank_score: 0.0,
                    best_score: f32::NEG_INFINITY,
                });
                entry.votes += rec.votes;
                entry.rank_score += rec.rank_score;
                entry.best_score = entry.best_score.max(rec.best_score);
            }
            a
        });

    let mut records: Vec<VoteRecord> = merged.into_values().collect();
    records.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| b.rank_score.total_cmp(&a.rank_score))
            .then_with(|| b.best_score.total_cmp(&a.best_score))
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}

/// Takes records whose class is not `Noise`, preserving sorted order,
/// truncated to `m`. Returns fewer than `m` ids when fewer than `m`
/// non-Noise records exist; an empty result is the caller's signal to
/// raise `NoSurvivors`, since PRF is mandatory.
pub fn select_survivor_ids(records: &[VoteRecord], m: usize) -> Vec<DocId> {
    records
        .iter()
        .filter(|r| classify_vote(r.votes) != VoteClass::Noise)
        .take(m)
        .map(|r| r.id)
        .collect()
}
