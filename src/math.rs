//! # Math Primitives
//!
//! The hot-path dot product below is lifted from the original flat-buffer
//! store's `dot_product_unrolled`: 8 independent accumulators so the CPU's
//! out-of-order engine doesn't serialize on a single dependency chain, with
//! a safe remainder loop for the tail that doesn't divide evenly by 8.
//!
//! Everything here is a pure function — no allocation beyond what's
//! explicitly returned, no hidden state.

use crate::DocId;

/// `Σ aᵢ·bᵢ`. Caller guarantees `a.len() == b.len()`.
#[inline(always)]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let len = a.len();
    let chunks = len / 8;

    let mut acc0 = 0.0f32;
    let mut acc1 = 0.0f32;
    let mut acc2 = 0.0f32;
    let mut acc3 = 0.0f32;
    let mut acc4 = 0.0f32;
    let mut acc5 = 0.0f32;
    let mut acc6 = 0.0f32;
    let mut acc7 = 0.0f32;

    // SAFETY: `i * 8 + 7 < chunks * 8 <= len == a.len() == b.len()`.
    unsafe {
        for i in 0..chunks {
            let base = i * 8;
            acc0 += a.get_unchecked(base) * b.get_unchecked(base);
            acc1 += a.get_unchecked(base + 1) * b.get_unchecked(base + 1);
            acc2 += a.get_unchecked(base + 2) * b.get_unchecked(base + 2);
            acc3 += a.get_unchecked(base + 3) * b.get_unchecked(base + 3);
            acc4 += a.get_unchecked(base + 4) * b.get_unchecked(base + 4);
            acc5 += a.get_unchecked(base + 5) * b.get_unchecked(base + 5);
            acc6 += a.get_unchecked(base + 6) * b.get_unchecked(base + 6);
            acc7 += a.get_unchecked(base + 7) * b.get_unchecked(base + 7);
        }
    }

    let mut result = acc0 + acc1 + acc2 + acc3 + acc4 + acc5 + acc6 + acc7;

    let remainder_start = chunks * 8;
    for i in remainder_start..len {
        result += a[i] * b[i];
    }

    result
}

/// `√Σ vᵢ²`.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Divides `v` by its L2 norm in place.
///
/// Returns `false` and leaves `v` untouched when the norm is zero or
/// non-finite — the caller (the query boundary, the PRF builder) is
/// responsible for turning that into the appropriate error.
pub fn normalize_in_place(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if norm <= 0.0 || !norm.is_finite() {
        return false;
    }
    let inv = 1.0 / norm;
    for x in v.iter_mut() {
        *x *= inv;
    }
    true
}

/// A single ranked hit: `(DocId, score)` where higher score is better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredHit {
    pub id: DocId,
    pub score: f32,
}

/// Sorts `hits` descending by score (ties broken by ascending `DocId`) and
/// truncates to `k`. `hits` is consumed; the caller no longer needs the
/// unsorted order.
///
/// Deterministic across runs and platforms: this is the property the
/// reproducibility tests in invariant 4 rely on. `f32::total_cmp` gives a
/// total order even over NaN, so a malformed score can never panic the
/// sort — it will simply sort last, deterministically.
pub fn sort_desc_take(mut hits: Vec<ScoredHit>, k: usize) -> Vec<ScoredHit> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_product_matches_naive() {
        let a: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let b: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let expected: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        assert!((dot(&a, &b) - expected).abs() < 1e-4);
    }

    #[test]
    fn dot_product_handles_non_multiple_of_eight() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![4.0f32, 5.0, 6.0];
        assert!((dot(&a, &b) - 32.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_in_place_yields_unit_norm() {
        let mut v = vec![3.0f32, 4.0, 0.0, 0.0];
        assert!(normalize_in_place(&mut v));
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_in_place_rejects_zero_vector() {
        let mut v = vec![0.0f32, 0.0, 0.0];
        assert!(!normalize_in_place(&mut v));
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn normalize_in_place_rejects_non_finite() {
        let mut v = vec![f32::NAN, 1.0];
        assert!(!normalize_in_place(&mut v));
    }

    #[test]
    fn sort_desc_take_breaks_ties_by_ascending_id() {
        let hits = vec![
            ScoredHit { id: 7, score: 1.0 },
            ScoredHit { id: 5, score: 1.0 },
            ScoredHit { id: 9, score: 2.0 },
        ];
        let sorted = sort_desc_take(hits, 10);
        assert_eq!(sorted.iter().map(|h| h.id).collect::<Vec<_>>(), vec![9, 5, 7]);
    }

    #[test]
    fn sort_desc_take_truncates() {
        let hits = (0..10)
            .map(|i| ScoredHit { id: i, score: i as f32 })
            .collect();
        let sorted = sort_desc_take(hits, 3);
        assert_eq!(sorted.len(), 3);
        assert_eq!(sorted[0].id, 9);
    }
}
