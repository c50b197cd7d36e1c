//! Segment planner.
//!
//! Partitions a query's coordinate range `[0, D)` into `N` contiguous
//! segments and builds the per-segment projected query: `q` inside the
//! segment's range, zero outside. The projection is never renormalized —
//! scores are only compared within a segment; the vote aggregator absorbs
//! cross-segment magnitude differences.

/// Half-open coordinate interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRange {
    pub start: usize,
    pub end: usize,
}

impl SegmentRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Contiguous partition of `[0, d)` into `n` segments. When `d` is not
/// divisible by `n`, the first `d % n` segments carry one extra
/// coordinate. When `d < n`, the trailing segments are empty — callers
/// must skip empty segments rather than invoke the adapter on them.
pub fn segment_ranges(d: usize, n: usize) -> Vec<SegmentRange> {
    assert!(n > 0, "segment count must be > 0");

    let base = d / n;
    let extra = d % n;

    let mut ranges = Vec::with_capacity(n);
    let mut cursor = 0;
    for i in 0..n {
        let width = base + if i < extra { 1 } else { 0 };
        let start = cursor;
        let end = (cursor + width).min(d);
        ranges.push(SegmentRange { start, end });
        cursor = end;
    }
    ranges
}

/// Returns a length-`q.len()` vector equal to `q` within `range` and
/// `0.0` elsewhere.
pub fn build_segment_query(q: &[f32], range: SegmentRange) -> Vec<f32> {
    let mut projected = vec![0.0f32; q.len()];
    if !range.is_empty() {
        projected[range.start..range.end].copy_from_slice(&q[range.start..range.end]);
    }
    projected
}
