//! Centroid & PRF (pseudo-relevance feedback) builder.
//!
//! Standard Rocchio-style positive-only PRF: blend the original query with
//! the centroid of the survivor documents, weighted by `alpha`, then
//! renormalize. Keeping `alpha` weight on `q` biases refinement toward the
//! user's original intent while the centroid supplies context learned
//! from the first round's survivors.

use crate::adapter::VectorStoreAdapter;
use crate::error::{Result, SvveError};
use crate::math::normalize_in_place;
use crate::DocId;

/// Arithmetic mean of `vectors`, each of length `dim`. Fails on empty
/// input or a dimension mismatch among the inputs.
pub fn centroid(vectors: &[Vec<f32>], dim: usize) -> Result<Vec<f32>> {
    if vectors.is_empty() {
        return Err(SvveError::InvalidInput(
            "cannot compute centroid of an empty vector set".to_string(),
        ));
    }
    for v in vectors {
        if v.len() != dim {
            return Err(SvveError::InvalidInput(format!(
                "centroid input vector has length {}, expected {}",
                v.len(),
                dim
            )));
        }
    }

    let mut sum = vec![0.0f32; dim];
    for v in vectors {
        for (s, x) in sum.iter_mut().zip(v.iter()) {
            *s += x;
        }
    }
    let n = vectors.len() as f32;
    for s in sum.iter_mut() {
        *s /= n;
    }
    Ok(sum)
}

/// Fetches the survivor vectors from the adapter's cache, computes their
/// centroid, and forms `q* = alpha*q + (1-alpha)*centroid`, normalized.
///
/// Fails with `CacheMiss` if any survivor wasn't seen by an earlier
/// search, and with `DegeneratePRF` if the blended query has zero or
/// non-finite norm (rare — happens when `q ≈ -centroid`).
pub fn build_prf_query(
    q: &[f32],
    survivors: &[DocId],
    alpha: f32,
    adapter: &VectorStoreAdapter,
) -> Result<Vec<f32>> {
    let survivor_vecs = adapter.fetch_vectors(survivors)?;
    let vectors: Vec<Vec<f32>> = survivor_vecs.into_iter().map(|dv| dv.vector).collect();
    let c = centroid(&vectors, q.len())?;

    let mut q_star: Vec<f32> = q
        .iter()
        .zip(c.iter())
        .map(|(&qi, &ci)| alpha * qi + (1.0 - alpha) * ci)
        .collect();

    if !normalize_in_place(&mut q_star) {
        return Err(SvveError::DegeneratePRF);
    }
    Ok(q_star)
}
