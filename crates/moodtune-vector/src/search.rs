use std::cmp::Ordering;

use moodtune_core::error::{Error, Result};

use crate::catalog::{l2_norm, EmbeddingMatrix};

/// Cosine of the angle between `a` and `b`.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() { return 0.0; }
    cosine_with_norms(a, l2_norm(a), b, l2_norm(b))
}

fn cosine_with_norms(a: &[f32], a_norm: f64, b: &[f32], b_norm: f64) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 { return 0.0; }
    let dot: f64 = a.iter().zip(b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum();
    let score = (dot / a_norm / b_norm) as f32;
    if score.is_finite() { score.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Exhaustive cosine ranking over an in-memory matrix.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarityRanker;

impl SimilarityRanker {
    pub fn new() -> Self { Self }

    /// Top `k` rows by descending cosine score as `(row, score)`.
    ///
    /// Equal scores keep catalog order. `k` larger than the catalog returns
    /// every row; `k == 0` or a query of the wrong width is `InvalidArgument`.
    pub fn rank(&self, query: &[f32], matrix: &EmbeddingMatrix, k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        if query.len() != matrix.dim() {
            return Err(Error::InvalidArgument(format!(
                "query has {} dimensions, catalog has {}",
                query.len(),
                matrix.dim()
            )));
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument("query vector has non-finite values".into()));
        }

        let q_norm = l2_norm(query);
        if q_norm == 0.0 { tracing::debug!("zero-norm query, every score is 0"); }
        let mut scored: Vec<(usize, f32)> = matrix
            .iter_rows()
            .enumerate()
            .map(|(i, row)| (i, cosine_with_norms(query, q_norm, row, matrix.norm(i).unwrap_or(0.0))))
            .collect();
        // stable: ties stay in catalog order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
