//! Reciprocal rank fusion of per-corpus rankings.
//!
//! A document's fused score is the sum over input rankings of
//! `1 / (k + rank)`, rank 1-based, contributing nothing from rankings it
//! does not appear in. Scores from different corpora are not comparable;
//! ranks are, which is the whole point.

use std::collections::HashMap;

use expand_store::DocId;

use crate::topk::TopKList;

/// Standard rank-smoothing constant.
pub const RRF_K: f64 = 60.0;

/// Fuse rankings with the default constant.
pub fn reciprocal_rank_fusion(rankings: &[TopKList]) -> TopKList {
    reciprocal_rank_fusion_with(rankings, RRF_K)
}

/// Fuse rankings with an explicit smoothing constant.
pub fn reciprocal_rank_fusion_with(rankings: &[TopKList], k: f64) -> TopKList {
    let mut accumulator: HashMap<DocId, f64> = HashMap::new();
    for ranking in rankings {
        for (rank0, &(_, docid)) in ranking.iter().enumerate() {
            *accumulator.entry(docid).or_insert(0.0) += 1.0 / (k + (rank0 + 1) as f64);
        }
    }
    let mut fused: TopKList = accumulator.into_iter().map(|(d, s)| (s, d)).collect();
    fused.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });
    fused
}
