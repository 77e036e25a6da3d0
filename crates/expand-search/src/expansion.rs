//! Relevance-model estimation and weighted-query transforms.
//!
//! Expansion weights follow `w(t) = sum over feedback docs d of
//! s_d * f_dt / len(d)`: each pseudo-relevant document votes for its terms
//! proportionally to its retrieval score and the term's share of the
//! document. The estimation is a document-at-a-time merge over the
//! feedback documents' forward vectors.

use std::collections::HashMap;

use expand_store::docvector::{DocumentIndex, VectorCursor, TERMID_END};
use expand_store::{DocId, StoreResult, TermId};

/// A query with per-term weights, as consumed by the weighted traversal.
pub type WeightedQuery = Vec<(TermId, f64)>;

struct FeedbackVector {
    cursor: VectorCursor,
    doc_score: f64,
    doc_len: f64,
}

/// Estimate a relevance model from `feedback` (the first-stage top-k as
/// `(score, docid)` pairs), keeping the `terms_to_expand` heaviest terms
/// (everything when 0).
pub fn rm_expansion(
    forward: &DocumentIndex,
    feedback: &[(f64, DocId)],
    terms_to_expand: usize,
) -> StoreResult<WeightedQuery> {
    let mut vectors = Vec::with_capacity(feedback.len());
    for &(score, docid) in feedback {
        let vector = forward.vector(docid)?;
        vectors.push(FeedbackVector {
            cursor: vector.cursor()?,
            doc_score: score,
            doc_len: f64::from(vector.doclen()),
        });
    }

    let mut result: WeightedQuery = Vec::new();
    let mut cur_term = vectors
        .iter()
        .map(|v| v.cursor.termid())
        .min()
        .unwrap_or(TERMID_END);

    while cur_term != TERMID_END {
        let mut weight = 0.0f64;
        let mut next_term = TERMID_END;
        for v in vectors.iter_mut() {
            if v.cursor.termid() == cur_term {
                weight += v.doc_score * (f64::from(v.cursor.freq()) / v.doc_len);
                v.cursor.next();
            }
            next_term = next_term.min(v.cursor.termid());
        }
        result.push((cur_term, weight));
        cur_term = next_term;
    }

    result.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if terms_to_expand > 0 && result.len() > terms_to_expand {
        result.truncate(terms_to_expand);
    }
    Ok(result)
}

/// Scale weights so they sum to one (in absolute value).
pub fn normalize_weighted_query(weighted_query: &mut WeightedQuery) {
    let total: f64 = weighted_query.iter().map(|&(_, w)| w.abs()).sum();
    if total > 0.0 {
        for (_, w) in weighted_query.iter_mut() {
            *w /= total;
        }
    }
}

/// Map an external-vocabulary weighted query into the target vocabulary:
/// drop unmapped terms, remap the rest, then normalize.
pub fn normalize_weighted_query_ext(
    weighted_query: &mut WeightedQuery,
    back_map: &HashMap<TermId, TermId>,
) {
    weighted_query.retain_mut(|entry| match back_map.get(&entry.0) {
        Some(&target_id) => {
            entry.0 = target_id;
            true
        }
        None => false,
    });
    normalize_weighted_query(weighted_query);
}

/// Remap a raw term-id query across vocabularies, dropping unmapped terms.
pub fn query_from_ext_to_src(query: &mut Vec<TermId>, back_map: &HashMap<TermId, TermId>) {
    query.retain_mut(|term| match back_map.get(term) {
        Some(&target_id) => {
            *term = target_id;
            true
        }
        None => false,
    });
}

/// Interpolate the original query into the expansion model: expansion
/// weights are scaled by `1 - lambda` and every original term occurrence
/// adds `lambda / |q|`.
pub fn add_original_query(lambda: f64, weighted_query: &mut WeightedQuery, query: &[TermId]) {
    for (_, w) in weighted_query.iter_mut() {
        *w *= 1.0 - lambda;
    }
    if query.is_empty() {
        return;
    }
    let per_term = lambda / query.len() as f64;
    for &term in query {
        match weighted_query.iter_mut().find(|(t, _)| *t == term) {
            Some((_, w)) => *w += per_term,
            None => weighted_query.push((term, per_term)),
        }
    }
}
