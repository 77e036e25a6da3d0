//! MaxScore over a weighted query.
//!
//! The second retrieval stage consumes the expansion output directly: a
//! list of `(term, weight)` pairs. Each term's contribution is
//! `weight * doc_term_weight(...)`, its traversal bound is
//! `weight * max_term_weight(term)`, and the static document weight is
//! scaled by the total query mass `L = sum of weights` instead of a token
//! count. Weights are non-negative by construction (they come from
//! normalized, interpolated relevance models), which keeps the bounds
//! sound.

use expand_store::postings::{PostingCursor, PostingIndex};
use expand_store::ranker::Ranker;
use expand_store::wand::WandData;
use expand_store::{DocId, StoreResult};

use super::{Counters, ScoredCursor, SearchResults};
use crate::expansion::WeightedQuery;
use crate::topk::TopK;

/// Evaluate a weighted query and return the top `k` documents.
pub fn weighted_maxscore<I: PostingIndex>(
    index: &I,
    wdata: &WandData,
    ranker: &Ranker,
    weighted_query: &WeightedQuery,
    k: usize,
) -> StoreResult<SearchResults> {
    if weighted_query.is_empty() {
        return Ok(SearchResults::default());
    }
    debug_assert!(weighted_query.iter().all(|&(_, w)| w >= 0.0));
    let mut counters = Counters::default();
    let mut topk = TopK::new(k);
    let query_mass: f64 = weighted_query.iter().map(|&(_, w)| w).sum();
    let num_docs = index.num_docs() as DocId;

    let mut cursors = Vec::with_capacity(weighted_query.len());
    for &(term, weight) in weighted_query {
        let cursor = index.cursor(term)?;
        cursors.push(ScoredCursor {
            cursor,
            q_weight: weight,
            max_term_weight: weight * wdata.max_term_weight(term),
            max_doc_weight: wdata.max_document_weight(term),
            ctf: wdata.ctf(term),
        });
    }
    let mut order: Vec<usize> = (0..cursors.len()).collect();
    order.sort_by(|&a, &b| {
        cursors[a]
            .max_term_weight
            .partial_cmp(&cursors[b].max_term_weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut upper_bounds = vec![0.0f64; order.len()];
    let mut doc_weight_bounds = vec![0.0f64; order.len()];
    let mut max_static_weight = f64::MIN;
    for p in 0..order.len() {
        let prev = if p == 0 { 0.0 } else { upper_bounds[p - 1] };
        upper_bounds[p] = prev + cursors[order[p]].max_term_weight;
        max_static_weight = max_static_weight.max(cursors[order[p]].max_doc_weight);
        doc_weight_bounds[p] = max_static_weight * query_mass;
    }

    let mut non_essential = 0usize;
    let mut cur_doc = order
        .iter()
        .map(|&i| cursors[i].cursor.docid())
        .min()
        .unwrap_or(num_docs);

    while non_essential < order.len() && cur_doc < num_docs {
        counters.unique_pivots += 1;
        let norm_len = wdata.norm_len(cur_doc);
        let mut score = ranker.document_weight(norm_len) * query_mass;
        let mut next_doc = num_docs;

        for p in non_essential..order.len() {
            let i = order[p];
            if cursors[i].cursor.docid() == cur_doc {
                counters.postings_scored += 1;
                score += cursors[i].q_weight
                    * ranker.doc_term_weight(
                        u64::from(cursors[i].cursor.freq()),
                        norm_len,
                        cursors[i].ctf,
                    );
                cursors[i].cursor.next();
            }
            next_doc = next_doc.min(cursors[i].cursor.docid());
        }

        for p in (0..non_essential).rev() {
            if !topk.would_enter(score + upper_bounds[p]) {
                break;
            }
            let i = order[p];
            cursors[i].cursor.next_geq(cur_doc);
            if cursors[i].cursor.docid() == cur_doc {
                counters.postings_scored += 1;
                score += cursors[i].q_weight
                    * ranker.doc_term_weight(
                        u64::from(cursors[i].cursor.freq()),
                        norm_len,
                        cursors[i].ctf,
                    );
            }
        }

        if topk.insert(score, cur_doc) {
            while non_essential < order.len()
                && !topk.would_enter(
                    upper_bounds[non_essential] + doc_weight_bounds[non_essential],
                )
            {
                non_essential += 1;
            }
        }

        cur_doc = next_doc;
    }

    Ok(SearchResults {
        topk: topk.finalize(),
        counters,
    })
}
