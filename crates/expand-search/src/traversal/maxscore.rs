//! MaxScore: essential/non-essential list partitioning.
//!
//! Lists are ordered by their maximum contribution. Once the threshold
//! exceeds the combined bound of a prefix of lists, those become
//! non-essential: no document drawn only from them can enter the top-k, so
//! they are consulted (via `next_geq`) only to complete the score of a
//! candidate found in the essential lists, and dropped early when even the
//! remaining bound cannot lift the candidate over the threshold.

use expand_store::postings::{PostingCursor, PostingIndex};
use expand_store::ranker::Ranker;
use expand_store::wand::WandData;
use expand_store::{DocId, StoreResult, TermId};

use super::{prepare_cursors, Counters, SearchResults};
use crate::topk::TopK;

/// Evaluate `terms` and return the top `k` documents.
pub fn maxscore<I: PostingIndex>(
    index: &I,
    wdata: &WandData,
    ranker: &Ranker,
    terms: &[TermId],
    k: usize,
) -> StoreResult<SearchResults> {
    if terms.is_empty() {
        return Ok(SearchResults::default());
    }
    let mut counters = Counters::default();
    let mut topk = TopK::new(k);
    let q_len = terms.len() as f64;
    let num_docs = index.num_docs() as DocId;

    let mut cursors = prepare_cursors(index, wdata, ranker, terms)?;
    // Ascending by list upper bound; the cheapest lists go non-essential
    // first.
    let mut order: Vec<usize> = (0..cursors.len()).collect();
    order.sort_by(|&a, &b| {
        cursors[a]
            .max_term_weight
            .partial_cmp(&cursors[b].max_term_weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Prefix sums of term bounds, and prefix maxima of the static document
    // weight scaled by query length.
    let mut upper_bounds = vec![0.0f64; order.len()];
    let mut doc_weight_bounds = vec![0.0f64; order.len()];
    let mut max_static_weight = f64::MIN;
    for p in 0..order.len() {
        let prev = if p == 0 { 0.0 } else { upper_bounds[p - 1] };
        upper_bounds[p] = prev + cursors[order[p]].max_term_weight;
        max_static_weight = max_static_weight.max(cursors[order[p]].max_doc_weight);
        doc_weight_bounds[p] = max_static_weight * q_len;
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
        let mut score = ranker.document_weight(norm_len) * q_len;
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

        // Complete with non-essential lists, strongest bound first,
        // stopping once the remaining bound cannot save the candidate.
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
