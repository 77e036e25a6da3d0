//! WAND: pivot-based dynamic pruning with list-level upper bounds.

use expand_store::postings::{PostingCursor, PostingIndex};
use expand_store::ranker::Ranker;
use expand_store::wand::WandData;
use expand_store::{DocId, StoreResult, TermId};

use super::{bubble_right, prepare_cursors, Counters, SearchResults};
use crate::topk::TopK;

/// Evaluate `terms` and return the top `k` documents.
pub fn wand<I: PostingIndex>(
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
    let mut order: Vec<usize> = (0..cursors.len()).collect();
    order.sort_by_key(|&i| cursors[i].cursor.docid());

    loop {
        // Find the pivot: the shortest prefix whose cumulative bound beats
        // the threshold. The static document weight enters scaled by the
        // query length, mirroring how it enters real scores.
        let mut upper_bound = 0.0f64;
        let mut max_static_weight = f64::MIN;
        let mut pivot = None;
        for (p, &i) in order.iter().enumerate() {
            if cursors[i].cursor.docid() == num_docs {
                break;
            }
            max_static_weight = max_static_weight.max(cursors[i].max_doc_weight);
            upper_bound += cursors[i].max_term_weight;
            if topk.would_enter(q_len * max_static_weight + upper_bound) {
                pivot = Some(p);
                break;
            }
        }
        let Some(pivot) = pivot else { break };

        let pivot_doc = cursors[order[pivot]].cursor.docid();
        if cursors[order[0]].cursor.docid() == pivot_doc {
            // All lists up to the pivot are aligned: score the candidate.
            counters.unique_pivots += 1;
            let norm_len = wdata.norm_len(pivot_doc);
            let mut score = ranker.document_weight(norm_len) * q_len;
            for p in 0..order.len() {
                let i = order[p];
                if cursors[i].cursor.docid() != pivot_doc {
                    break;
                }
                counters.postings_scored += 1;
                score += cursors[i].q_weight
                    * ranker.doc_term_weight(
                        u64::from(cursors[i].cursor.freq()),
                        norm_len,
                        cursors[i].ctf,
                    );
                cursors[i].cursor.next();
            }
            topk.insert(score, pivot_doc);
            order.sort_by_key(|&i| cursors[i].cursor.docid());
        } else {
            // Move the farthest list below the pivot up to the pivot doc.
            let mut moved = pivot;
            while cursors[order[moved]].cursor.docid() == pivot_doc {
                moved -= 1;
            }
            cursors[order[moved]].cursor.next_geq(pivot_doc);
            bubble_right(&cursors, &mut order, moved);
        }
    }

    Ok(SearchResults {
        topk: topk.finalize(),
        counters,
    })
}
