//! Exhaustive disjunctive evaluation: the correctness oracle.
//!
//! Every document present in any query list is scored exactly; no pruning.
//! The dynamic-pruning engines are tested against this one.

use expand_store::postings::{PostingCursor, PostingIndex};
use expand_store::ranker::Ranker;
use expand_store::wand::WandData;
use expand_store::{DocId, StoreResult, TermId};

use super::{prepare_cursors, Counters, SearchResults};
use crate::topk::TopK;

/// Evaluate `terms` and return the top `k` documents.
pub fn ranked_or<I: PostingIndex>(
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
    let mut cur_doc = cursors
        .iter()
        .map(|c| c.cursor.docid())
        .min()
        .unwrap_or(num_docs);

    while cur_doc < num_docs {
        counters.unique_pivots += 1;
        let norm_len = wdata.norm_len(cur_doc);
        let mut score = ranker.document_weight(norm_len) * q_len;
        let mut next_doc = num_docs;
        for c in cursors.iter_mut() {
            if c.cursor.docid() == cur_doc {
                counters.postings_scored += 1;
                score += c.q_weight
                    * ranker.doc_term_weight(u64::from(c.cursor.freq()), norm_len, c.ctf);
                c.cursor.next();
            }
            next_doc = next_doc.min(c.cursor.docid());
        }
        topk.insert(score, cur_doc);
        cur_doc = next_doc;
    }

    Ok(SearchResults {
        topk: topk.finalize(),
        counters,
    })
}
