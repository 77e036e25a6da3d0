//! BlockMax-WAND: WAND's pivot search refined with per-block upper bounds.
//!
//! After the list-level bound admits a pivot, the pivot's block maxima are
//! consulted. If even they cannot beat the threshold the engine jumps past
//! the current block configuration; otherwise the candidate is scored with
//! progressive bound tightening, abandoning the document as soon as the
//! remaining bound falls under the threshold.

use expand_store::postings::{PostingCursor, PostingIndex};
use expand_store::ranker::Ranker;
use expand_store::wand::{BlockCursor, WandData};
use expand_store::{DocId, StoreResult, TermId};

use crate::query::query_term_freqs;
use crate::topk::TopK;

use super::{Counters, SearchResults};

struct BlockScoredCursor<'w, C> {
    cursor: C,
    blocks: BlockCursor<'w>,
    q_weight: f64,
    max_term_weight: f64,
    max_doc_weight: f64,
    ctf: u32,
}

/// Evaluate `terms` and return the top `k` documents.
pub fn block_max_wand<I: PostingIndex>(
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

    let freqs = query_term_freqs(terms);
    let mut cursors = Vec::with_capacity(freqs.len());
    for (term, f_qt) in freqs {
        let cursor = index.cursor(term)?;
        let q_weight = ranker.query_term_weight(f_qt, cursor.size() as u64);
        cursors.push(BlockScoredCursor {
            cursor,
            blocks: wdata.block_cursor(term)?,
            q_weight,
            max_term_weight: q_weight * wdata.max_term_weight(term),
            max_doc_weight: wdata.max_document_weight(term),
            ctf: wdata.ctf(term),
        });
    }
    let mut order: Vec<usize> = (0..cursors.len()).collect();
    order.sort_by_key(|&i| cursors[i].cursor.docid());

    loop {
        // List-level pivot search, extended rightward over ties so every
        // list positioned on the pivot document participates.
        let mut upper_bound = 0.0f64;
        let mut max_static_weight = f64::MIN;
        let mut pivot = None;
        let mut pivot_doc = num_docs;
        for (p, &i) in order.iter().enumerate() {
            if cursors[i].cursor.docid() == num_docs {
                break;
            }
            max_static_weight = max_static_weight.max(cursors[i].max_doc_weight);
            upper_bound += cursors[i].max_term_weight;
            if topk.would_enter(q_len * max_static_weight + upper_bound) {
                pivot_doc = cursors[i].cursor.docid();
                let mut extended = p;
                while extended + 1 < order.len()
                    && cursors[order[extended + 1]].cursor.docid() == pivot_doc
                {
                    extended += 1;
                }
                pivot = Some(extended);
                break;
            }
        }
        let Some(pivot) = pivot else { break };

        // Align block cursors and take the block-level bound.
        let mut block_upper_bound = 0.0f64;
        let mut block_static_weight = f64::MIN;
        for p in 0..=pivot {
            let i = order[p];
            if cursors[i].blocks.docid() < pivot_doc {
                cursors[i].blocks.next_geq(pivot_doc);
            }
            block_upper_bound += cursors[i].blocks.score() * cursors[i].q_weight;
            // The term-level static weight stands in for a block-level one;
            // quantized stores do not keep per-block document weights.
            block_static_weight = block_static_weight.max(cursors[i].max_doc_weight);
        }

        if topk.would_enter(block_upper_bound + block_static_weight * q_len) {
            if cursors[order[0]].cursor.docid() == pivot_doc {
                counters.unique_pivots += 1;
                let norm_len = wdata.norm_len(pivot_doc);
                let mut score = q_len * ranker.document_weight(norm_len);
                // The true static weight replaces its bound, tightening the
                // running estimate before any posting is scored.
                let mut running_bound = block_upper_bound + score;

                for p in 0..order.len() {
                    let i = order[p];
                    if cursors[i].cursor.docid() != pivot_doc {
                        break;
                    }
                    counters.postings_scored += 1;
                    let part = cursors[i].q_weight
                        * ranker.doc_term_weight(
                            u64::from(cursors[i].cursor.freq()),
                            norm_len,
                            cursors[i].ctf,
                        );
                    score += part;
                    running_bound -= cursors[i].blocks.score() * cursors[i].q_weight - part;
                    if !topk.would_enter(running_bound) {
                        break;
                    }
                }
                for p in 0..order.len() {
                    let i = order[p];
                    if cursors[i].cursor.docid() != pivot_doc {
                        break;
                    }
                    cursors[i].cursor.next();
                }

                topk.insert(score, pivot_doc);
                order.sort_by_key(|&i| cursors[i].cursor.docid());
            } else {
                let mut moved = pivot;
                while cursors[order[moved]].cursor.docid() == pivot_doc {
                    moved -= 1;
                }
                cursors[order[moved]].cursor.next_geq(pivot_doc);
                for i in moved + 1..order.len() {
                    if cursors[order[i]].cursor.docid() <= cursors[order[i - 1]].cursor.docid() {
                        order.swap(i, i - 1);
                    } else {
                        break;
                    }
                }
            }
        } else {
            // Block skip: even the block maxima cannot reach the threshold.
            // Advance the heaviest list past the shortest current block.
            let mut moved = pivot;
            let mut best_weight = cursors[order[moved]].q_weight;
            for p in 0..pivot {
                if cursors[order[p]].q_weight > best_weight {
                    moved = p;
                    best_weight = cursors[order[p]].q_weight;
                }
            }

            let mut next_jump = if pivot + 1 < order.len() {
                cursors[order[pivot + 1]].cursor.docid()
            } else {
                num_docs - 1
            };
            for p in 0..=pivot {
                next_jump = next_jump.min(cursors[order[p]].blocks.docid());
            }

            let mut next = next_jump + 1;
            if pivot + 1 < order.len() {
                next = next.min(cursors[order[pivot + 1]].cursor.docid());
            }
            if next <= cursors[order[pivot]].cursor.docid() {
                next = cursors[order[pivot]].cursor.docid() + 1;
            }

            cursors[order[moved]].cursor.next_geq(next);
            for i in moved + 1..order.len() {
                if cursors[order[i]].cursor.docid() < cursors[order[i - 1]].cursor.docid() {
                    order.swap(i, i - 1);
                } else {
                    break;
                }
            }
        }
    }

    Ok(SearchResults {
        topk: topk.finalize(),
        counters,
    })
}
