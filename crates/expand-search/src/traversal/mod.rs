//! Document-at-a-time traversal engines.
//!
//! All engines share the same contract: given a posting index, WAND
//! metadata, a ranker, a term-id query (duplicates counted into query-term
//! frequencies) and `k`, produce the finalized top-k plus profiling
//! counters. An empty query is a no-op returning empty results.
//!
//! A candidate document's score is
//!
//! ```text
//! L * document_weight(norm_len(d))
//!   + sum over matching terms of q_weight(t) * doc_term_weight(f_dt, norm_len(d), ctf(t))
//! ```
//!
//! where `L` is the query length including duplicates. The static
//! document-weight term is zero for BM25 and non-positive for LM-Dirichlet;
//! every pruning bound below carries it via the maximum static weight seen
//! across the query's lists.

pub mod block_max_wand;
pub mod maxscore;
pub mod ranked_or;
pub mod wand;
pub mod weighted_maxscore;

use expand_store::postings::{PostingCursor, PostingIndex};
use expand_store::ranker::Ranker;
use expand_store::wand::WandData;
use expand_store::{StoreResult, TermId};

use crate::query::query_term_freqs;
use crate::topk::TopKList;

pub use block_max_wand::block_max_wand;
pub use maxscore::maxscore;
pub use ranked_or::ranked_or;
pub use wand::wand;
pub use weighted_maxscore::weighted_maxscore;

/// Work done by a traversal: candidates evaluated and postings scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub unique_pivots: u64,
    pub postings_scored: u64,
}

/// A finalized ranking plus its profiling counters.
#[derive(Debug, Default)]
pub struct SearchResults {
    pub topk: TopKList,
    pub counters: Counters,
}

/// Per-term traversal state: the posting cursor and the precomputed
/// query-side weights and bounds.
pub(crate) struct ScoredCursor<C> {
    pub cursor: C,
    pub q_weight: f64,
    pub max_term_weight: f64,
    pub max_doc_weight: f64,
    pub ctf: u32,
}

/// Build one [`ScoredCursor`] per distinct query term.
pub(crate) fn prepare_cursors<'a, I: PostingIndex>(
    index: &'a I,
    wdata: &WandData,
    ranker: &Ranker,
    terms: &[TermId],
) -> StoreResult<Vec<ScoredCursor<I::Cursor<'a>>>> {
    let freqs = query_term_freqs(terms);
    let mut cursors = Vec::with_capacity(freqs.len());
    for (term, f_qt) in freqs {
        let cursor = index.cursor(term)?;
        let q_weight = ranker.query_term_weight(f_qt, cursor.size() as u64);
        cursors.push(ScoredCursor {
            cursor,
            q_weight,
            max_term_weight: q_weight * wdata.max_term_weight(term),
            max_doc_weight: wdata.max_document_weight(term),
            ctf: wdata.ctf(term),
        });
    }
    Ok(cursors)
}

/// Restore docid order after exactly one cursor advanced: bubble it right.
pub(crate) fn bubble_right<C: PostingCursor>(
    cursors: &[ScoredCursor<C>],
    order: &mut [usize],
    from: usize,
) {
    for i in from + 1..order.len() {
        if cursors[order[i]].cursor.docid() < cursors[order[i - 1]].cursor.docid() {
            order.swap(i, i - 1);
        } else {
            break;
        }
    }
}

/// Engine selector for the front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Wand,
    BlockMaxWand,
    MaxScore,
    RankedOr,
}

impl Engine {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wand" => Some(Engine::Wand),
            "block_max_wand" => Some(Engine::BlockMaxWand),
            "maxscore" => Some(Engine::MaxScore),
            "ranked_or" => Some(Engine::RankedOr),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Engine::Wand => "wand",
            Engine::BlockMaxWand => "block_max_wand",
            Engine::MaxScore => "maxscore",
            Engine::RankedOr => "ranked_or",
        }
    }

    /// Run the selected engine.
    pub fn run<I: PostingIndex>(
        &self,
        index: &I,
        wdata: &WandData,
        ranker: &Ranker,
        terms: &[TermId],
        k: usize,
    ) -> StoreResult<SearchResults> {
        match self {
            Engine::Wand => wand(index, wdata, ranker, terms, k),
            Engine::BlockMaxWand => block_max_wand(index, wdata, ranker, terms, k),
            Engine::MaxScore => maxscore(index, wdata, ranker, terms, k),
            Engine::RankedOr => ranked_or(index, wdata, ranker, terms, k),
        }
    }
}
