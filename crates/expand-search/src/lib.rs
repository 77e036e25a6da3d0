//! Query-time machinery for disk-resident top-k retrieval with
//! pseudo-relevance-feedback expansion.
//!
//! The pipeline for a single query:
//!
//! 1. First-stage dynamic-pruning traversal ([`traversal`]) over the
//!    inverted index produces the pseudo-relevant top-k.
//! 2. Relevance-model estimation ([`expansion`]) over those documents'
//!    forward vectors produces a weighted expansion query, interpolated
//!    with the original query.
//! 3. A weighted second-stage traversal scores the expanded query.
//!
//! In multi-corpus mode ([`orchestrator`]) steps 1-2 fan out over external
//! corpora whose vocabularies are remapped into the target's, every
//! second stage runs against the target index, and the rankings are fused
//! by reciprocal rank ([`fusion`]). A sampler variant ([`sampler`]) draws
//! bag-of-words sub-queries from the expansion model instead.
//!
//! The on-disk structures these components read live in `expand-store`.

pub mod config;
pub mod error;
pub mod expansion;
pub mod fusion;
pub mod orchestrator;
pub mod query;
pub mod sampler;
pub mod topk;
pub mod traversal;
pub mod trec;

pub use error::{SearchError, SearchResult};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::config::CollectionConfig;
    pub use crate::expansion::{
        add_original_query, normalize_weighted_query, normalize_weighted_query_ext,
        query_from_ext_to_src, rm_expansion, WeightedQuery,
    };
    pub use crate::fusion::reciprocal_rank_fusion;
    pub use crate::orchestrator::{Corpus, CorpusSet};
    pub use crate::query::{parse_query, query_term_freqs, read_string_queries, read_termid_queries};
    pub use crate::sampler::WeightedSampler;
    pub use crate::topk::{TopK, TopKList};
    pub use crate::traversal::{
        block_max_wand, maxscore, ranked_or, wand, weighted_maxscore, Counters, Engine,
        SearchResults,
    };
    pub use crate::trec::output_trec;
    pub use crate::{SearchError, SearchResult};
    pub use expand_store::postings::{MemoryIndex, PlainIndex, PostingCursor, PostingIndex};
    pub use expand_store::ranker::{Ranker, RankerKind};
    pub use expand_store::wand::{Partitioning, WandData, WandParams};
    pub use expand_store::{DocId, TermId};
}
