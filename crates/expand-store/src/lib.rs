//! Disk-resident index structures for top-k retrieval with relevance-model
//! query expansion.
//!
//! This crate holds everything that is built offline and memory-mapped
//! read-only at query time:
//!
//! - [`postings`]: the posting-cursor capability traversal engines consume,
//!   plus a plain uncompressed reader and an in-memory index
//! - [`docvector`]: the compressed forward index (per-document term vectors)
//!   relevance-model expansion reads
//! - [`wand`]: per-list and per-block score upper bounds, document lengths,
//!   and collection statistics
//! - [`lexicon`], [`collection`]: the text and binary input formats the
//!   builders and query front-ends consume
//! - [`ranker`]: the scoring functions shared by the builders and the
//!   traversal engines
//! - [`codec`]: the integer compression primitives underneath
//!
//! Query-time algorithms (traversal, expansion, fusion) live in
//! `expand-search`; this crate only knows how to lay data out and hand out
//! cursors over it.

pub mod codec;
pub mod collection;
pub mod docvector;
pub mod error;
pub mod lexicon;
pub mod postings;
pub mod ranker;
pub mod wand;

/// Term identifier, dense per collection.
pub type TermId = u32;

/// Document identifier, dense in `[0, num_docs)`.
pub type DocId = u32;

pub use error::{StoreError, StoreResult};
