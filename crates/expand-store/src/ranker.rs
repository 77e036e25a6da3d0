//! Scoring functions.
//!
//! A ranker computes the per-posting and per-document score contributions
//! used both at query time and when precomputing WAND metadata. Two variants
//! are provided:
//!
//! - **BM25** (`k1 = 0.9`, `b = 0.4`): document-length-normalized term
//!   frequency saturation with an IDF floor.
//! - **LM-Dirichlet** (`mu = 2500`): query-likelihood scoring where the
//!   length-dependent part is a static per-document weight added once per
//!   query term.
//!
//! The numeric identifier of each variant is persisted inside WAND metadata
//! files, so the discriminants must never be permuted.

/// Stable ranker identifiers, as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RankerKind {
    /// Okapi BM25.
    Bm25 = 0,
    /// Language model with Dirichlet smoothing.
    LmDirichlet = 1,
}

impl RankerKind {
    /// Resolve a stored identifier. Unknown values are a hard error for
    /// callers; loading proceeds only with a known ranker.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(RankerKind::Bm25),
            1 => Some(RankerKind::LmDirichlet),
            _ => None,
        }
    }

    /// Resolve a ranker by its command-line name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "BM25" => Some(RankerKind::Bm25),
            "LMDS" => Some(RankerKind::LmDirichlet),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RankerKind::Bm25 => "BM25",
            RankerKind::LmDirichlet => "LMDS",
        }
    }

    pub fn id(&self) -> u32 {
        *self as u32
    }
}

const BM25_K1: f64 = 0.9;
const BM25_B: f64 = 0.4;
const BM25_EPSILON: f64 = 1.0e-6;
const LM_MU: f64 = 2500.0;

/// A ranker bound to collection statistics.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    kind: RankerKind,
    avg_doclen: f64,
    num_docs: f64,
    terms_in_collection: f64,
}

impl Ranker {
    pub fn new(kind: RankerKind, avg_doclen: f64, num_docs: f64, terms_in_collection: f64) -> Self {
        Self {
            kind,
            avg_doclen,
            num_docs,
            terms_in_collection,
        }
    }

    pub fn kind(&self) -> RankerKind {
        self.kind
    }

    /// The stored, ranker-specific length normalization of a document.
    ///
    /// BM25 stores `len / avg_len`; LM-Dirichlet keeps the raw length.
    pub fn norm_len(&self, doc_len: f64) -> f64 {
        match self.kind {
            RankerKind::Bm25 => doc_len / self.avg_doclen,
            RankerKind::LmDirichlet => doc_len,
        }
    }

    /// Contribution of a single posting with frequency `f_dt` in a document
    /// with normalized length `norm_len`, for a term with collection
    /// frequency `ctf`.
    pub fn doc_term_weight(&self, f_dt: u64, norm_len: f64, ctf: u32) -> f64 {
        let f = f_dt as f64;
        match self.kind {
            RankerKind::Bm25 => f / (f + BM25_K1 * (1.0 - BM25_B + BM25_B * norm_len)),
            RankerKind::LmDirichlet => {
                ((f / LM_MU) * (self.terms_in_collection / f64::from(ctf)) + 1.0).ln()
            }
        }
    }

    /// Query-side weight of a term with query frequency `f_qt` appearing in
    /// `df` documents.
    pub fn query_term_weight(&self, f_qt: u64, df: u64) -> f64 {
        match self.kind {
            RankerKind::Bm25 => {
                let f = f_qt as f64;
                let fdf = df as f64;
                let idf = ((self.num_docs - fdf + 0.5) / (fdf + 0.5)).ln();
                f * idf.max(BM25_EPSILON) * (1.0 + BM25_K1)
            }
            RankerKind::LmDirichlet => 1.0,
        }
    }

    /// Static per-document weight, added once per query term occurrence.
    ///
    /// Zero for BM25; `ln(mu / (mu + len))` for LM-Dirichlet, which is
    /// always non-positive and must be folded into traversal upper bounds.
    pub fn document_weight(&self, norm_len: f64) -> f64 {
        match self.kind {
            RankerKind::Bm25 => 0.0,
            RankerKind::LmDirichlet => (LM_MU / (LM_MU + norm_len)).ln(),
        }
    }

    pub fn average_doclen(&self) -> f64 {
        self.avg_doclen
    }

    pub fn num_docs(&self) -> f64 {
        self.num_docs
    }

    pub fn terms_in_collection(&self) -> f64 {
        self.terms_in_collection
    }
}
