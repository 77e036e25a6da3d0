//! Bounded top-k accumulator.
//!
//! A min-heap of at most `k` `(score, docid)` entries. The admission
//! threshold is the k-th best score once the heap is full; `would_enter` is
//! the side-effect-free test the traversal engines call in their hot loops.
//! Ties on score are broken by insertion order: the admission test is a
//! strict `>`, so an equal later score never evicts an earlier one.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use expand_store::DocId;

/// Ranked results, best first.
pub type TopKList = Vec<(f64, DocId)>;

struct Entry {
    score: f64,
    docid: DocId,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Order by score only; docid is payload, not a tie-breaker.
        self.score.partial_cmp(&other.score).unwrap_or(Ordering::Equal)
    }
}

/// Min-heap of size `k` with threshold query.
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<Entry>>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Current admission threshold: the smallest held score once full,
    /// negative infinity before that.
    pub fn threshold(&self) -> f64 {
        if self.heap.len() < self.k {
            f64::NEG_INFINITY
        } else {
            self.heap.peek().map_or(f64::NEG_INFINITY, |e| e.0.score)
        }
    }

    /// Would a document scoring `score` be admitted right now?
    pub fn would_enter(&self, score: f64) -> bool {
        self.heap.len() < self.k || score > self.threshold()
    }

    /// Insert, evicting the current minimum if full. Returns whether the
    /// entry was admitted.
    pub fn insert(&mut self, score: f64, docid: DocId) -> bool {
        if self.k == 0 {
            return false;
        }
        if self.heap.len() < self.k {
            self.heap.push(Reverse(Entry { score, docid }));
            true
        } else if score > self.threshold() {
            self.heap.pop();
            self.heap.push(Reverse(Entry { score, docid }));
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Drain into a list sorted by score descending, dropping entries with
    /// non-positive scores.
    pub fn finalize(self) -> TopKList {
        let mut results: Vec<(f64, DocId)> = self
            .heap
            .into_iter()
            .map(|Reverse(e)| (e.score, e.docid))
            .collect();
        results.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        let keep = results.partition_point(|&(s, _)| s > 0.0);
        results.truncate(keep);
        results
    }
}
