//! Weighted sampling of bag-of-words queries from a relevance model.
//!
//! The sampler-based pipeline variant draws whole queries from the
//! expansion distribution instead of running one weighted query: build the
//! CDF, draw a uniform length, then draw terms i.i.d. by inverse-CDF
//! bisection. The generator is seeded for reproducible runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use expand_store::TermId;

use crate::expansion::WeightedQuery;

/// Seeded query generator.
pub struct WeightedSampler {
    rng: ChaCha8Rng,
}

impl WeightedSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draw one query of uniform length in `min..=max` from the model.
    pub fn generate_query(
        &mut self,
        model: &WeightedQuery,
        min: u32,
        max: u32,
    ) -> Vec<TermId> {
        if model.is_empty() {
            return Vec::new();
        }
        let mut cdf = Vec::with_capacity(model.len());
        let mut cumulative = 0.0f64;
        for &(_, w) in model {
            cumulative += w;
            cdf.push(cumulative);
        }
        if cumulative <= 0.0 {
            return Vec::new();
        }

        let n = self.rng.gen_range(min..=max) as usize;
        let mut query = Vec::with_capacity(n);
        for _ in 0..n {
            let target: f64 = self.rng.gen_range(0.0..cumulative);
            query.push(model[bisect(&cdf, target)].0);
        }
        query
    }

    /// Draw `batch_size` queries; each original query term is appended to
    /// each generated query with probability one half.
    pub fn generate_query_batch(
        &mut self,
        model: &WeightedQuery,
        original: &[TermId],
        min: u32,
        max: u32,
        batch_size: usize,
    ) -> Vec<Vec<TermId>> {
        let mut batch = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let mut query = self.generate_query(model, min, max);
            for &term in original {
                if self.rng.gen_bool(0.5) {
                    query.push(term);
                }
            }
            batch.push(query);
        }
        batch
    }
}

/// Smallest index `i` with `cdf[i] >= target`; the last index when the
/// target exceeds the accumulated mass.
fn bisect(cdf: &[f64], target: f64) -> usize {
    let pos = cdf.partition_point(|&c| c < target);
    pos.min(cdf.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bisect_finds_smallest_not_less() {
        let cdf = [0.2, 0.5, 0.9, 1.0];
        assert_eq!(bisect(&cdf, 0.0), 0);
        assert_eq!(bisect(&cdf, 0.2), 0);
        assert_eq!(bisect(&cdf, 0.21), 1);
        assert_eq!(bisect(&cdf, 0.95), 3);
        assert_eq!(bisect(&cdf, 2.0), 3);
    }

    #[test]
    fn query_lengths_respect_bounds() {
        let model: WeightedQuery = vec![(0, 0.5), (1, 0.3), (2, 0.2)];
        let mut sampler = WeightedSampler::new(7);
        for _ in 0..50 {
            let q = sampler.generate_query(&model, 5, 15);
            assert!(q.len() >= 5 && q.len() <= 15);
            assert!(q.iter().all(|&t| t <= 2));
        }
    }

    #[test]
    fn same_seed_same_queries() {
        let model: WeightedQuery = vec![(3, 0.6), (9, 0.4)];
        let mut a = WeightedSampler::new(42);
        let mut b = WeightedSampler::new(42);
        assert_eq!(
            a.generate_query_batch(&model, &[1, 2], 5, 15, 4),
            b.generate_query_batch(&model, &[1, 2], 5, 15, 4)
        );
    }

    #[test]
    fn heavy_terms_dominate_samples() {
        let model: WeightedQuery = vec![(0, 0.95), (1, 0.05)];
        let mut sampler = WeightedSampler::new(11);
        let mut counts = [0usize; 2];
        for _ in 0..200 {
            for t in sampler.generate_query(&model, 5, 15) {
                counts[t as usize] += 1;
            }
        }
        assert!(counts[0] > counts[1] * 4);
    }

    #[test]
    fn empty_model_yields_empty_query() {
        let mut sampler = WeightedSampler::new(1);
        assert!(sampler.generate_query(&Vec::new(), 5, 15).is_empty());
    }
}
