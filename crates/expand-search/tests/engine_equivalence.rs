//! The dynamic-pruning engines must agree with exhaustive evaluation.
//!
//! Every pruning engine (WAND, BlockMax-WAND, MaxScore) is checked against
//! RankedOr over the same index, ranker and k, on crafted collections and
//! on randomized ones.

use proptest::prelude::*;

use expand_search::prelude::*;
use expand_store::collection::DocumentSizes;

fn build_wand(
    index: &MemoryIndex,
    lengths: Vec<u32>,
    kind: RankerKind,
    params: &WandParams,
) -> WandData {
    WandData::build(index, &DocumentSizes::new(lengths), kind, params, || {}).unwrap()
}

fn assert_same_topk(expected: &TopKList, actual: &TopKList) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "result depth differs: {:?} vs {:?}",
        expected,
        actual
    );
    for (e, a) in expected.iter().zip(actual) {
        let tolerance = 1e-5 * e.0.abs().max(1.0);
        assert!(
            (e.0 - a.0).abs() <= tolerance,
            "score mismatch: {:?} vs {:?}",
            expected,
            actual
        );
    }
    // Docids may legitimately differ only within exact score ties.
    for (e, a) in expected.iter().zip(actual) {
        if e.1 != a.1 {
            let twin = expected.iter().find(|x| x.1 == a.1).map(|x| x.0);
            assert_eq!(twin, Some(e.0), "rankings disagree beyond ties");
        }
    }
}

fn check_all_engines(index: &MemoryIndex, wand_data: &WandData, terms: &[TermId], k: usize) {
    let ranker = wand_data.ranker();
    let oracle = ranked_or(index, wand_data, &ranker, terms, k).unwrap();
    for engine in [Engine::Wand, Engine::BlockMaxWand, Engine::MaxScore] {
        let results = engine.run(index, wand_data, &ranker, terms, k).unwrap();
        assert_same_topk(&oracle.topk, &results.topk);
    }
}

/// Four documents, one term, a tie on frequency broken by document length.
#[test]
fn bm25_tie_on_frequency() {
    let index = MemoryIndex::new(4, vec![(vec![0, 1, 2, 3], vec![3, 3, 1, 3])]);
    let wand_data = build_wand(
        &index,
        vec![10, 10, 10, 20],
        RankerKind::Bm25,
        &WandParams::default(),
    );
    let ranker = wand_data.ranker();
    let results = wand(&index, &wand_data, &ranker, &[0], 2).unwrap();
    assert_eq!(results.topk.len(), 2);
    for &(_, docid) in &results.topk {
        assert!([0u32, 1, 3].contains(&docid), "doc 2 can never make top-2");
    }
    // The longer document scores strictly lower than the equally-frequent
    // short ones, so it cannot appear before them.
    let k4 = ranked_or(&index, &wand_data, &ranker, &[0], 4).unwrap();
    let rank_of = |d: u32| k4.topk.iter().position(|&(_, x)| x == d).unwrap();
    assert!(rank_of(3) > rank_of(0));
    assert!(rank_of(3) > rank_of(1));
    check_all_engines(&index, &wand_data, &[0], 2);
}

#[test]
fn empty_query_is_a_noop() {
    let index = MemoryIndex::new(4, vec![(vec![0, 1], vec![1, 1])]);
    let wand_data = build_wand(
        &index,
        vec![5, 5, 5, 5],
        RankerKind::Bm25,
        &WandParams::default(),
    );
    let ranker = wand_data.ranker();
    for engine in [
        Engine::Wand,
        Engine::BlockMaxWand,
        Engine::MaxScore,
        Engine::RankedOr,
    ] {
        let results = engine.run(&index, &wand_data, &ranker, &[], 10).unwrap();
        assert!(results.topk.is_empty());
        assert_eq!(results.counters, Counters::default());
    }
    let weighted = weighted_maxscore(&index, &wand_data, &ranker, &Vec::new(), 10).unwrap();
    assert!(weighted.topk.is_empty());
}

/// Both lists open on the same document: the first pivot is that document
/// and both terms contribute to its score in one evaluation.
#[test]
fn pivot_on_first_cursor_scores_all_aligned_lists() {
    let index = MemoryIndex::new(
        8,
        vec![
            (vec![5, 6], vec![2, 1]),
            (vec![5, 7], vec![1, 3]),
        ],
    );
    let wand_data = build_wand(
        &index,
        vec![10; 8],
        RankerKind::Bm25,
        &WandParams::default(),
    );
    let ranker = wand_data.ranker();
    let results = wand(&index, &wand_data, &ranker, &[0, 1], 4).unwrap();
    assert_eq!(results.topk[0].1, 5);
    // Doc 5 is evaluated once, with both postings scored.
    let oracle = ranked_or(&index, &wand_data, &ranker, &[0, 1], 4).unwrap();
    assert_same_topk(&oracle.topk, &results.topk);
    check_all_engines(&index, &wand_data, &[0, 1], 4);
}

/// With k=1 and a dominant document early in the list, later low-scoring
/// blocks fall under the threshold and BlockMax-WAND skips their postings.
#[test]
fn block_skip_avoids_scoring_hopeless_blocks() {
    // Doc 0 has a huge frequency; docs 10..60 have frequency 1 and live in
    // separate blocks. A second term keeps the pivot logic engaged.
    let mut docids = vec![0u32];
    let mut freqs = vec![200u32];
    for d in 10..60 {
        docids.push(d);
        freqs.push(1);
    }
    let index = MemoryIndex::new(
        64,
        vec![
            (docids, freqs),
            (vec![0, 30], vec![150, 1]),
        ],
    );
    let wand_data = build_wand(
        &index,
        vec![300; 64],
        RankerKind::Bm25,
        &WandParams {
            partitioning: Partitioning::Fixed { block_size: 8 },
            quantize: None,
        },
    );
    let ranker = wand_data.ranker();
    let oracle = ranked_or(&index, &wand_data, &ranker, &[0, 1], 1).unwrap();
    let bmw = block_max_wand(&index, &wand_data, &ranker, &[0, 1], 1).unwrap();
    assert_same_topk(&oracle.topk, &bmw.topk);
    assert_eq!(bmw.topk[0].1, 0);
    // The oracle scores every posting; BMW must have skipped most of them.
    assert!(
        bmw.counters.postings_scored < oracle.counters.postings_scored / 2,
        "expected block skips: bmw={} oracle={}",
        bmw.counters.postings_scored,
        oracle.counters.postings_scored
    );
}

/// Scaling all weights scales all scores; the ranking is unchanged.
#[test]
fn weighted_maxscore_is_scale_invariant() {
    let index = MemoryIndex::new(
        6,
        vec![
            (vec![0, 2, 4], vec![2, 1, 3]),
            (vec![1, 2, 5], vec![1, 2, 1]),
            (vec![0, 5], vec![1, 2]),
        ],
    );
    let wand_data = build_wand(
        &index,
        vec![8, 6, 9, 4, 7, 8],
        RankerKind::Bm25,
        &WandParams::default(),
    );
    let ranker = wand_data.ranker();
    let base: WeightedQuery = vec![(0, 0.5), (1, 0.3), (2, 0.2)];
    let doubled: WeightedQuery = base.iter().map(|&(t, w)| (t, 2.0 * w)).collect();
    let r1 = weighted_maxscore(&index, &wand_data, &ranker, &base, 6).unwrap();
    let r2 = weighted_maxscore(&index, &wand_data, &ranker, &doubled, 6).unwrap();
    assert_eq!(r1.topk.len(), r2.topk.len());
    for (a, b) in r1.topk.iter().zip(&r2.topk) {
        assert_eq!(a.1, b.1);
        assert!((b.0 - 2.0 * a.0).abs() < 1e-9);
    }
}

/// Weighted evaluation with the interpolated original query agrees with the
/// oracle computed by hand from per-term contributions.
#[test]
fn weighted_maxscore_matches_manual_scores() {
    let index = MemoryIndex::new(
        4,
        vec![(vec![0, 2], vec![3, 1]), (vec![1, 2], vec![2, 2])],
    );
    let wand_data = build_wand(
        &index,
        vec![5, 5, 5, 5],
        RankerKind::Bm25,
        &WandParams::default(),
    );
    let ranker = wand_data.ranker();
    let weighted: WeightedQuery = vec![(0, 0.7), (1, 0.3)];
    let results = weighted_maxscore(&index, &wand_data, &ranker, &weighted, 4).unwrap();
    for &(score, docid) in &results.topk {
        let mut expected = 0.0;
        for &(t, w) in &weighted {
            let mut cursor = index.cursor(t).unwrap();
            cursor.next_geq(docid);
            if cursor.docid() == docid {
                expected += w
                    * ranker.doc_term_weight(
                        u64::from(cursor.freq()),
                        wand_data.norm_len(docid),
                        wand_data.ctf(t),
                    );
            }
        }
        assert!((score - expected).abs() < 1e-9);
    }
}

#[test]
fn lm_dirichlet_engines_agree() {
    // Frequencies high enough that total scores stay positive and survive
    // finalization.
    let index = MemoryIndex::new(
        5,
        vec![
            (vec![0, 1, 3], vec![40, 8, 25]),
            (vec![1, 2, 4], vec![12, 30, 6]),
        ],
    );
    let wand_data = build_wand(
        &index,
        vec![60, 40, 50, 45, 30],
        RankerKind::LmDirichlet,
        &WandParams {
            partitioning: Partitioning::Fixed { block_size: 2 },
            quantize: None,
        },
    );
    check_all_engines(&index, &wand_data, &[0, 1], 3);
    check_all_engines(&index, &wand_data, &[0, 1, 1], 5);
}

#[test]
fn quantized_metadata_stays_sound() {
    let index = MemoryIndex::new(
        16,
        vec![
            ((0..16).collect(), (1..17).collect()),
            (vec![1, 5, 9, 13], vec![9, 3, 7, 2]),
        ],
    );
    let lengths: Vec<u32> = (0..16).map(|i| 10 + i % 7).collect();
    let raw = build_wand(
        &index,
        lengths.clone(),
        RankerKind::Bm25,
        &WandParams {
            partitioning: Partitioning::Fixed { block_size: 4 },
            quantize: None,
        },
    );
    let quantized = build_wand(
        &index,
        lengths,
        RankerKind::Bm25,
        &WandParams {
            partitioning: Partitioning::Fixed { block_size: 4 },
            quantize: Some(64),
        },
    );
    let ranker = raw.ranker();
    let oracle = ranked_or(&index, &raw, &ranker, &[0, 1], 5).unwrap();
    let bmw = block_max_wand(&index, &quantized, &ranker, &[0, 1], 5).unwrap();
    assert_same_topk(&oracle.topk, &bmw.topk);
}

#[test]
fn variable_partition_engines_agree() {
    let docids: Vec<u32> = (0..120).map(|i| i * 2).collect();
    let freqs: Vec<u32> = (0..120).map(|i| 1 + (i * 13) % 9).collect();
    let index = MemoryIndex::new(
        240,
        vec![
            (docids, freqs),
            ((0..240).step_by(7).collect(), (0..35).map(|i| 1 + i % 4).collect()),
        ],
    );
    let lengths: Vec<u32> = (0..240).map(|i| 12 + i % 9).collect();
    let wand_data = build_wand(
        &index,
        lengths,
        RankerKind::Bm25,
        &WandParams {
            partitioning: Partitioning::Variable {
                eps1: 0.01,
                eps2: 0.4,
                fixed_cost: 8.0,
            },
            quantize: None,
        },
    );
    check_all_engines(&index, &wand_data, &[0, 1], 10);
}

/// Pruned documents score below the pruning threshold (soundness).
#[test]
fn pruning_never_drops_an_admissible_document() {
    let index = MemoryIndex::new(
        12,
        vec![
            (vec![0, 3, 5, 7, 11], vec![4, 1, 2, 6, 1]),
            (vec![1, 3, 7, 9], vec![2, 2, 1, 5]),
            (vec![2, 7, 10], vec![3, 3, 1]),
        ],
    );
    let wand_data = build_wand(
        &index,
        vec![15; 12],
        RankerKind::Bm25,
        &WandParams {
            partitioning: Partitioning::Fixed { block_size: 2 },
            quantize: None,
        },
    );
    let ranker = wand_data.ranker();
    let k = 3;
    let oracle = ranked_or(&index, &wand_data, &ranker, &[0, 1, 2], 12).unwrap();
    for engine in [Engine::Wand, Engine::BlockMaxWand, Engine::MaxScore] {
        let pruned = engine.run(&index, &wand_data, &ranker, &[0, 1, 2], k).unwrap();
        let tau = pruned.topk.last().unwrap().0;
        for &(score, docid) in &oracle.topk {
            if !pruned.topk.iter().any(|&(_, d)| d == docid) {
                assert!(
                    score <= tau + 1e-9,
                    "{}: dropped doc {} scoring {} above threshold {}",
                    engine.name(),
                    docid,
                    score,
                    tau
                );
            }
        }
    }
}

prop_compose! {
    fn arb_collection()(num_docs in 2u32..40, num_terms in 1usize..5)(
        num_docs in Just(num_docs),
        num_terms in Just(num_terms),
        memberships in prop::collection::vec(
            prop::collection::btree_set(0u32..40, 1..20),
            1..5
        ),
        freqs in prop::collection::vec(1u32..8, 800),
        lengths in prop::collection::vec(5u32..40, 40),
    ) -> (MemoryIndex, Vec<u32>) {
        let mut lists = Vec::new();
        let mut f = freqs.into_iter();
        for t in 0..num_terms {
            let members: Vec<u32> = memberships[t % memberships.len()]
                .iter()
                .copied()
                .filter(|&d| d < num_docs)
                .collect();
            if members.is_empty() {
                lists.push((vec![0], vec![1]));
            } else {
                let fs: Vec<u32> = members.iter().map(|_| f.next().unwrap_or(1)).collect();
                lists.push((members, fs));
            }
        }
        let index = MemoryIndex::new(num_docs, lists);
        let lengths = lengths[..num_docs as usize].to_vec();
        (index, lengths)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn engines_match_oracle_on_random_collections(
        (index, lengths) in arb_collection(),
        query in prop::collection::vec(0u32..5, 1..6),
        k in 1usize..8,
    ) {
        let query: Vec<TermId> = query
            .into_iter()
            .map(|t| t % index.num_terms() as u32)
            .collect();
        let wand_data = build_wand(
            &index,
            lengths,
            RankerKind::Bm25,
            &WandParams {
                partitioning: Partitioning::Fixed { block_size: 3 },
                quantize: None,
            },
        );
        let ranker = wand_data.ranker();
        let oracle = ranked_or(&index, &wand_data, &ranker, &query, k).unwrap();
        for engine in [Engine::Wand, Engine::BlockMaxWand, Engine::MaxScore] {
            let results = engine.run(&index, &wand_data, &ranker, &query, k).unwrap();
            prop_assert_eq!(results.topk.len(), oracle.topk.len());
            for (e, a) in oracle.topk.iter().zip(&results.topk) {
                prop_assert!((e.0 - a.0).abs() <= 1e-5 * e.0.abs().max(1.0));
            }
        }
    }
}
