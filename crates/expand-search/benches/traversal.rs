//! Traversal engine comparison on a synthetic collection.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use expand_search::prelude::*;
use expand_store::collection::DocumentSizes;

fn synthetic() -> (MemoryIndex, WandData) {
    let num_docs = 20_000u32;
    let mut lists = Vec::new();
    // A few lists with very different densities and score profiles.
    for (stride, bias) in [(3u32, 1u32), (7, 3), (11, 1), (25, 9), (160, 2)] {
        let docids: Vec<u32> = (0..num_docs).step_by(stride as usize).collect();
        let freqs: Vec<u32> = docids.iter().map(|d| 1 + (d * 31 + bias) % 11).collect();
        lists.push((docids, freqs));
    }
    let index = MemoryIndex::new(num_docs, lists);
    let lengths: Vec<u32> = (0..num_docs).map(|d| 40 + (d * 17) % 300).collect();
    let wand_data = WandData::build(
        &index,
        &DocumentSizes::new(lengths),
        RankerKind::Bm25,
        &WandParams::default(),
        || {},
    )
    .unwrap();
    (index, wand_data)
}

fn bench_engines(c: &mut Criterion) {
    let (index, wand_data) = synthetic();
    let ranker = wand_data.ranker();
    let query: Vec<TermId> = vec![0, 1, 2, 3, 4];

    let mut group = c.benchmark_group("traversal");
    for engine in [
        Engine::RankedOr,
        Engine::Wand,
        Engine::BlockMaxWand,
        Engine::MaxScore,
    ] {
        group.bench_function(engine.name(), |b| {
            b.iter(|| {
                engine
                    .run(&index, &wand_data, &ranker, black_box(&query), 10)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engines);
criterion_main!(benches);
