//! Run bag-of-words queries through a traversal engine, printing per-query
//! timing and profiling counters.

use std::fs::File;
use std::io::BufReader;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;

use expand_search::prelude::*;
use expand_store::lexicon::Lexicon;

#[derive(Parser)]
#[command(about = "Time top-k traversals over an index")]
struct Args {
    /// Index reader type (only 'plain' is built in)
    index_type: String,
    /// Traversal engine: wand, block_max_wand, maxscore or ranked_or
    engine: String,
    /// Path to the inverted index
    index_path: String,
    /// Path to the WAND metadata
    #[arg(long)]
    wand: String,
    /// Expect quantized (compressed) metadata
    #[arg(long)]
    compressed_wand: bool,
    /// Query file; stdin when absent
    #[arg(long)]
    query: Option<String>,
    /// Result depth
    #[arg(long, default_value_t = 10)]
    k: usize,
    /// Lexicon for surface-form queries; numeric term ids when absent
    #[arg(long)]
    lexicon: Option<String>,
    /// Timed repetitions per query (one untimed profiling run first)
    #[arg(long, default_value_t = 3)]
    runs: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.index_type != "plain" {
        bail!("unknown index type '{}'", args.index_type);
    }
    let Some(engine) = Engine::from_name(&args.engine) else {
        bail!("unknown engine '{}'", args.engine);
    };

    let index = PlainIndex::open(&args.index_path)
        .with_context(|| format!("opening index {}", args.index_path))?;
    let wand_data =
        WandData::open(&args.wand).with_context(|| format!("opening metadata {}", args.wand))?;
    if wand_data.is_quantized() != args.compressed_wand {
        bail!(
            "metadata is {}quantized but --compressed-wand {} given",
            if wand_data.is_quantized() { "" } else { "not " },
            if args.compressed_wand { "was" } else { "was not" },
        );
    }
    let ranker = wand_data.ranker();

    let queries: Vec<(u32, Vec<TermId>)> = match (&args.query, &args.lexicon) {
        (query_path, Some(lexicon_path)) => {
            let lexicon = Lexicon::from_path(lexicon_path, false).context("reading lexicon")?;
            let raw = match query_path {
                Some(path) => read_string_queries(BufReader::new(File::open(path)?))?,
                None => read_string_queries(std::io::stdin().lock())?,
            };
            raw.into_iter()
                .map(|(qid, tokens)| (qid, parse_query(&tokens, &lexicon)))
                .collect()
        }
        (Some(path), None) => read_termid_queries(BufReader::new(File::open(path)?))?,
        (None, None) => read_termid_queries(std::io::stdin().lock())?,
    };
    eprintln!("read {} queries", queries.len());

    for (qid, terms) in &queries {
        // Untimed run captures the counters and warms the lists.
        for term in terms {
            index.warmup(*term);
        }
        let profile = engine.run(&index, &wand_data, &ranker, terms, args.k)?;
        let mut total_ms = 0.0f64;
        for _ in 0..args.runs {
            let tick = Instant::now();
            let results = engine.run(&index, &wand_data, &ranker, terms, args.k)?;
            total_ms += tick.elapsed().as_secs_f64() * 1e3;
            std::hint::black_box(results);
        }
        println!(
            "{};{};{};{}",
            qid,
            total_ms / f64::from(args.runs.max(1)),
            profile.counters.unique_pivots,
            profile.counters.postings_scored
        );
    }
    Ok(())
}
