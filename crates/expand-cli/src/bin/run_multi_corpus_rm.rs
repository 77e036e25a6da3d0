//! Multi-corpus expansion retrieval with reciprocal-rank fusion, emitting a
//! TREC run.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;

use expand_search::prelude::*;

#[derive(Parser)]
#[command(about = "Expansion over a target plus external corpora, RRF-fused TREC output")]
struct Args {
    /// Index reader type (only 'plain' is built in)
    index_type: String,
    /// Target corpus configuration file
    target_config: String,
    /// External corpus configuration files (repeatable)
    #[arg(long = "external")]
    externals: Vec<String>,
    /// Query file
    #[arg(long)]
    query: String,
    /// TREC output file
    #[arg(long)]
    output: String,
    /// Generate bag-of-words sub-queries instead of weighted queries
    #[arg(long)]
    sampler: bool,
    /// Sampler seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.index_type != "plain" {
        bail!("unknown index type '{}'", args.index_type);
    }

    let mut configs = vec![CollectionConfig::from_path(&args.target_config, true)?];
    for external in &args.externals {
        configs.push(CollectionConfig::from_path(external, false)?);
    }
    let corpus_set = CorpusSet::load(configs).context("loading corpora")?;

    let queries = read_string_queries(BufReader::new(File::open(&args.query)?))?;
    eprintln!("read {} queries", queries.len());
    for corpus in corpus_set.corpora() {
        corpus.warmup(&queries);
    }
    let mut output = BufWriter::new(File::create(&args.output)?);

    let mut sampler = WeightedSampler::new(args.seed);
    let run_tag = if args.sampler {
        "ExternalRMSampler"
    } else {
        "ExternalRM"
    };

    for (qid, tokens) in &queries {
        let tick = Instant::now();
        let fused = if args.sampler {
            corpus_set.run_query_sampler(tokens, &mut sampler)?
        } else {
            corpus_set.run_query(tokens)?
        };
        let elapsed_ms = tick.elapsed().as_secs_f64() * 1e3;
        eprintln!("{},{:.3} ms", qid, elapsed_ms);
        output_trec(&fused, *qid, &corpus_set.target().doc_map, run_tag, &mut output)?;
    }
    Ok(())
}
