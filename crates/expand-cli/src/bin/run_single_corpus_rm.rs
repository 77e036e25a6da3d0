//! Two-stage retrieval with relevance-model expansion on a single corpus,
//! emitting a TREC run.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;

use expand_search::prelude::*;

#[derive(Parser)]
#[command(about = "Expansion retrieval against one corpus, TREC output")]
struct Args {
    /// Index reader type (only 'plain' is built in)
    index_type: String,
    /// First-stage engine: wand, block_max_wand, maxscore or ranked_or
    engine: String,
    /// Corpus configuration file
    config_path: String,
    /// TREC output file
    #[arg(long)]
    output: String,
    /// Query file
    #[arg(long)]
    query: String,
    /// Print each query's weighted expansion query to stderr
    #[arg(long)]
    dump_expansion: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.index_type != "plain" {
        bail!("unknown index type '{}'", args.index_type);
    }
    let Some(engine) = Engine::from_name(&args.engine) else {
        bail!("unknown engine '{}'", args.engine);
    };

    let config = CollectionConfig::from_path(&args.config_path, true)?;
    let docs_to_expand = config.docs_to_expand as usize;
    let terms_to_expand = config.terms_to_expand as usize;
    let lambda = config.lambda;
    let final_k = config.final_k as usize;
    let corpus = Corpus::load(config).context("loading corpus")?;

    let queries = read_string_queries(BufReader::new(File::open(&args.query)?))?;
    eprintln!("read {} queries", queries.len());
    let mut output = BufWriter::new(File::create(&args.output)?);

    for (qid, tokens) in &queries {
        let tick = Instant::now();
        let parsed = parse_query(tokens, &corpus.lexicon);
        let first_stage = engine.run(
            &corpus.index,
            &corpus.wand_data,
            &corpus.ranker,
            &parsed,
            docs_to_expand,
        )?;
        let mut weighted_query =
            rm_expansion(&corpus.forward, &first_stage.topk, terms_to_expand)?;
        normalize_weighted_query(&mut weighted_query);
        add_original_query(lambda, &mut weighted_query, &parsed);
        if args.dump_expansion {
            for &(term, weight) in &weighted_query {
                eprintln!("{} {} {}", qid, term, weight);
            }
        }
        let final_stage = weighted_maxscore(
            &corpus.index,
            &corpus.wand_data,
            &corpus.ranker,
            &weighted_query,
            final_k,
        )?;
        let elapsed_ms = tick.elapsed().as_secs_f64() * 1e3;
        eprintln!("{} took ~ {:.3} ms", qid, elapsed_ms);
        output_trec(
            &final_stage.topk,
            *qid,
            &corpus.doc_map,
            engine.name(),
            &mut output,
        )?;
    }
    Ok(())
}
