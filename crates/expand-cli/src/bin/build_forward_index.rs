//! Build the compressed forward index (document vectors) for a collection.

use std::collections::HashSet;

use anyhow::{Context, Result};
use clap::Parser;

use expand_store::collection::{with_suffix, BinaryFreqCollection};
use expand_store::docvector::DocumentIndex;
use expand_store::lexicon::{load_stoplist, Lexicon};

#[derive(Parser)]
#[command(about = "Invert a collection into compressed per-document term vectors")]
struct Args {
    /// Collection basename (expects .docs, .freqs and .lexicon files)
    collection_basename: String,
    /// Output forward index file
    output_path: String,
    /// Optional stoplist of surface terms to exclude
    stoplist_path: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let collection = BinaryFreqCollection::open(&args.collection_basename)
        .with_context(|| format!("opening collection {}", args.collection_basename))?;

    let stoplist: HashSet<u32> = match &args.stoplist_path {
        Some(path) => {
            let lexicon = Lexicon::from_path(
                with_suffix(&args.collection_basename, "lexicon"),
                false,
            )
            .context("reading lexicon for stoplist resolution")?;
            load_stoplist(path, &lexicon).context("reading stoplist")?
        }
        None => HashSet::new(),
    };

    let forward = DocumentIndex::build(&collection, &stoplist);
    forward
        .write_to(&args.output_path)
        .with_context(|| format!("writing {}", args.output_path))?;
    eprintln!(
        "wrote {} ({} documents)",
        args.output_path,
        forward.num_docs()
    );
    Ok(())
}
