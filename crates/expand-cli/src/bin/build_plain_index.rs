//! Serialize a collection as a memory-mappable plain inverted index.

use anyhow::{Context, Result};
use clap::Parser;

use expand_store::collection::BinaryFreqCollection;
use expand_store::postings::write_plain_index;

#[derive(Parser)]
#[command(about = "Write an uncompressed memory-mappable inverted index")]
struct Args {
    /// Collection basename (expects .docs and .freqs files)
    collection_basename: String,
    /// Output index file
    output_path: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let collection = BinaryFreqCollection::open(&args.collection_basename)
        .with_context(|| format!("opening collection {}", args.collection_basename))?;
    write_plain_index(&collection, &args.output_path)
        .with_context(|| format!("writing {}", args.output_path))?;
    eprintln!("wrote {}", args.output_path);
    Ok(())
}
