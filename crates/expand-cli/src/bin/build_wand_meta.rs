//! Build WAND metadata for a binary frequency collection.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use expand_store::collection::{with_suffix, BinaryFreqCollection, CollectionSource, DocumentSizes};
use expand_store::ranker::RankerKind;
use expand_store::wand::{Partitioning, WandData, WandParams};

#[derive(Parser)]
#[command(about = "Precompute list and block score bounds for a collection")]
struct Args {
    /// Collection basename (expects .docs, .freqs and .sizes files)
    collection_basename: String,
    /// Output metadata file
    output_path: String,
    /// Ranker to precompute bounds for: BM25 or LMDS
    ranker: String,
    /// Use cost-model-driven variable-size blocks
    #[arg(long)]
    variable_block: bool,
    /// Quantize block maxima (incompatible with LMDS)
    #[arg(long)]
    compress: bool,
    /// Fixed partitioning: postings per block
    #[arg(long, default_value_t = 64)]
    block_size: usize,
    /// Variable partitioning: initial cost slack
    #[arg(long, default_value_t = 0.03)]
    eps1: f64,
    /// Variable partitioning: cost window growth ratio
    #[arg(long, default_value_t = 0.3)]
    eps2: f64,
    /// Variable partitioning: per-block fixed cost
    #[arg(long, default_value_t = 64.0)]
    fixed_cost: f64,
    /// Quantization buckets (power of two)
    #[arg(long, default_value_t = 128)]
    reference_size: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let Some(kind) = RankerKind::from_name(&args.ranker) else {
        bail!("unknown ranker '{}': expected BM25 or LMDS", args.ranker);
    };

    let collection = BinaryFreqCollection::open(&args.collection_basename)
        .with_context(|| format!("opening collection {}", args.collection_basename))?;
    let sizes = DocumentSizes::from_path(with_suffix(&args.collection_basename, "sizes"))
        .context("reading document sizes")?;

    let partitioning = if args.variable_block {
        Partitioning::Variable {
            eps1: args.eps1,
            eps2: args.eps2,
            fixed_cost: args.fixed_cost,
        }
    } else {
        Partitioning::Fixed {
            block_size: args.block_size,
        }
    };
    let params = WandParams {
        partitioning,
        quantize: args.compress.then_some(args.reference_size),
    };

    eprintln!(
        "building {} metadata with {} partitioning",
        kind.name(),
        if args.variable_block { "variable" } else { "fixed" },
    );
    let bar = ProgressBar::new(collection.num_sequences() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} lists ({eta})")
            .expect("valid progress template"),
    );
    let wand_data = WandData::build(&collection, &sizes, kind, &params, || bar.inc(1))
        .context("building metadata")?;
    bar.finish();

    wand_data
        .write_to(&args.output_path)
        .with_context(|| format!("writing {}", args.output_path))?;
    eprintln!("wrote {}", args.output_path);
    Ok(())
}
