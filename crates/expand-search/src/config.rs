//! Per-corpus configuration files.
//!
//! One `key=value` pair per line; blank lines are skipped and unknown keys
//! are fatal. `raw_collection` is a basename from which the lexicon
//! (`.lexicon`) and the TREC docid map (`.docids`) paths are derived.
//!
//! ```text
//! raw_collection=path/to/raw/collection
//! inverted_index=path/to/invidx
//! forward_index=path/to/forwardidx
//! wand_file=path/to/wand
//! docs_to_expand=25
//! terms_to_expand=25
//! lambda_expand=0.1
//! final_k=1000
//! gen_queries=5
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use expand_store::collection::with_suffix;

use crate::error::{SearchError, SearchResult};

/// Paths and expansion parameters for one corpus.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub lexicon_file: PathBuf,
    pub map_file: PathBuf,
    pub invidx_file: PathBuf,
    pub fidx_file: PathBuf,
    pub wand_file: PathBuf,
    pub docs_to_expand: u64,
    pub terms_to_expand: u64,
    /// Interpolation weight of the original query, in `[0, 1]`.
    pub lambda: f64,
    /// Result depth of the second stage; meaningful on the target.
    pub final_k: u64,
    /// Sampler variant only: generated queries per corpus.
    pub gen_queries: u64,
    pub target: bool,
}

impl CollectionConfig {
    pub fn from_path(path: impl AsRef<Path>, target: bool) -> SearchResult<Self> {
        let file = File::open(&path).map_err(|e| {
            SearchError::Config(format!(
                "cannot open config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_reader(BufReader::new(file), target)
    }

    pub fn from_reader(reader: impl Read, target: bool) -> SearchResult<Self> {
        let mut lexicon_file = PathBuf::new();
        let mut map_file = PathBuf::new();
        let mut invidx_file = PathBuf::new();
        let mut fidx_file = PathBuf::new();
        let mut wand_file = PathBuf::new();
        let mut docs_to_expand = 0u64;
        let mut terms_to_expand = 0u64;
        let mut lambda = 0.0f64;
        let mut final_k = 0u64;
        let mut gen_queries = 0u64;

        for line in BufReader::new(reader).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| SearchError::Config(format!("bad config line '{}'", line)))?;
            let parse_u64 = |v: &str| {
                v.parse::<u64>()
                    .map_err(|_| SearchError::Config(format!("bad integer for {}: '{}'", key, v)))
            };
            match key {
                "raw_collection" => {
                    lexicon_file = with_suffix(value, "lexicon");
                    map_file = with_suffix(value, "docids");
                }
                "inverted_index" => invidx_file = PathBuf::from(value),
                "forward_index" => fidx_file = PathBuf::from(value),
                "wand_file" => wand_file = PathBuf::from(value),
                "docs_to_expand" => docs_to_expand = parse_u64(value)?,
                "terms_to_expand" => terms_to_expand = parse_u64(value)?,
                "lambda_expand" => {
                    lambda = value.parse::<f64>().map_err(|_| {
                        SearchError::Config(format!("bad value for lambda_expand: '{}'", value))
                    })?;
                }
                "final_k" => final_k = parse_u64(value)?,
                "gen_queries" => gen_queries = parse_u64(value)?,
                _ => {
                    return Err(SearchError::Config(format!(
                        "unknown configuration key '{}'",
                        key
                    )));
                }
            }
        }

        if !(0.0..=1.0).contains(&lambda) {
            return Err(SearchError::Config(format!(
                "lambda_expand must be in [0, 1], got {}",
                lambda
            )));
        }
        if final_k == 0 {
            return Err(SearchError::Config("final_k must be positive".to_string()));
        }
        if invidx_file.as_os_str().is_empty()
            || fidx_file.as_os_str().is_empty()
            || wand_file.as_os_str().is_empty()
            || lexicon_file.as_os_str().is_empty()
        {
            return Err(SearchError::Config(
                "config must set raw_collection, inverted_index, forward_index and wand_file"
                    .to_string(),
            ));
        }

        Ok(Self {
            lexicon_file,
            map_file,
            invidx_file,
            fidx_file,
            wand_file,
            docs_to_expand,
            terms_to_expand,
            lambda,
            final_k,
            gen_queries,
            target,
        })
    }
}
