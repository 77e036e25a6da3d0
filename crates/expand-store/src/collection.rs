//! Readers for the binary frequency collection consumed by the builders.
//!
//! A collection `basename` names three files:
//!
//! - `basename.docs`: a leading `(1, num_docs)` sequence, then one
//!   `(len, docid...)` sequence per term, docids strictly increasing.
//! - `basename.freqs`: one `(len, freq...)` sequence per term, aligned with
//!   the `.docs` sequences.
//! - `basename.sizes`: `num_docs` as a `u32`, then `num_docs` `u32` lengths.
//!
//! All values are little-endian `u32`. The `.docs`/`.freqs` pair is
//! memory-mapped and exposed as zero-copy slices.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;

use crate::error::{StoreError, StoreResult};

/// Append a dotted suffix to a collection basename. Unlike
/// `Path::with_extension`, this never replaces part of the basename itself.
pub fn with_suffix(basename: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let mut name = basename.as_ref().as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// One term's postings: aligned docid and frequency slices.
#[derive(Clone, Copy)]
pub struct PostingSequence<'a> {
    pub docids: &'a [u32],
    pub freqs: &'a [u32],
}

impl<'a> PostingSequence<'a> {
    pub fn len(&self) -> usize {
        self.docids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docids.is_empty()
    }
}

/// Capability the index builders consume: a fixed set of posting sequences
/// over a known document count.
pub trait CollectionSource {
    fn num_docs(&self) -> u32;
    /// Number of term sequences (the vocabulary size of the collection).
    fn num_sequences(&self) -> usize;
    fn sequence(&self, term: usize) -> PostingSequence<'_>;
}

struct ListOffsets {
    doc_word: usize,
    freq_word: usize,
    len: usize,
}

/// Memory-mapped `.docs`/`.freqs` pair.
pub struct BinaryFreqCollection {
    docs: Mmap,
    freqs: Mmap,
    num_docs: u32,
    lists: Vec<ListOffsets>,
}

fn map_u32_file(path: &Path) -> StoreResult<Mmap> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    if mmap.len() % 4 != 0 {
        return Err(StoreError::Format {
            message: format!("{} is not a whole number of u32 words", path.display()),
            expected: None,
            actual: Some(format!("{} bytes", mmap.len())),
        });
    }
    Ok(mmap)
}

fn as_words(mmap: &Mmap) -> StoreResult<&[u32]> {
    bytemuck::try_cast_slice(&mmap[..])
        .map_err(|_| StoreError::format("misaligned collection mapping"))
}

impl BinaryFreqCollection {
    /// Open `basename.docs` and `basename.freqs`, validating sequence
    /// alignment up front.
    pub fn open(basename: impl AsRef<Path>) -> StoreResult<Self> {
        let basename = basename.as_ref();
        let docs = map_u32_file(&with_suffix(basename, "docs"))?;
        let freqs = map_u32_file(&with_suffix(basename, "freqs"))?;

        let doc_words = as_words(&docs)?;
        let freq_words = as_words(&freqs)?;

        if doc_words.len() < 2 || doc_words[0] != 1 {
            return Err(StoreError::format("missing document-count header sequence"));
        }
        let num_docs = doc_words[1];

        let mut lists = Vec::new();
        let mut d = 2usize;
        let mut f = 0usize;
        while d < doc_words.len() {
            let len = doc_words[d] as usize;
            if f >= freq_words.len() {
                return Err(StoreError::Corrupt(
                    "freq sequences exhausted before doc sequences".to_string(),
                ));
            }
            let flen = freq_words[f] as usize;
            if len != flen {
                return Err(StoreError::Corrupt(format!(
                    "doc/freq sequences misaligned at list {} ({} vs {})",
                    lists.len(),
                    len,
                    flen
                )));
            }
            if d + 1 + len > doc_words.len() || f + 1 + len > freq_words.len() {
                return Err(StoreError::format("truncated posting sequence"));
            }
            lists.push(ListOffsets {
                doc_word: d + 1,
                freq_word: f + 1,
                len,
            });
            d += 1 + len;
            f += 1 + len;
        }
        if f != freq_words.len() {
            return Err(StoreError::Corrupt(
                "trailing data in freq collection".to_string(),
            ));
        }

        eprintln!(
            "collection: {} documents, {} posting lists",
            num_docs,
            lists.len()
        );
        Ok(Self {
            docs,
            freqs,
            num_docs,
            lists,
        })
    }
}

impl CollectionSource for BinaryFreqCollection {
    fn num_docs(&self) -> u32 {
        self.num_docs
    }

    fn num_sequences(&self) -> usize {
        self.lists.len()
    }

    fn sequence(&self, term: usize) -> PostingSequence<'_> {
        let list = &self.lists[term];
        // Unwraps hold: offsets were validated against the mapping at open.
        let doc_words: &[u32] = bytemuck::cast_slice(&self.docs[..]);
        let freq_words: &[u32] = bytemuck::cast_slice(&self.freqs[..]);
        PostingSequence {
            docids: &doc_words[list.doc_word..list.doc_word + list.len],
            freqs: &freq_words[list.freq_word..list.freq_word + list.len],
        }
    }
}

/// In-memory collection, for tests and programmatic index construction.
pub struct MemoryCollection {
    num_docs: u32,
    lists: Vec<(Vec<u32>, Vec<u32>)>,
}

impl MemoryCollection {
    /// `lists[t]` holds term `t`'s `(docids, freqs)`.
    pub fn new(num_docs: u32, lists: Vec<(Vec<u32>, Vec<u32>)>) -> Self {
        for (docids, freqs) in &lists {
            assert_eq!(docids.len(), freqs.len());
            debug_assert!(docids.windows(2).all(|w| w[0] < w[1]));
        }
        Self { num_docs, lists }
    }
}

impl CollectionSource for MemoryCollection {
    fn num_docs(&self) -> u32 {
        self.num_docs
    }

    fn num_sequences(&self) -> usize {
        self.lists.len()
    }

    fn sequence(&self, term: usize) -> PostingSequence<'_> {
        let (docids, freqs) = &self.lists[term];
        PostingSequence { docids, freqs }
    }
}

/// Per-document token counts.
pub struct DocumentSizes {
    lengths: Vec<u32>,
}

impl DocumentSizes {
    pub fn from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let n = reader.read_u32::<LittleEndian>()? as usize;
        let mut lengths = Vec::with_capacity(n);
        for _ in 0..n {
            lengths.push(reader.read_u32::<LittleEndian>()?);
        }
        Ok(Self { lengths })
    }

    pub fn new(lengths: Vec<u32>) -> Self {
        Self { lengths }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_u32::<LittleEndian>(self.lengths.len() as u32)?;
        for &len in &self.lengths {
            writer.write_u32::<LittleEndian>(len)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn lengths(&self) -> &[u32] {
        &self.lengths
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

/// Write a collection back out in the binary `.docs`/`.freqs` format.
/// Used by tests to fabricate fixtures; ingest proper lives outside this
/// workspace.
pub fn write_binary_collection(
    basename: impl AsRef<Path>,
    source: &impl CollectionSource,
) -> StoreResult<()> {
    let basename = basename.as_ref();
    let mut docs = BufWriter::new(File::create(with_suffix(basename, "docs"))?);
    let mut freqs = BufWriter::new(File::create(with_suffix(basename, "freqs"))?);

    docs.write_u32::<LittleEndian>(1)?;
    docs.write_u32::<LittleEndian>(source.num_docs())?;
    for t in 0..source.num_sequences() {
        let seq = source.sequence(t);
        docs.write_u32::<LittleEndian>(seq.len() as u32)?;
        freqs.write_u32::<LittleEndian>(seq.len() as u32)?;
        for &d in seq.docids {
            docs.write_u32::<LittleEndian>(d)?;
        }
        for &f in seq.freqs {
            freqs.write_u32::<LittleEndian>(f)?;
        }
    }
    docs.flush()?;
    freqs.flush()?;
    Ok(())
}
