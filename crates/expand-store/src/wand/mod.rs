//! WAND metadata: precomputed score upper bounds for dynamic pruning.
//!
//! For every posting list this stores the list-level maxima a traversal
//! needs (max term weight, max static document weight, collection
//! frequency) plus a block decomposition with per-block maxima, and for
//! the whole collection the normalized document lengths and the statistics
//! the ranker was built with. Everything is laid out flat so a metadata
//! file can be memory-mapped and read zero-copy.
//!
//! Two block stores exist:
//! - **raw**: per-block max term weight (`f32`), max document weight
//!   (`f32`), and last docid (`u32`).
//! - **quantized**: each block's max term weight is rounded up to one of
//!   `reference_size` buckets and packed with its last docid into a single
//!   integer, `(docid << score_bits) | score_index`, the per-list sequence
//!   stored varint-delta coded. Per-block document weights are not stored;
//!   building this variant with LM-Dirichlet is rejected.
//!
//! File layout (little-endian): a 24-byte header
//! `magic b"WMET" | version:u32 | flags:u32 | reference_size:u32 |
//! crc32:u32 | reserved:u32`, then `u64`-count-prefixed arrays in order:
//! `m_blocks_start:u64[L+1]`, the block arrays (raw) or the packed byte
//! stream (quantized), `m_norm_lens:f32[N]`, `m_max_term_weight:f32[L]`,
//! `m_max_document_weight:f32[L]`, `m_ctf:u32[L]`, and finally the scalars
//! `m_avg_doclen:f32 | m_num_docs:f32 | m_terms_in_collection:f64 |
//! m_ranker_id:u32`.

mod partition;

use std::fs::File;
use std::ops::Range;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use crate::codec::varint;
use crate::collection::{CollectionSource, DocumentSizes};
use crate::error::{StoreError, StoreResult};
use crate::ranker::{Ranker, RankerKind};
use crate::{DocId, TermId};

const WAND_MAGIC: [u8; 4] = *b"WMET";
const WAND_VERSION: u32 = 1;
const HEADER_BYTES: usize = 24;
const FLAG_QUANTIZED: u32 = 1;

/// Block decomposition strategy.
#[derive(Debug, Clone, Copy)]
pub enum Partitioning {
    /// Blocks of a fixed number of postings.
    Fixed { block_size: usize },
    /// Cost-model-driven variable blocks.
    Variable { eps1: f64, eps2: f64, fixed_cost: f64 },
}

/// Build-time tunables, threaded explicitly instead of living in a global.
#[derive(Debug, Clone, Copy)]
pub struct WandParams {
    pub partitioning: Partitioning,
    /// `Some(reference_size)` quantizes block maxima into that many buckets
    /// (must be a power of two).
    pub quantize: Option<u32>,
}

impl Default for WandParams {
    fn default() -> Self {
        Self {
            partitioning: Partitioning::Fixed { block_size: 64 },
            quantize: None,
        }
    }
}

struct Ranges {
    blocks_start: Range<usize>,
    block_max_scores: Range<usize>,
    block_max_weights: Range<usize>,
    block_docids: Range<usize>,
    packed_blocks: Range<usize>,
    norm_lens: Range<usize>,
    max_term_weights: Range<usize>,
    max_doc_weights: Range<usize>,
    ctfs: Range<usize>,
}

enum Bytes {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl std::ops::Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Bytes::Owned(v) => v,
            Bytes::Mapped(m) => m,
        }
    }
}

/// The memory-mapped (or freshly built) metadata.
pub struct WandData {
    data: Bytes,
    ranges: Ranges,
    quantized: bool,
    score_bits: u32,
    reference_size: u32,
    avg_doclen: f32,
    num_docs: f32,
    terms_in_collection: f64,
    ranker_kind: RankerKind,
}

impl WandData {
    /// Precompute metadata for a collection under `kind`'s scoring.
    ///
    /// `on_list` is invoked once per processed posting list so callers can
    /// surface progress.
    pub fn build(
        source: &impl CollectionSource,
        sizes: &DocumentSizes,
        kind: RankerKind,
        params: &WandParams,
        mut on_list: impl FnMut(),
    ) -> StoreResult<Self> {
        let num_docs = source.num_docs();
        if sizes.len() != num_docs as usize {
            return Err(StoreError::Corrupt(format!(
                "sizes file covers {} documents, collection has {}",
                sizes.len(),
                num_docs
            )));
        }
        if let Some(reference_size) = params.quantize {
            if kind == RankerKind::LmDirichlet {
                return Err(StoreError::NotSupported(
                    "quantized metadata cannot carry the per-block document weights \
                     LM-Dirichlet needs"
                        .to_string(),
                ));
            }
            if !reference_size.is_power_of_two() {
                return Err(StoreError::NotSupported(format!(
                    "reference size must be a power of two, got {}",
                    reference_size
                )));
            }
        }

        // Collection statistics come first; the ranker needs them.
        let lens_sum: u64 = sizes.lengths().iter().map(|&l| u64::from(l)).sum();
        let avg_doclen = (lens_sum as f64 / f64::from(num_docs)) as f32;
        let num_lists = source.num_sequences();
        let mut ctfs = Vec::with_capacity(num_lists);
        let mut terms_in_collection = 0.0f64;
        for t in 0..num_lists {
            let ctf: u64 = source.sequence(t).freqs.iter().map(|&f| u64::from(f)).sum();
            ctfs.push(ctf as u32);
            terms_in_collection += ctf as f64;
        }

        let ranker = Ranker::new(
            kind,
            f64::from(avg_doclen),
            f64::from(num_docs),
            terms_in_collection,
        );
        let norm_lens: Vec<f32> = sizes
            .lengths()
            .iter()
            .map(|&l| ranker.norm_len(f64::from(l)) as f32)
            .collect();

        let quantized = params.quantize.is_some();
        let reference_size = params.quantize.unwrap_or(0);
        let score_bits = if quantized {
            reference_size.trailing_zeros()
        } else {
            0
        };
        let quant = if quantized {
            1.0 / f64::from(reference_size)
        } else {
            0.0
        };

        let mut blocks_start: Vec<u64> = Vec::with_capacity(num_lists + 1);
        blocks_start.push(0);
        let mut block_max_scores: Vec<f32> = Vec::new();
        let mut block_max_weights: Vec<f32> = Vec::new();
        let mut block_docids: Vec<u32> = Vec::new();
        let mut packed_blocks: Vec<u8> = Vec::new();
        let mut max_term_weights: Vec<f32> = Vec::with_capacity(num_lists);
        let mut max_doc_weights: Vec<f32> = Vec::with_capacity(num_lists);

        let mut scores: Vec<f64> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        for t in 0..num_lists {
            let seq = source.sequence(t);
            if seq.is_empty() {
                return Err(StoreError::Corrupt(format!("empty posting list {}", t)));
            }
            scores.clear();
            weights.clear();
            for (&docid, &freq) in seq.docids.iter().zip(seq.freqs) {
                let norm_len = f64::from(norm_lens[docid as usize]);
                scores.push(ranker.doc_term_weight(u64::from(freq), norm_len, ctfs[t]));
                weights.push(ranker.document_weight(norm_len));
            }
            let blocks = match params.partitioning {
                Partitioning::Fixed { block_size } => {
                    partition::fixed_blocks(seq.docids, &scores, &weights, block_size)
                }
                Partitioning::Variable {
                    eps1,
                    eps2,
                    fixed_cost,
                } => {
                    let idf_estimate = ranker.query_term_weight(1, seq.len() as u64);
                    partition::variable_blocks(
                        seq.docids,
                        &scores,
                        &weights,
                        eps1,
                        eps2,
                        fixed_cost,
                        idf_estimate,
                    )
                }
            };

            let list_max_score = blocks
                .max_scores
                .iter()
                .fold(f32::MIN, |acc, &s| acc.max(s));
            let list_max_weight = blocks
                .max_weights
                .iter()
                .fold(f32::MIN, |acc, &w| acc.max(w));
            max_term_weights.push(list_max_score);
            max_doc_weights.push(list_max_weight);

            if quantized {
                let mut prev = 0u64;
                varint::encode_into(blocks.last_docids.len() as u64, &mut packed_blocks);
                for (i, &last_docid) in blocks.last_docids.iter().enumerate() {
                    let score = f64::from(blocks.max_scores[i]);
                    let mut bucket = 1u64;
                    while score > quant * bucket as f64 {
                        bucket += 1;
                    }
                    let packed = (u64::from(last_docid) << score_bits) + (bucket - 1);
                    varint::encode_into(packed - prev, &mut packed_blocks);
                    prev = packed;
                }
                blocks_start.push(packed_blocks.len() as u64);
            } else {
                block_max_scores.extend_from_slice(&blocks.max_scores);
                block_max_weights.extend_from_slice(&blocks.max_weights);
                block_docids.extend_from_slice(&blocks.last_docids);
                blocks_start.push(block_docids.len() as u64);
            }
            on_list();
        }

        // Assemble the file image, then reopen it through the common parser
        // so built and mapped metadata share one code path.
        let mut payload = Vec::new();
        write_array_u64(&mut payload, &blocks_start);
        if quantized {
            write_bytes_array(&mut payload, &packed_blocks);
        } else {
            write_array_f32(&mut payload, &block_max_scores);
            write_array_f32(&mut payload, &block_max_weights);
            write_array_u32(&mut payload, &block_docids);
        }
        write_array_f32(&mut payload, &norm_lens);
        write_array_f32(&mut payload, &max_term_weights);
        write_array_f32(&mut payload, &max_doc_weights);
        write_array_u32(&mut payload, &ctfs);
        push_f32(&mut payload, avg_doclen);
        push_f32(&mut payload, num_docs as f32);
        push_f64(&mut payload, terms_in_collection);
        push_u32(&mut payload, kind.id());

        let mut image = Vec::with_capacity(HEADER_BYTES + payload.len());
        image.extend_from_slice(&WAND_MAGIC);
        push_u32(&mut image, WAND_VERSION);
        push_u32(&mut image, if quantized { FLAG_QUANTIZED } else { 0 });
        push_u32(&mut image, reference_size);
        push_u32(&mut image, crc32fast::hash(&payload));
        push_u32(&mut image, 0);
        image.extend_from_slice(&payload);

        Self::parse(Bytes::Owned(image))
    }

    /// Memory-map a metadata file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::parse(Bytes::Mapped(mmap))
    }

    /// Write the serialized image to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        std::fs::write(path, &self.data[..])?;
        Ok(())
    }

    /// Recompute the payload checksum and compare with the stored one.
    pub fn verify_checksum(&self) -> StoreResult<()> {
        let stored = LittleEndian::read_u32(&self.data[16..20]);
        let actual = crc32fast::hash(&self.data[HEADER_BYTES..]);
        if stored != actual {
            return Err(StoreError::ChecksumMismatch {
                expected: stored,
                actual,
            });
        }
        Ok(())
    }

    fn parse(data: Bytes) -> StoreResult<Self> {
        if data.len() < HEADER_BYTES {
            return Err(StoreError::format("metadata file too small"));
        }
        if data[0..4] != WAND_MAGIC {
            return Err(StoreError::Format {
                message: "bad metadata magic".to_string(),
                expected: Some(format!("{:?}", WAND_MAGIC)),
                actual: Some(format!("{:?}", &data[0..4])),
            });
        }
        let version = LittleEndian::read_u32(&data[4..8]);
        if version != WAND_VERSION {
            return Err(StoreError::Format {
                message: "metadata version mismatch".to_string(),
                expected: Some(WAND_VERSION.to_string()),
                actual: Some(version.to_string()),
            });
        }
        let flags = LittleEndian::read_u32(&data[8..12]);
        let quantized = flags & FLAG_QUANTIZED != 0;
        let reference_size = LittleEndian::read_u32(&data[12..16]);
        if quantized && !reference_size.is_power_of_two() {
            return Err(StoreError::format("bad quantized reference size"));
        }

        let mut pos = HEADER_BYTES;
        let blocks_start = read_array(&data, &mut pos, 8)?;
        let (block_max_scores, block_max_weights, block_docids, packed_blocks) = if quantized {
            let packed = read_array(&data, &mut pos, 1)?;
            (0..0, 0..0, 0..0, packed)
        } else {
            let scores = read_array(&data, &mut pos, 4)?;
            let weights = read_array(&data, &mut pos, 4)?;
            let docids = read_array(&data, &mut pos, 4)?;
            (scores, weights, docids, 0..0)
        };
        let norm_lens = read_array(&data, &mut pos, 4)?;
        let max_term_weights = read_array(&data, &mut pos, 4)?;
        let max_doc_weights = read_array(&data, &mut pos, 4)?;
        let ctfs = read_array(&data, &mut pos, 4)?;

        if data.len() < pos + 20 {
            return Err(StoreError::format("metadata scalars truncated"));
        }
        let avg_doclen = LittleEndian::read_f32(&data[pos..pos + 4]);
        let num_docs = LittleEndian::read_f32(&data[pos + 4..pos + 8]);
        let terms_in_collection = LittleEndian::read_f64(&data[pos + 8..pos + 16]);
        let ranker_id = LittleEndian::read_u32(&data[pos + 16..pos + 20]);
        let ranker_kind = RankerKind::from_id(ranker_id).ok_or_else(|| StoreError::Format {
            message: "unknown ranker id in metadata".to_string(),
            expected: Some("0 (BM25) or 1 (LMDS)".to_string()),
            actual: Some(ranker_id.to_string()),
        })?;

        Ok(Self {
            data,
            ranges: Ranges {
                blocks_start,
                block_max_scores,
                block_max_weights,
                block_docids,
                packed_blocks,
                norm_lens,
                max_term_weights,
                max_doc_weights,
                ctfs,
            },
            quantized,
            score_bits: if quantized {
                reference_size.trailing_zeros()
            } else {
                0
            },
            reference_size,
            avg_doclen,
            num_docs,
            terms_in_collection,
            ranker_kind,
        })
    }

    fn u64s(&self, range: &Range<usize>) -> &[u64] {
        bytemuck::cast_slice(&self.data[range.clone()])
    }

    fn f32s(&self, range: &Range<usize>) -> &[f32] {
        bytemuck::cast_slice(&self.data[range.clone()])
    }

    fn u32s(&self, range: &Range<usize>) -> &[u32] {
        bytemuck::cast_slice(&self.data[range.clone()])
    }

    /// Ranker-normalized length of a document.
    pub fn norm_len(&self, docid: DocId) -> f64 {
        f64::from(self.f32s(&self.ranges.norm_lens)[docid as usize])
    }

    /// List-level upper bound on `doc_term_weight` for `term`.
    pub fn max_term_weight(&self, term: TermId) -> f64 {
        f64::from(self.f32s(&self.ranges.max_term_weights)[term as usize])
    }

    /// List-level maximum static document weight for `term`.
    pub fn max_document_weight(&self, term: TermId) -> f64 {
        f64::from(self.f32s(&self.ranges.max_doc_weights)[term as usize])
    }

    /// Collection frequency of `term`.
    pub fn ctf(&self, term: TermId) -> u32 {
        self.u32s(&self.ranges.ctfs)[term as usize]
    }

    pub fn average_doclen(&self) -> f64 {
        f64::from(self.avg_doclen)
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs as u64
    }

    pub fn terms_in_collection(&self) -> f64 {
        self.terms_in_collection
    }

    pub fn ranker_kind(&self) -> RankerKind {
        self.ranker_kind
    }

    /// Build the ranker this metadata was computed with.
    pub fn ranker(&self) -> Ranker {
        Ranker::new(
            self.ranker_kind,
            f64::from(self.avg_doclen),
            f64::from(self.num_docs),
            self.terms_in_collection,
        )
    }

    pub fn num_terms(&self) -> usize {
        self.u64s(&self.ranges.blocks_start).len() - 1
    }

    pub fn is_quantized(&self) -> bool {
        self.quantized
    }

    /// Open a cursor over `term`'s block decomposition.
    pub fn block_cursor(&self, term: TermId) -> StoreResult<BlockCursor<'_>> {
        let starts = self.u64s(&self.ranges.blocks_start);
        let t = term as usize;
        if t + 1 >= starts.len() {
            return Err(StoreError::format(format!("term {} out of range", term)));
        }
        let (start, end) = (starts[t] as usize, starts[t + 1] as usize);
        if self.quantized {
            let stream = &self.data[self.ranges.packed_blocks.clone()][start..end];
            QuantizedBlockCursor::new(stream, self.score_bits, self.reference_size)
                .map(BlockCursor::Quantized)
        } else {
            Ok(BlockCursor::Raw(RawBlockCursor {
                scores: &self.f32s(&self.ranges.block_max_scores)[start..end],
                weights: &self.f32s(&self.ranges.block_max_weights)[start..end],
                docids: &self.u32s(&self.ranges.block_docids)[start..end],
                pos: 0,
            }))
        }
    }
}

/// Cursor over one list's blocks; advances block by block and parks on the
/// final block.
pub enum BlockCursor<'a> {
    Raw(RawBlockCursor<'a>),
    Quantized(QuantizedBlockCursor<'a>),
}

impl BlockCursor<'_> {
    /// Last docid covered by the current block.
    pub fn docid(&self) -> DocId {
        match self {
            BlockCursor::Raw(c) => c.docids[c.pos],
            BlockCursor::Quantized(c) => (c.packed >> c.score_bits) as DocId,
        }
    }

    /// Max term weight within the current block.
    pub fn score(&self) -> f64 {
        match self {
            BlockCursor::Raw(c) => f64::from(c.scores[c.pos]),
            BlockCursor::Quantized(c) => {
                let index = c.packed & ((1u64 << c.score_bits) - 1);
                (index + 1) as f64 / f64::from(c.reference_size)
            }
        }
    }

    /// Max static document weight within the current block; 0 for the
    /// quantized store, which does not carry it.
    pub fn doc_weight(&self) -> f64 {
        match self {
            BlockCursor::Raw(c) => f64::from(c.weights[c.pos]),
            BlockCursor::Quantized(_) => 0.0,
        }
    }

    /// Advance until the current block covers `target` (or park on the last
    /// block).
    pub fn next_geq(&mut self, target: DocId) {
        match self {
            BlockCursor::Raw(c) => {
                while c.pos + 1 < c.docids.len() && c.docids[c.pos] < target {
                    c.pos += 1;
                }
            }
            BlockCursor::Quantized(c) => {
                while c.pos + 1 < c.count && ((c.packed >> c.score_bits) as DocId) < target {
                    c.step();
                }
            }
        }
    }

    pub fn next(&mut self) {
        match self {
            BlockCursor::Raw(c) => {
                if c.pos + 1 < c.docids.len() {
                    c.pos += 1;
                }
            }
            BlockCursor::Quantized(c) => {
                if c.pos + 1 < c.count {
                    c.step();
                }
            }
        }
    }

    /// Number of blocks in the list.
    pub fn size(&self) -> usize {
        match self {
            BlockCursor::Raw(c) => c.docids.len(),
            BlockCursor::Quantized(c) => c.count,
        }
    }
}

pub struct RawBlockCursor<'a> {
    scores: &'a [f32],
    weights: &'a [f32],
    docids: &'a [u32],
    pos: usize,
}

pub struct QuantizedBlockCursor<'a> {
    stream: &'a [u8],
    offset: usize,
    count: usize,
    pos: usize,
    packed: u64,
    score_bits: u32,
    reference_size: u32,
}

impl<'a> QuantizedBlockCursor<'a> {
    fn new(stream: &'a [u8], score_bits: u32, reference_size: u32) -> StoreResult<Self> {
        let (count, used) = varint::decode(stream)?;
        let mut cursor = Self {
            stream,
            offset: used,
            count: count as usize,
            pos: 0,
            packed: 0,
            score_bits,
            reference_size,
        };
        let (first, used) = varint::decode(&cursor.stream[cursor.offset..])?;
        cursor.packed = first;
        cursor.offset += used;
        Ok(cursor)
    }

    fn step(&mut self) {
        // Stream lengths were validated when the cursor was opened over the
        // list's exact byte range; decode cannot run past it block-by-block.
        if let Ok((gap, used)) = varint::decode(&self.stream[self.offset..]) {
            self.packed += gap;
            self.offset += used;
            self.pos += 1;
        }
    }
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_array_u64(out: &mut Vec<u8>, values: &[u64]) {
    out.extend_from_slice(&(values.len() as u64).to_le_bytes());
    for &v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn write_array_u32(out: &mut Vec<u8>, values: &[u32]) {
    out.extend_from_slice(&(values.len() as u64).to_le_bytes());
    for &v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn write_array_f32(out: &mut Vec<u8>, values: &[f32]) {
    out.extend_from_slice(&(values.len() as u64).to_le_bytes());
    for &v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Byte arrays are padded to whole words so the arrays following them stay
/// 4-byte aligned for zero-copy casts; the count records the exact length.
fn write_bytes_array(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn read_array(data: &[u8], pos: &mut usize, elem_bytes: usize) -> StoreResult<Range<usize>> {
    if data.len() < *pos + 8 {
        return Err(StoreError::format("metadata array header truncated"));
    }
    let count = LittleEndian::read_u64(&data[*pos..*pos + 8]) as usize;
    let start = *pos + 8;
    let byte_len = count * elem_bytes;
    if data.len() < start + byte_len {
        return Err(StoreError::format("metadata array truncated"));
    }
    let mut end_padded = start + byte_len;
    if elem_bytes == 1 {
        // Skip the alignment padding after a byte stream.
        end_padded = start + (byte_len + 3) / 4 * 4;
        if data.len() < end_padded {
            return Err(StoreError::format("metadata array padding truncated"));
        }
    }
    *pos = end_padded;
    Ok(start..start + byte_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::MemoryCollection;
    use crate::postings::{MemoryIndex, PostingCursor, PostingIndex};

    fn sample_collection() -> MemoryCollection {
        MemoryCollection::new(
            4,
            vec![
                (vec![0, 1, 2, 3], vec![3, 3, 1, 3]),
                (vec![1, 3], vec![2, 5]),
            ],
        )
    }

    fn sample_sizes() -> DocumentSizes {
        DocumentSizes::new(vec![10, 10, 10, 20])
    }

    fn build_raw(kind: RankerKind) -> WandData {
        WandData::build(
            &sample_collection(),
            &sample_sizes(),
            kind,
            &WandParams::default(),
            || {},
        )
        .unwrap()
    }

    #[test]
    fn stats_and_scalars() {
        let wand = build_raw(RankerKind::Bm25);
        assert_eq!(wand.num_docs(), 4);
        assert!((wand.average_doclen() - 12.5).abs() < 1e-6);
        assert_eq!(wand.ctf(0), 10);
        assert_eq!(wand.ctf(1), 7);
        assert_eq!(wand.terms_in_collection(), 17.0);
        assert_eq!(wand.ranker_kind(), RankerKind::Bm25);
        assert_eq!(wand.num_terms(), 2);
        wand.verify_checksum().unwrap();
    }

    #[test]
    fn norm_lens_follow_ranker() {
        let wand = build_raw(RankerKind::Bm25);
        assert!((wand.norm_len(0) - 10.0 / 12.5).abs() < 1e-6);
        let wand = build_raw(RankerKind::LmDirichlet);
        assert_eq!(wand.norm_len(0), 10.0);
        assert_eq!(wand.norm_len(3), 20.0);
    }

    #[test]
    fn list_maxima_bound_posting_scores() {
        let wand = build_raw(RankerKind::Bm25);
        let index = MemoryIndex::new(
            4,
            vec![
                (vec![0, 1, 2, 3], vec![3, 3, 1, 3]),
                (vec![1, 3], vec![2, 5]),
            ],
        );
        let ranker = wand.ranker();
        for t in 0..2u32 {
            let mut cursor = index.cursor(t).unwrap();
            let list_max = wand.max_term_weight(t);
            let mut block = wand.block_cursor(t).unwrap();
            while cursor.docid() < 4 {
                let d = cursor.docid();
                let score =
                    ranker.doc_term_weight(u64::from(cursor.freq()), wand.norm_len(d), wand.ctf(t));
                assert!(list_max >= score - 1e-9);
                block.next_geq(d);
                assert!(block.score() >= score - 1e-9);
                assert!(block.docid() >= d);
                cursor.next();
            }
        }
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coll.wand");
        let built = build_raw(RankerKind::LmDirichlet);
        built.write_to(&path).unwrap();
        let mapped = WandData::open(&path).unwrap();
        mapped.verify_checksum().unwrap();
        assert_eq!(mapped.num_docs(), built.num_docs());
        assert_eq!(mapped.ranker_kind(), RankerKind::LmDirichlet);
        for t in 0..2u32 {
            assert_eq!(mapped.max_term_weight(t), built.max_term_weight(t));
            assert_eq!(mapped.max_document_weight(t), built.max_document_weight(t));
            assert_eq!(mapped.ctf(t), built.ctf(t));
        }
        for d in 0..4u32 {
            assert_eq!(mapped.norm_len(d), built.norm_len(d));
        }
    }

    #[test]
    fn quantized_blocks_upper_bound_raw_blocks() {
        let params = WandParams {
            partitioning: Partitioning::Fixed { block_size: 2 },
            quantize: Some(32),
        };
        let quantized = WandData::build(
            &sample_collection(),
            &sample_sizes(),
            RankerKind::Bm25,
            &params,
            || {},
        )
        .unwrap();
        assert!(quantized.is_quantized());
        let raw_fixed = WandData::build(
            &sample_collection(),
            &sample_sizes(),
            RankerKind::Bm25,
            &WandParams {
                partitioning: Partitioning::Fixed { block_size: 2 },
                quantize: None,
            },
            || {},
        )
        .unwrap();
        for t in 0..2u32 {
            let mut r = raw_fixed.block_cursor(t).unwrap();
            let mut q = quantized.block_cursor(t).unwrap();
            assert_eq!(r.size(), q.size());
            for _ in 0..r.size() {
                assert_eq!(r.docid(), q.docid());
                // Quantization rounds scores up, never down.
                assert!(q.score() + 1e-9 >= r.score());
                assert_eq!(q.doc_weight(), 0.0);
                r.next();
                q.next();
            }
        }
    }

    #[test]
    fn quantized_lm_rejected() {
        let params = WandParams {
            partitioning: Partitioning::Fixed { block_size: 2 },
            quantize: Some(32),
        };
        let err = WandData::build(
            &sample_collection(),
            &sample_sizes(),
            RankerKind::LmDirichlet,
            &params,
            || {},
        );
        assert!(matches!(err, Err(StoreError::NotSupported(_))));
    }

    #[test]
    fn non_power_of_two_reference_rejected() {
        let params = WandParams {
            partitioning: Partitioning::Fixed { block_size: 2 },
            quantize: Some(37),
        };
        let err = WandData::build(
            &sample_collection(),
            &sample_sizes(),
            RankerKind::Bm25,
            &params,
            || {},
        );
        assert!(matches!(err, Err(StoreError::NotSupported(_))));
    }

    #[test]
    fn block_cursor_walks_fixed_blocks() {
        let params = WandParams {
            partitioning: Partitioning::Fixed { block_size: 2 },
            quantize: None,
        };
        let wand = WandData::build(
            &sample_collection(),
            &sample_sizes(),
            RankerKind::Bm25,
            &params,
            || {},
        )
        .unwrap();
        let mut cursor = wand.block_cursor(0).unwrap();
        assert_eq!(cursor.size(), 2);
        // First block covers docs {0,1}: its recorded bound is 2 - 1.
        assert_eq!(cursor.docid(), 1);
        cursor.next_geq(2);
        assert_eq!(cursor.docid(), 3);
        cursor.next();
        assert_eq!(cursor.docid(), 3);
    }
}
