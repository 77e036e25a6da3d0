//! Posting-list cursors and the indexes that provide them.
//!
//! Traversal engines are written against the [`PostingIndex`] capability
//! only: a per-term forward cursor with `docid`, `freq`, `next`, `next_geq`
//! and `size`. An exhausted cursor parks at `docid() == num_docs`.
//!
//! Two implementations live here:
//! - [`MemoryIndex`]: vec-backed, for tests and programmatic pipelines.
//! - [`PlainIndex`]: a memory-mapped uncompressed on-disk index with an
//!   offset table, suitable as the concrete reader behind the engines.
//!   Compressed encodings are external collaborators behind the same trait.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ByteOrder, WriteBytesExt};
use memmap2::Mmap;

use crate::collection::{CollectionSource, PostingSequence};
use crate::error::{StoreError, StoreResult};
use crate::{DocId, TermId};

/// Forward-only cursor over one term's postings.
pub trait PostingCursor {
    /// Current docid, or the index's `num_docs` when exhausted.
    fn docid(&self) -> DocId;
    /// Frequency at the current position. Undefined once exhausted.
    fn freq(&self) -> u32;
    /// Advance one posting.
    fn next(&mut self);
    /// Advance to the first posting with `docid >= target`.
    fn next_geq(&mut self, target: DocId);
    /// Number of postings in the list (the term's document frequency).
    fn size(&self) -> usize;
}

/// Capability set the traversal engines require from an inverted index.
pub trait PostingIndex {
    type Cursor<'a>: PostingCursor
    where
        Self: 'a;

    fn num_docs(&self) -> u64;
    fn num_terms(&self) -> usize;
    /// Open a cursor over `term`'s posting list.
    fn cursor(&self, term: TermId) -> StoreResult<Self::Cursor<'_>>;
    /// Touch the pages backing `term`'s list ahead of traversal.
    fn warmup(&self, term: TermId);
}

/// Cursor over borrowed docid/freq slices; shared by both index types.
pub struct SliceCursor<'a> {
    docids: &'a [u32],
    freqs: &'a [u32],
    pos: usize,
    num_docs: DocId,
}

impl<'a> SliceCursor<'a> {
    pub fn new(docids: &'a [u32], freqs: &'a [u32], num_docs: DocId) -> Self {
        debug_assert_eq!(docids.len(), freqs.len());
        Self {
            docids,
            freqs,
            pos: 0,
            num_docs,
        }
    }
}

impl PostingCursor for SliceCursor<'_> {
    fn docid(&self) -> DocId {
        if self.pos < self.docids.len() {
            self.docids[self.pos]
        } else {
            self.num_docs
        }
    }

    fn freq(&self) -> u32 {
        self.freqs[self.pos]
    }

    fn next(&mut self) {
        if self.pos < self.docids.len() {
            self.pos += 1;
        }
    }

    fn next_geq(&mut self, target: DocId) {
        // Exponential probe from the current position, then binary search
        // within the bracketed window. Skips are usually short.
        let len = self.docids.len();
        if self.pos >= len || self.docids[self.pos] >= target {
            return;
        }
        let mut step = 1usize;
        let mut lo = self.pos;
        let mut hi = self.pos + step;
        while hi < len && self.docids[hi] < target {
            lo = hi;
            step *= 2;
            hi = self.pos + step;
        }
        let window = &self.docids[lo..len.min(hi + 1)];
        self.pos = lo + window.partition_point(|&d| d < target);
    }

    fn size(&self) -> usize {
        self.docids.len()
    }
}

/// Vec-backed index.
#[derive(Debug)]
pub struct MemoryIndex {
    num_docs: u32,
    lists: Vec<(Vec<u32>, Vec<u32>)>,
}

impl MemoryIndex {
    /// `lists[t]` holds term `t`'s `(docids, freqs)`, docids strictly
    /// increasing.
    pub fn new(num_docs: u32, lists: Vec<(Vec<u32>, Vec<u32>)>) -> Self {
        for (docids, freqs) in &lists {
            assert_eq!(docids.len(), freqs.len());
            debug_assert!(docids.windows(2).all(|w| w[0] < w[1]));
            debug_assert!(docids.iter().all(|&d| d < num_docs));
        }
        Self { num_docs, lists }
    }

    /// Invert a per-document view: `docs[d]` = (term ids, freqs).
    pub fn from_documents(num_terms: usize, docs: &[(Vec<u32>, Vec<u32>)]) -> Self {
        let mut lists = vec![(Vec::new(), Vec::new()); num_terms];
        for (docid, (terms, freqs)) in docs.iter().enumerate() {
            for (&t, &f) in terms.iter().zip(freqs) {
                lists[t as usize].0.push(docid as u32);
                lists[t as usize].1.push(f);
            }
        }
        Self::new(docs.len() as u32, lists)
    }
}

impl PostingIndex for MemoryIndex {
    type Cursor<'a> = SliceCursor<'a>;

    fn num_docs(&self) -> u64 {
        u64::from(self.num_docs)
    }

    fn num_terms(&self) -> usize {
        self.lists.len()
    }

    fn cursor(&self, term: TermId) -> StoreResult<SliceCursor<'_>> {
        let (docids, freqs) = self.lists.get(term as usize).ok_or_else(|| {
            StoreError::format(format!("term {} out of range", term))
        })?;
        Ok(SliceCursor::new(docids, freqs, self.num_docs))
    }

    fn warmup(&self, _term: TermId) {}
}

impl CollectionSource for MemoryIndex {
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

const PLAIN_MAGIC: [u8; 4] = *b"PIDX";
const PLAIN_VERSION: u32 = 1;
const PLAIN_HEADER_BYTES: usize = 24;

/// Memory-mapped uncompressed index.
///
/// Layout (little-endian):
/// `magic | version:u32 | num_docs:u32 | num_terms:u32 | crc32:u32 |
/// reserved:u32 | offsets:u64[num_terms+1] | payload`, where each term's
/// payload is `len:u32 | docids:u32[len] | freqs:u32[len]` and offsets are
/// byte positions relative to the payload start.
pub struct PlainIndex {
    mmap: Mmap,
    num_docs: u32,
    num_terms: usize,
    payload_start: usize,
}

impl PlainIndex {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        if mmap.len() < PLAIN_HEADER_BYTES {
            return Err(StoreError::format("plain index file too small"));
        }
        if mmap[0..4] != PLAIN_MAGIC {
            return Err(StoreError::Format {
                message: "bad plain index magic".to_string(),
                expected: Some(format!("{:?}", PLAIN_MAGIC)),
                actual: Some(format!("{:?}", &mmap[0..4])),
            });
        }
        let version = LittleEndian::read_u32(&mmap[4..8]);
        if version != PLAIN_VERSION {
            return Err(StoreError::Format {
                message: "plain index version mismatch".to_string(),
                expected: Some(PLAIN_VERSION.to_string()),
                actual: Some(version.to_string()),
            });
        }
        let num_docs = LittleEndian::read_u32(&mmap[8..12]);
        let num_terms = LittleEndian::read_u32(&mmap[12..16]) as usize;
        let payload_start = PLAIN_HEADER_BYTES + (num_terms + 1) * 8;
        if mmap.len() < payload_start {
            return Err(StoreError::format("plain index offset table truncated"));
        }
        let index = Self {
            mmap,
            num_docs,
            num_terms,
            payload_start,
        };
        // The last offset must land exactly at end of file.
        let end = index.offsets()[num_terms] as usize;
        if index.payload_start + end != index.mmap.len() {
            return Err(StoreError::format("plain index payload truncated"));
        }
        Ok(index)
    }

    fn offsets(&self) -> &[u64] {
        bytemuck::cast_slice(&self.mmap[PLAIN_HEADER_BYTES..self.payload_start])
    }

    fn list(&self, term: TermId) -> StoreResult<(&[u32], &[u32])> {
        let t = term as usize;
        if t >= self.num_terms {
            return Err(StoreError::format(format!("term {} out of range", term)));
        }
        let offsets = self.offsets();
        let start = self.payload_start + offsets[t] as usize;
        let end = self.payload_start + offsets[t + 1] as usize;
        let words: &[u32] = bytemuck::try_cast_slice(&self.mmap[start..end])
            .map_err(|_| StoreError::format("misaligned posting payload"))?;
        let len = words[0] as usize;
        if words.len() != 1 + 2 * len {
            return Err(StoreError::Corrupt(format!(
                "posting payload length mismatch for term {}",
                term
            )));
        }
        Ok((&words[1..1 + len], &words[1 + len..]))
    }

    /// Recompute the payload checksum and compare with the stored one.
    pub fn verify_checksum(&self) -> StoreResult<()> {
        let stored = LittleEndian::read_u32(&self.mmap[16..20]);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.mmap[PLAIN_HEADER_BYTES..]);
        let actual = hasher.finalize();
        if stored != actual {
            return Err(StoreError::ChecksumMismatch {
                expected: stored,
                actual,
            });
        }
        Ok(())
    }
}

impl PostingIndex for PlainIndex {
    type Cursor<'a> = SliceCursor<'a>;

    fn num_docs(&self) -> u64 {
        u64::from(self.num_docs)
    }

    fn num_terms(&self) -> usize {
        self.num_terms
    }

    fn cursor(&self, term: TermId) -> StoreResult<SliceCursor<'_>> {
        let (docids, freqs) = self.list(term)?;
        Ok(SliceCursor::new(docids, freqs, self.num_docs))
    }

    fn warmup(&self, term: TermId) {
        if let Ok((docids, _)) = self.list(term) {
            // Touch one word per page to fault the list in.
            let mut sum = 0u32;
            for chunk in docids.chunks(1024) {
                sum = sum.wrapping_add(chunk[0]);
            }
            std::hint::black_box(sum);
        }
    }
}

/// Serialize any [`CollectionSource`] as a plain index file.
pub fn write_plain_index(
    source: &impl CollectionSource,
    path: impl AsRef<Path>,
) -> StoreResult<()> {
    let num_terms = source.num_sequences();
    let mut file = BufWriter::new(File::create(path)?);

    file.write_all(&PLAIN_MAGIC)?;
    file.write_u32::<LittleEndian>(PLAIN_VERSION)?;
    file.write_u32::<LittleEndian>(source.num_docs())?;
    file.write_u32::<LittleEndian>(num_terms as u32)?;
    file.write_u32::<LittleEndian>(0)?; // checksum patched below
    file.write_u32::<LittleEndian>(0)?; // reserved

    let mut offset = 0u64;
    let mut hasher = crc32fast::Hasher::new();
    for t in 0..=num_terms {
        file.write_u64::<LittleEndian>(offset)?;
        hash_u64(&mut hasher, offset);
        if t < num_terms {
            offset += (1 + 2 * source.sequence(t).len() as u64) * 4;
        }
    }
    for t in 0..num_terms {
        let seq = source.sequence(t);
        file.write_u32::<LittleEndian>(seq.len() as u32)?;
        hash_u32(&mut hasher, seq.len() as u32);
        for &d in seq.docids {
            file.write_u32::<LittleEndian>(d)?;
            hash_u32(&mut hasher, d);
        }
        for &f in seq.freqs {
            file.write_u32::<LittleEndian>(f)?;
            hash_u32(&mut hasher, f);
        }
    }
    file.flush()?;

    let mut file = file.into_inner().map_err(|e| StoreError::Io(e.into_error()))?;
    file.seek(SeekFrom::Start(16))?;
    file.write_u32::<LittleEndian>(hasher.finalize())?;
    file.flush()?;
    Ok(())
}

fn hash_u32(hasher: &mut crc32fast::Hasher, v: u32) {
    hasher.update(&v.to_le_bytes());
}

fn hash_u64(hasher: &mut crc32fast::Hasher, v: u64) {
    hasher.update(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> MemoryIndex {
        MemoryIndex::new(
            10,
            vec![
                (vec![0, 2, 4, 6, 8], vec![1, 2, 3, 4, 5]),
                (vec![1, 2, 9], vec![7, 1, 1]),
                (vec![], vec![]),
            ],
        )
    }

    #[test]
    fn cursor_walks_and_parks_at_num_docs() {
        let index = sample_index();
        let mut cursor = index.cursor(1).unwrap();
        assert_eq!(cursor.docid(), 1);
        assert_eq!(cursor.freq(), 7);
        cursor.next();
        assert_eq!(cursor.docid(), 2);
        cursor.next();
        cursor.next();
        assert_eq!(cursor.docid(), 10);
        cursor.next();
        assert_eq!(cursor.docid(), 10);
    }

    #[test]
    fn next_geq_lands_on_first_not_less() {
        let index = sample_index();
        let mut cursor = index.cursor(0).unwrap();
        cursor.next_geq(3);
        assert_eq!(cursor.docid(), 4);
        cursor.next_geq(4);
        assert_eq!(cursor.docid(), 4);
        cursor.next_geq(9);
        assert_eq!(cursor.docid(), 10);
    }

    #[test]
    fn empty_list_is_immediately_exhausted() {
        let index = sample_index();
        let cursor = index.cursor(2).unwrap();
        assert_eq!(cursor.docid(), 10);
        assert_eq!(cursor.size(), 0);
    }

    #[test]
    fn out_of_range_term_is_an_error() {
        let index = sample_index();
        assert!(index.cursor(3).is_err());
    }

    #[test]
    fn plain_index_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.idx");
        let memory = sample_index();
        write_plain_index(&memory, &path).unwrap();

        let plain = PlainIndex::open(&path).unwrap();
        plain.verify_checksum().unwrap();
        assert_eq!(plain.num_docs(), 10);
        assert_eq!(plain.num_terms(), 3);

        for t in 0..3 {
            let mut a = memory.cursor(t).unwrap();
            let mut b = plain.cursor(t).unwrap();
            assert_eq!(a.size(), b.size());
            while a.docid() < 10 {
                assert_eq!(a.docid(), b.docid());
                assert_eq!(a.freq(), b.freq());
                a.next();
                b.next();
            }
            assert_eq!(b.docid(), 10);
        }
        plain.warmup(0);
    }

    #[test]
    fn corrupted_plain_index_fails_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.idx");
        write_plain_index(&sample_index(), &path).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();
        let plain = PlainIndex::open(&path).unwrap();
        assert!(matches!(
            plain.verify_checksum(),
            Err(StoreError::ChecksumMismatch { .. })
        ));
    }
}
