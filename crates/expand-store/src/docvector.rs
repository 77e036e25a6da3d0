//! Compressed forward index: one term/frequency vector per document.
//!
//! Term ids are delta-coded then block-bitpacked; frequencies are
//! block-bitpacked without deltas. Each vector also stores the document
//! length (the sum of its frequencies), which relevance-model estimation
//! divides by.
//!
//! On-disk layout (little-endian), after a `unique_terms:u32 | num_docs:u32`
//! file header, one record per document in docid order:
//!
//! ```text
//! docid:u32 | doclen:u32 | term_bytes:u64 | freq_bytes:u64 | size:u32 |
//! tsize:u32 | term_payload[tsize * 4 bytes] |
//! fsize:u32 | freq_payload[fsize * 4 bytes]
//! ```
//!
//! `term_bytes`/`freq_bytes` are the exact encoded byte counts; payloads are
//! zero-padded to whole `u32` words (`tsize`/`fsize` count words).

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::codec::{blockpack, delta};
use crate::collection::CollectionSource;
use crate::error::{StoreError, StoreResult};
use crate::{DocId, TermId};

/// Term-id value a cursor reports once it runs off the end of a vector.
pub const TERMID_END: TermId = TermId::MAX;

/// A single document's compressed term vector.
pub struct DocumentVector {
    docid: DocId,
    doclen: u32,
    size: u32,
    term_bytes: u64,
    freq_bytes: u64,
    terms: Vec<u8>,
    freqs: Vec<u8>,
}

fn pad_to_words(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
}

impl DocumentVector {
    /// Compress a raw `(term, freq)` vector. Terms must be strictly
    /// increasing and aligned with `freqs`.
    pub fn new(docid: DocId, terms: &[TermId], freqs: &[u32]) -> Self {
        assert_eq!(terms.len(), freqs.len());
        debug_assert!(terms.windows(2).all(|w| w[0] < w[1]));
        if terms.is_empty() {
            return Self {
                docid,
                doclen: 0,
                size: 0,
                term_bytes: 0,
                freq_bytes: 0,
                terms: Vec::new(),
                freqs: Vec::new(),
            };
        }
        let doclen = freqs.iter().sum();
        let mut gaps = terms.to_vec();
        delta::encode_in_place(&mut gaps);
        let term_payload = blockpack::encode(&gaps);
        let freq_payload = blockpack::encode(freqs);
        Self {
            docid,
            doclen,
            size: terms.len() as u32,
            term_bytes: term_payload.len() as u64,
            freq_bytes: freq_payload.len() as u64,
            terms: pad_to_words(term_payload),
            freqs: pad_to_words(freq_payload),
        }
    }

    pub fn docid(&self) -> DocId {
        self.docid
    }

    /// Document length in tokens (sum of stored frequencies).
    pub fn doclen(&self) -> u32 {
        self.doclen
    }

    /// Number of distinct terms.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decompress into parallel term and frequency vectors.
    pub fn decode(&self) -> StoreResult<(Vec<TermId>, Vec<u32>)> {
        if self.size == 0 {
            return Ok((Vec::new(), Vec::new()));
        }
        let count = self.size as usize;
        let mut terms = blockpack::decode(&self.terms[..self.term_bytes as usize], count)?;
        delta::decode_in_place(&mut terms);
        let freqs = blockpack::decode(&self.freqs[..self.freq_bytes as usize], count)?;
        Ok((terms, freqs))
    }

    /// Open a decompressing cursor positioned at the first term.
    pub fn cursor(&self) -> StoreResult<VectorCursor> {
        let (terms, freqs) = self.decode()?;
        Ok(VectorCursor {
            terms,
            freqs,
            doclen: self.doclen,
            pos: 0,
        })
    }

    fn serialize(&self, writer: &mut impl Write) -> StoreResult<()> {
        writer.write_u32::<LittleEndian>(self.docid)?;
        writer.write_u32::<LittleEndian>(self.doclen)?;
        writer.write_u64::<LittleEndian>(self.term_bytes)?;
        writer.write_u64::<LittleEndian>(self.freq_bytes)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u32::<LittleEndian>((self.terms.len() / 4) as u32)?;
        writer.write_all(&self.terms)?;
        writer.write_u32::<LittleEndian>((self.freqs.len() / 4) as u32)?;
        writer.write_all(&self.freqs)?;
        Ok(())
    }

    fn load(reader: &mut impl Read) -> StoreResult<Self> {
        let docid = reader.read_u32::<LittleEndian>()?;
        let doclen = reader.read_u32::<LittleEndian>()?;
        let term_bytes = reader.read_u64::<LittleEndian>()?;
        let freq_bytes = reader.read_u64::<LittleEndian>()?;
        let size = reader.read_u32::<LittleEndian>()?;
        let tsize = reader.read_u32::<LittleEndian>()? as usize;
        let mut terms = vec![0u8; tsize * 4];
        reader.read_exact(&mut terms)?;
        let fsize = reader.read_u32::<LittleEndian>()? as usize;
        let mut freqs = vec![0u8; fsize * 4];
        reader.read_exact(&mut freqs)?;
        if term_bytes as usize > terms.len() || freq_bytes as usize > freqs.len() {
            return Err(StoreError::Corrupt(format!(
                "vector payload for doc {} shorter than its encoded byte count",
                docid
            )));
        }
        Ok(Self {
            docid,
            doclen,
            size,
            term_bytes,
            freq_bytes,
            terms,
            freqs,
        })
    }
}

/// Single-pass cursor over a decompressed vector. Restart by calling
/// [`DocumentVector::cursor`] again.
pub struct VectorCursor {
    terms: Vec<TermId>,
    freqs: Vec<u32>,
    doclen: u32,
    pos: usize,
}

impl VectorCursor {
    /// Current term id, or [`TERMID_END`] once exhausted.
    pub fn termid(&self) -> TermId {
        if self.pos < self.terms.len() {
            self.terms[self.pos]
        } else {
            TERMID_END
        }
    }

    /// Frequency at the current position.
    pub fn freq(&self) -> u32 {
        self.freqs[self.pos]
    }

    pub fn next(&mut self) {
        if self.pos < self.terms.len() {
            self.pos += 1;
        }
    }

    pub fn doclen(&self) -> u32 {
        self.doclen
    }
}

/// The forward index: every document's vector, addressable by docid.
pub struct DocumentIndex {
    unique_terms: u32,
    vectors: Vec<DocumentVector>,
}

impl DocumentIndex {
    /// Invert a posting collection into per-document vectors, skipping any
    /// term in `stoplist`.
    pub fn build(
        source: &impl CollectionSource,
        stoplist: &std::collections::HashSet<TermId>,
    ) -> Self {
        let num_docs = source.num_docs() as usize;
        let mut terms: Vec<Vec<TermId>> = vec![Vec::new(); num_docs];
        let mut freqs: Vec<Vec<u32>> = vec![Vec::new(); num_docs];
        for t in 0..source.num_sequences() {
            let term = t as TermId;
            if stoplist.contains(&term) {
                continue;
            }
            let seq = source.sequence(t);
            for (&docid, &f) in seq.docids.iter().zip(seq.freqs) {
                terms[docid as usize].push(term);
                freqs[docid as usize].push(f);
            }
        }
        let vectors = terms
            .iter()
            .zip(&freqs)
            .enumerate()
            .map(|(d, (t, f))| DocumentVector::new(d as DocId, t, f))
            .collect();
        Self {
            unique_terms: source.num_sequences() as u32,
            vectors,
        }
    }

    pub fn serialize(&self, writer: &mut impl Write) -> StoreResult<()> {
        writer.write_u32::<LittleEndian>(self.unique_terms)?;
        writer.write_u32::<LittleEndian>(self.vectors.len() as u32)?;
        for vector in &self.vectors {
            vector.serialize(writer)?;
        }
        Ok(())
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.serialize(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(reader: &mut impl Read) -> StoreResult<Self> {
        let unique_terms = reader.read_u32::<LittleEndian>()?;
        let num_docs = reader.read_u32::<LittleEndian>()? as usize;
        let mut vectors = Vec::with_capacity(num_docs);
        for _ in 0..num_docs {
            vectors.push(DocumentVector::load(reader)?);
        }
        Ok(Self {
            unique_terms,
            vectors,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let index = Self::load(&mut reader)?;
        eprintln!(
            "forward index: {} documents, {} unique terms",
            index.num_docs(),
            index.unique_terms
        );
        Ok(index)
    }

    pub fn num_docs(&self) -> usize {
        self.vectors.len()
    }

    pub fn unique_terms(&self) -> u32 {
        self.unique_terms
    }

    pub fn vector(&self, docid: DocId) -> StoreResult<&DocumentVector> {
        self.vectors.get(docid as usize).ok_or_else(|| {
            StoreError::format(format!("docid {} out of range", docid))
        })
    }
}
