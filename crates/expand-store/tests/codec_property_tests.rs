//! Property-based tests for the compression primitives and the document
//! vector store built on them.

use proptest::prelude::*;

use expand_store::codec::{blockpack, delta, varint};
use expand_store::docvector::{DocumentVector, TERMID_END};

proptest! {
    #[test]
    fn varint_round_trip(values in prop::collection::vec(any::<u64>(), 0..200)) {
        let mut buf = Vec::new();
        for &v in &values {
            varint::encode_into(v, &mut buf);
        }
        let mut pos = 0;
        let mut decoded = Vec::new();
        while pos < buf.len() {
            let (v, used) = varint::decode(&buf[pos..]).unwrap();
            decoded.push(v);
            pos += used;
        }
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn blockpack_round_trip(values in prop::collection::vec(any::<u32>(), 1..600)) {
        let coded = blockpack::encode(&values);
        let decoded = blockpack::decode(&coded, values.len()).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn delta_round_trip(gaps in prop::collection::vec(0u32..10_000, 1..300)) {
        // Build a strictly increasing sequence, code it, decode it back.
        let mut values = Vec::with_capacity(gaps.len());
        let mut cur = 0u32;
        for &g in &gaps {
            cur += g + 1;
            values.push(cur);
        }
        let mut coded = values.clone();
        delta::encode_in_place(&mut coded);
        delta::decode_in_place(&mut coded);
        prop_assert_eq!(coded, values);
    }

    #[test]
    fn document_vector_round_trip(
        entries in prop::collection::vec((0u32..50_000, 1u32..200), 1..150)
    ) {
        // Distinct, sorted term ids with their frequencies.
        let mut entries = entries;
        entries.sort_by_key(|e| e.0);
        entries.dedup_by_key(|e| e.0);
        let terms: Vec<u32> = entries.iter().map(|e| e.0).collect();
        let freqs: Vec<u32> = entries.iter().map(|e| e.1).collect();

        let vector = DocumentVector::new(0, &terms, &freqs);
        let (t, f) = vector.decode().unwrap();
        prop_assert_eq!(&t, &terms);
        prop_assert_eq!(&f, &freqs);
        // Stored length equals the frequency sum.
        prop_assert_eq!(vector.doclen(), freqs.iter().sum::<u32>());

        // Cursor iteration agrees with bulk decode.
        let mut cursor = vector.cursor().unwrap();
        for (expect_t, expect_f) in terms.iter().zip(&freqs) {
            prop_assert_eq!(cursor.termid(), *expect_t);
            prop_assert_eq!(cursor.freq(), *expect_f);
            cursor.next();
        }
        prop_assert_eq!(cursor.termid(), TERMID_END);
    }
}
