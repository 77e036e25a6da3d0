//! TREC run-file output.

use std::io::Write;

use crate::error::SearchResult;
use crate::topk::TopKList;

/// Write one query's ranking in TREC format:
/// `<QID> Q0 <docname> <rank> <score> <run_tag>`, ranks 1-based. Documents
/// without an entry in `doc_map` fall back to their numeric id.
pub fn output_trec(
    results: &TopKList,
    qid: u32,
    doc_map: &[String],
    run_tag: &str,
    writer: &mut impl Write,
) -> SearchResult<()> {
    for (rank0, &(score, docid)) in results.iter().enumerate() {
        match doc_map.get(docid as usize) {
            Some(name) => writeln!(
                writer,
                "{} Q0 {} {} {} {}",
                qid,
                name,
                rank0 + 1,
                score,
                run_tag
            )?,
            None => writeln!(
                writer,
                "{} Q0 {} {} {} {}",
                qid,
                docid,
                rank0 + 1,
                score,
                run_tag
            )?,
        }
    }
    Ok(())
}
