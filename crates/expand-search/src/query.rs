//! Query parsing and term-frequency preparation.
//!
//! Query files carry one query per line, `<QID>` first. Tokens are either
//! surface terms resolved through a lexicon (unknown tokens are dropped
//! with a warning) or raw numeric term ids.

use std::io::{BufRead, BufReader, Read};

use expand_store::lexicon::Lexicon;
use expand_store::TermId;

use crate::error::{SearchError, SearchResult};

/// A query's term ids, duplicates preserved.
pub type TermIdQuery = Vec<TermId>;

/// Collapse a query into sorted `(term, multiplicity)` pairs.
pub fn query_term_freqs(terms: &[TermId]) -> Vec<(TermId, u64)> {
    let mut sorted = terms.to_vec();
    sorted.sort_unstable();
    let mut freqs: Vec<(TermId, u64)> = Vec::with_capacity(sorted.len());
    for term in sorted {
        match freqs.last_mut() {
            Some((last, count)) if *last == term => *count += 1,
            _ => freqs.push((term, 1)),
        }
    }
    freqs
}

/// Resolve raw tokens against a lexicon, dropping out-of-vocabulary tokens
/// with a warning.
pub fn parse_query(tokens: &[String], lexicon: &Lexicon) -> TermIdQuery {
    let mut parsed = Vec::with_capacity(tokens.len());
    for token in tokens {
        match lexicon.get(token) {
            Some(id) => parsed.push(id),
            None => eprintln!("warning: term '{}' not in lexicon, dropping", token),
        }
    }
    parsed
}

/// Read a `<QID> <token>...` query file without resolving tokens.
pub fn read_string_queries(reader: impl Read) -> SearchResult<Vec<(u32, Vec<String>)>> {
    let mut queries = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };
        let qid: u32 = first
            .parse()
            .map_err(|_| SearchError::Config(format!("bad query id '{}'", first)))?;
        queries.push((qid, fields.map(str::to_string).collect()));
    }
    Ok(queries)
}

/// Read a `<QID> <TermId>...` query file.
pub fn read_termid_queries(reader: impl Read) -> SearchResult<Vec<(u32, TermIdQuery)>> {
    let mut queries = Vec::new();
    for (qid, tokens) in read_string_queries(reader)? {
        let mut terms = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let id: TermId = token
                .parse()
                .map_err(|_| SearchError::Config(format!("bad term id '{}'", token)))?;
            terms.push(id);
        }
        queries.push((qid, terms));
    }
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_freqs_count_multiplicity() {
        assert_eq!(
            query_term_freqs(&[5, 2, 5, 9, 2, 5]),
            vec![(2, 2), (5, 3), (9, 1)]
        );
        assert!(query_term_freqs(&[]).is_empty());
    }

    #[test]
    fn parse_drops_oov_tokens() {
        let lexicon = Lexicon::from_pairs([("cat".to_string(), 3), ("dog".to_string(), 4)]);
        let tokens = vec!["cat".to_string(), "bird".to_string(), "dog".to_string()];
        assert_eq!(parse_query(&tokens, &lexicon), vec![3, 4]);
    }

    #[test]
    fn string_query_file() {
        let input = "101 deep learning retrieval\n102 sparse index\n";
        let queries = read_string_queries(input.as_bytes()).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].0, 101);
        assert_eq!(queries[0].1.len(), 3);
        assert_eq!(queries[1].1, vec!["sparse", "index"]);
    }

    #[test]
    fn termid_query_file() {
        let input = "7 12 9 12\n";
        let queries = read_termid_queries(input.as_bytes()).unwrap();
        assert_eq!(queries, vec![(7, vec![12, 9, 12])]);
    }

    #[test]
    fn non_numeric_termid_is_an_error() {
        assert!(read_termid_queries("7 twelve\n".as_bytes()).is_err());
    }
}
