//! Term lexicon and related text-file loaders.
//!
//! The lexicon file is one record per line: `<term> <id> <df> <cf>`. Only
//! the surface form and the id are kept; document and collection
//! frequencies are read from WAND metadata at query time.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::TermId;

/// Surface-form to term-id mapping, with an optional reverse map.
pub struct Lexicon {
    by_term: HashMap<String, TermId>,
    by_id: Option<HashMap<TermId, String>>,
}

impl Lexicon {
    /// Load a lexicon from a `<term> <id> <df> <cf>` text file.
    pub fn from_path(path: impl AsRef<Path>, with_reverse: bool) -> StoreResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), with_reverse)
    }

    pub fn from_reader(reader: impl Read, with_reverse: bool) -> StoreResult<Self> {
        let mut by_term = HashMap::new();
        let mut by_id = with_reverse.then(HashMap::new);
        for line in BufReader::new(reader).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let term = fields
                .next()
                .ok_or_else(|| StoreError::format("empty lexicon record"))?;
            let id: TermId = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| StoreError::Format {
                    message: "bad lexicon record".to_string(),
                    expected: Some("<term> <id> <df> <cf>".to_string()),
                    actual: Some(line.clone()),
                })?;
            if let Some(reverse) = by_id.as_mut() {
                reverse.insert(id, term.to_string());
            }
            by_term.insert(term.to_string(), id);
        }
        eprintln!("lexicon: {} terms", by_term.len());
        Ok(Self { by_term, by_id })
    }

    /// Build directly from pairs; used by tests and in-memory pipelines.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, TermId)>) -> Self {
        let by_term: HashMap<String, TermId> = pairs.into_iter().collect();
        Self {
            by_term,
            by_id: None,
        }
    }

    /// Resolve a surface form.
    pub fn get(&self, term: &str) -> Option<TermId> {
        self.by_term.get(term).copied()
    }

    /// Reverse lookup; available only when loaded with `with_reverse`.
    pub fn term(&self, id: TermId) -> Option<&str> {
        self.by_id.as_ref()?.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_term.is_empty()
    }

    /// Iterate all `(surface, id)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TermId)> {
        self.by_term.iter().map(|(t, &id)| (t.as_str(), id))
    }
}

/// Load the docid name map: one external document name per line, line index
/// = internal docid.
pub fn load_docid_map(path: impl AsRef<Path>) -> StoreResult<Vec<String>> {
    let file = File::open(path)?;
    let mut names = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        for token in line.split_whitespace() {
            names.push(token.to_string());
        }
    }
    Ok(names)
}

/// Load a stoplist of surface terms, resolving each through the lexicon.
/// Terms absent from the lexicon are ignored.
pub fn load_stoplist(path: impl AsRef<Path>, lexicon: &Lexicon) -> StoreResult<HashSet<TermId>> {
    let file = File::open(path)?;
    let mut stopped = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        for token in line.split_whitespace() {
            if let Some(id) = lexicon.get(token) {
                stopped.insert(id);
            }
        }
    }
    eprintln!("stoplist: {} stopped term ids", stopped.len());
    Ok(stopped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEX: &str = "apple 0 3 7\nbanana 1 2 2\ncherry 2 1 1\n";

    #[test]
    fn parses_records() {
        let lex = Lexicon::from_reader(LEX.as_bytes(), false).unwrap();
        assert_eq!(lex.len(), 3);
        assert_eq!(lex.get("banana"), Some(1));
        assert_eq!(lex.get("durian"), None);
        assert!(lex.term(1).is_none());
    }

    #[test]
    fn reverse_map() {
        let lex = Lexicon::from_reader(LEX.as_bytes(), true).unwrap();
        assert_eq!(lex.term(2), Some("cherry"));
    }

    #[test]
    fn rejects_malformed_record() {
        assert!(Lexicon::from_reader("apple zero 3 7\n".as_bytes(), false).is_err());
    }

    #[test]
    fn stoplist_resolves_through_lexicon() {
        use std::io::Write;
        let lex = Lexicon::from_reader(LEX.as_bytes(), false).unwrap();
        let mut stop = tempfile::NamedTempFile::new().unwrap();
        writeln!(stop, "banana\nunknown").unwrap();
        let stopped = load_stoplist(stop.path(), &lex).unwrap();
        assert_eq!(stopped.len(), 1);
        assert!(stopped.contains(&1));
    }
}
