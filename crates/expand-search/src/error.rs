//! Error types for expand-search.

use std::fmt;

use expand_store::StoreError;

/// Errors surfaced by query-time components.
#[derive(Debug)]
pub enum SearchError {
    /// Underlying index structure failed.
    Store(StoreError),
    /// I/O error outside the store (query files, run output).
    Io(std::io::Error),
    /// Invalid configuration: unknown key, missing path, out-of-range value.
    Config(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Store(e) => write!(f, "Store error: {}", e),
            SearchError::Io(e) => write!(f, "I/O error: {}", e),
            SearchError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::Store(e) => Some(e),
            SearchError::Io(e) => Some(e),
            SearchError::Config(_) => None,
        }
    }
}

impl From<StoreError> for SearchError {
    fn from(e: StoreError) -> Self {
        SearchError::Store(e)
    }
}

impl From<std::io::Error> for SearchError {
    fn from(e: std::io::Error) -> Self {
        SearchError::Io(e)
    }
}

/// Result alias used throughout the crate.
pub type SearchResult<T> = Result<T, SearchError>;
