//! Error types for expand-store.

use std::fmt;

/// Errors that can occur while building or reading on-disk structures.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error (file operations, memory mapping).
    Io(std::io::Error),

    /// Format error (bad magic bytes, version mismatch, truncated or
    /// misaligned data).
    Format {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// Checksum mismatch (data corruption detected).
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Logically inconsistent data (e.g. doc/freq sequence misalignment).
    Corrupt(String),

    /// Requested combination is not supported.
    NotSupported(String),
}

impl StoreError {
    /// Shorthand for a format error without expected/actual detail.
    pub fn format(message: impl Into<String>) -> Self {
        StoreError::Format {
            message: message.into(),
            expected: None,
            actual: None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
            StoreError::Format {
                message,
                expected,
                actual,
            } => {
                write!(f, "Format error: {}", message)?;
                if let Some(e) = expected {
                    write!(f, " (expected: {})", e)?;
                }
                if let Some(a) = actual {
                    write!(f, " (actual: {})", a)?;
                }
                Ok(())
            }
            StoreError::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch: expected {:#010x}, found {:#010x}",
                expected, actual
            ),
            StoreError::Corrupt(msg) => write!(f, "Corrupt data: {}", msg),
            StoreError::NotSupported(msg) => write!(f, "Not supported: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Result alias used throughout the crate.
pub type StoreResult<T> = Result<T, StoreError>;
