//! Error types for OxiTar operations.
//!
//! Every failure the reader can hit falls into one of a handful of kinds:
//! transport failures, corrupt headers, archives that end too early, and
//! format extensions that are recognized but not modeled. None of them are
//! retried internally; the caller decides whether to abort or discard the
//! rest of the archive.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for OxiTar operations.
#[derive(Debug, Error)]
pub enum OxiTarError {
    /// I/O error from the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The OS refused to open an archive file.
    #[error("Failed to open {}: {source}", path.display())]
    OpenFailed {
        /// Path that could not be opened.
        path: PathBuf,
        /// The translated OS error.
        source: io::Error,
    },

    /// Checksum mismatch or structurally invalid header.
    #[error("Corrupt archive at offset {offset}: {message}")]
    CorruptArchive {
        /// Absolute stream offset of the offending block.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The stream ended in the middle of a header or of expected content.
    #[error("Truncated archive at offset {offset}: expected {expected} more bytes")]
    TruncatedArchive {
        /// Absolute stream offset where the data ran out.
        offset: u64,
        /// Number of bytes that were expected but not available.
        expected: u64,
    },

    /// A format extension that is recognized but not modeled.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Name of the feature.
        feature: String,
    },

    /// Path traversal attempt detected (e.g., "../" in an entry name).
    #[error("Path traversal detected in entry: {}", path.display())]
    PathTraversal {
        /// The suspicious path.
        path: PathBuf,
    },
}

/// Coarse classification of an [`OxiTarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure.
    Io,
    /// Checksum or structural header failure.
    Corrupt,
    /// Stream ended too early.
    Truncated,
    /// Unmodeled format extension.
    Unsupported,
    /// Entry rejected by the extraction driver.
    Unsafe,
}

/// Result type alias for OxiTar operations.
pub type Result<T> = std::result::Result<T, OxiTarError>;

impl OxiTarError {
    /// Create an open failure error.
    pub fn open_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OpenFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a corrupt archive error.
    pub fn corrupt(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptArchive {
            offset,
            message: message.into(),
        }
    }

    /// Create a truncated archive error.
    pub fn truncated(offset: u64, expected: u64) -> Self {
        Self::TruncatedArchive { offset, expected }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    /// Create a path traversal error.
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::OpenFailed { .. } => ErrorKind::Io,
            Self::CorruptArchive { .. } => ErrorKind::Corrupt,
            Self::TruncatedArchive { .. } => ErrorKind::Truncated,
            Self::UnsupportedFeature { .. } => ErrorKind::Unsupported,
            Self::PathTraversal { .. } => ErrorKind::Unsafe,
        }
    }
}

impl From<OxiTarError> for io::Error {
    fn from(err: OxiTarError) -> Self {
        match err {
            OxiTarError::Io(e) => e,
            OxiTarError::OpenFailed { source, .. } => source,
            OxiTarError::TruncatedArchive { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            OxiTarError::UnsupportedFeature { .. } => {
                io::Error::new(io::ErrorKind::Unsupported, err)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
