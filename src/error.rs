//! Crate-wide error type.
//!
//! Recoverable conditions (a missing or truncated database file) are returned
//! to the caller so the heuristic loader can try alternatives; everything else
//! carries enough context (`stage`, path) to be reported as-is by a driver.

use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum Error {
    /// No file at the expected path. Often benign: the loader probes several
    /// representations before giving up.
    NotFound { path: String },
    /// A file exists but its size does not match what the tileset dictates.
    Malformed {
        path: String,
        expected: u64,
        actual: u64,
    },
    /// An allocation was refused. Pattern databases are large; callers should
    /// not expect to continue without the table they asked for.
    Resource {
        stage: &'static str,
        structure: &'static str,
    },
    /// An underlying read or write failed.
    Io {
        stage: &'static str,
        path: String,
        error: String,
    },
    /// The caller asked for something nonsensical (unknown heuristic type,
    /// oversized worker count, malformed tile list).
    Usage { reason: String },
    /// A database failed its internal consistency check.
    Verify { reason: String },
}

impl Error {
    pub(crate) fn io(stage: &'static str, path: &Path, error: std::io::Error) -> Error {
        Error::Io {
            stage,
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    pub(crate) fn usage(reason: impl Into<String>) -> Error {
        Error::Usage {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { path } => write!(f, "not found: {path}"),
            Error::Malformed {
                path,
                expected,
                actual,
            } => write!(
                f,
                "malformed file {path}: expected {expected} bytes, found {actual}"
            ),
            Error::Resource { stage, structure } => {
                write!(f, "allocation failed at {stage} for {structure}")
            }
            Error::Io { stage, path, error } => {
                write!(f, "io error at {stage} for {path}: {error}")
            }
            Error::Usage { reason } => write!(f, "usage error: {reason}"),
            Error::Verify { reason } => write!(f, "verification failed: {reason}"),
        }
    }
}

impl std::error::Error for Error {}
