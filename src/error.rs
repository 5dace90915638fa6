use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::digest::Digest;

/// Errors produced while creating or applying a patch.
#[derive(Error, Debug)]
pub enum PatchError {
    /// A file could not be opened, read, written, or seeked.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The patch text is missing a header line or contains an unparseable line.
    #[error("malformed patch at line {line}: {reason}")]
    MalformedPatch { line: usize, reason: String },

    /// The candidate base file is not the file the patch was generated from.
    #[error(
        "digest mismatch for {}: patch expects {expected}, file has {actual}",
        .path.display()
    )]
    DigestMismatch {
        path: PathBuf,
        expected: Digest,
        actual: Digest,
    },

    /// The two inputs to a diff are not the same length.
    #[error("{} ends at offset {offset}, before the other input", .shorter.display())]
    LengthMismatch { offset: u64, shorter: PathBuf },

    /// An edit addresses a byte past the end of the target file.
    #[error("edit at offset {offset} is outside the target file ({len} bytes)")]
    EditOutOfRange { offset: u64, len: u64 },
}

impl PatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedPatch {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;
