use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{PatchError, Result};

pub const READ_BUF_SIZE: usize = 64 * 1024;

/// One position where the original and modified inputs disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffRecord {
    pub offset: u64,
    pub original: u8,
    pub modified: u8,
}

impl fmt::Display for DiffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Offset: {}, Original Byte: {}, Modified Byte: {}",
            self.offset, self.original, self.modified
        )
    }
}

struct Input<R> {
    reader: R,
    path: PathBuf,
}

impl<R: BufRead> Input<R> {
    fn fill(&mut self) -> Result<&[u8]> {
        let path = &self.path;
        self.reader.fill_buf().map_err(|e| PatchError::io(path, e))
    }
}

/// Lazy, lockstep comparison of two equal-length byte streams.
///
/// Yields one record per differing offset, in strictly increasing offset
/// order. Reads are batched through `fill_buf`, but the emitted records are
/// the same as a byte-at-a-time walk. The iterator stops for good after the
/// first error.
pub struct ByteDiff<R> {
    original: Input<R>,
    modified: Input<R>,
    offset: u64,
    finished: bool,
}

impl ByteDiff<BufReader<File>> {
    /// Open both files and check that they have the same length.
    pub fn open(original: &Path, modified: &Path) -> Result<Self> {
        let original_file = File::open(original).map_err(|e| PatchError::io(original, e))?;
        let modified_file = File::open(modified).map_err(|e| PatchError::io(modified, e))?;

        let original_len = original_file
            .metadata()
            .map_err(|e| PatchError::io(original, e))?
            .len();
        let modified_len = modified_file
            .metadata()
            .map_err(|e| PatchError::io(modified, e))?
            .len();
        if original_len != modified_len {
            let shorter = if original_len < modified_len {
                original
            } else {
                modified
            };
            return Err(PatchError::LengthMismatch {
                offset: original_len.min(modified_len),
                shorter: shorter.to_path_buf(),
            });
        }

        Ok(Self::from_readers(
            BufReader::with_capacity(READ_BUF_SIZE, original_file),
            original,
            BufReader::with_capacity(READ_BUF_SIZE, modified_file),
            modified,
        ))
    }
}

impl<R: BufRead> ByteDiff<R> {
    /// Compare two arbitrary buffered streams. The paths only label errors.
    pub fn from_readers(
        original: R,
        original_path: impl Into<PathBuf>,
        modified: R,
        modified_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            original: Input {
                reader: original,
                path: original_path.into(),
            },
            modified: Input {
                reader: modified,
                path: modified_path.into(),
            },
            offset: 0,
            finished: false,
        }
    }

    /// Number of bytes compared so far.
    pub fn bytes_compared(&self) -> u64 {
        self.offset
    }

    fn next_record(&mut self) -> Result<Option<DiffRecord>> {
        loop {
            let a = self.original.fill()?;
            let b = self.modified.fill()?;

            match (a.is_empty(), b.is_empty()) {
                (true, true) => return Ok(None),
                (true, false) => {
                    return Err(PatchError::LengthMismatch {
                        offset: self.offset,
                        shorter: self.original.path.clone(),
                    });
                }
                (false, true) => {
                    return Err(PatchError::LengthMismatch {
                        offset: self.offset,
                        shorter: self.modified.path.clone(),
                    });
                }
                (false, false) => {}
            }

            let n = a.len().min(b.len());
            let hit = a[..n].iter().zip(&b[..n]).position(|(x, y)| x != y);
            let (consumed, record) = match hit {
                Some(i) => (
                    i + 1,
                    Some(DiffRecord {
                        offset: self.offset + i as u64,
                        original: a[i],
                        modified: b[i],
                    }),
                ),
                None => (n, None),
            };

            self.original.reader.consume(consumed);
            self.modified.reader.consume(consumed);
            self.offset += consumed as u64;

            if record.is_some() {
                return Ok(record);
            }
        }
    }
}

impl<R: BufRead> Iterator for ByteDiff<R> {
    type Item = Result<DiffRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
