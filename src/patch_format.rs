//! Text patch format.
//!
//! ```text
//! PATCH FILE
//! Original File Hash: <64 hex chars, BLAKE3>
//! --------------------------------------------------
//! Offset: <u64>, Original Byte: <0-255>, Modified Byte: <0-255>
//! ...
//! ```
//!
//! Byte values are unsigned decimal. The original byte is kept for people
//! reading the patch; only the header digest guards application.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::binary_diff::DiffRecord;
use crate::digest::Digest;
use crate::error::{PatchError, Result};

pub const MAGIC: &str = "PATCH FILE";
pub const HASH_LABEL: &str = "Original File Hash";
pub const SEPARATOR: &str = "--------------------------------------------------";

const OFFSET_LABEL: &str = "Offset";
const ORIGINAL_LABEL: &str = "Original Byte";
const MODIFIED_LABEL: &str = "Modified Byte";

/// A single byte overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub offset: u64,
    pub byte: u8,
}

impl From<DiffRecord> for Edit {
    fn from(r: DiffRecord) -> Self {
        Self {
            offset: r.offset,
            byte: r.modified,
        }
    }
}

/// A parsed patch: the digest of the file it was made against plus its edits
/// in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDocument {
    pub base_digest: Digest,
    pub edits: Vec<Edit>,
}

/// Write the header followed by one line per record.
///
/// Returns the number of records written. `dest` only labels I/O errors.
pub fn write_patch<W, I>(mut out: W, dest: &Path, digest: &Digest, records: I) -> Result<u64>
where
    W: Write,
    I: IntoIterator<Item = Result<DiffRecord>>,
{
    let io_err = |e: std::io::Error| PatchError::io(dest, e);

    writeln!(out, "{MAGIC}").map_err(io_err)?;
    writeln!(out, "{HASH_LABEL}: {digest}").map_err(io_err)?;
    writeln!(out, "{SEPARATOR}").map_err(io_err)?;

    let mut count = 0u64;
    for record in records {
        writeln!(out, "{}", record?).map_err(io_err)?;
        count += 1;
    }
    out.flush().map_err(io_err)?;
    Ok(count)
}

/// Open and parse a patch file.
pub fn read_patch(path: &Path) -> Result<PatchDocument> {
    let file = File::open(path).map_err(|e| PatchError::io(path, e))?;
    parse_patch(BufReader::new(file), path)
}

/// Parse patch text. `origin` only labels I/O errors.
pub fn parse_patch<R: BufRead>(input: R, origin: &Path) -> Result<PatchDocument> {
    let mut lines = input.split(b'\n').enumerate().map(|(i, line)| -> Result<(usize, String)> {
        let number = i + 1;
        let bytes = line.map_err(|e| PatchError::io(origin, e))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| PatchError::malformed(number, "line is not valid UTF-8"))?;
        Ok((number, text.trim_end_matches('\r').to_string()))
    });

    let mut header = |expected_line: usize, what: &str| -> Result<String> {
        match lines.next().transpose()? {
            Some((_, text)) => Ok(text),
            None => Err(PatchError::malformed(
                expected_line,
                format!("missing {what} line"),
            )),
        }
    };

    let magic = header(1, "magic")?;
    if magic.trim() != MAGIC {
        return Err(PatchError::malformed(
            1,
            format!("expected `{MAGIC}`, found `{magic}`"),
        ));
    }

    let hash_line = header(2, "digest")?;
    let base_digest = parse_digest_line(&hash_line)?;

    let separator = header(3, "separator")?;
    if separator.trim() != SEPARATOR {
        return Err(PatchError::malformed(3, "expected separator line"));
    }

    let mut edits = Vec::new();
    let mut seen: HashMap<u64, usize> = HashMap::new();
    for line in lines {
        let (number, text) = line?;
        if text.trim().is_empty() {
            continue;
        }
        let edit = parse_edit_line(number, &text)?;
        if let Some(first) = seen.insert(edit.offset, number) {
            return Err(PatchError::malformed(
                number,
                format!(
                    "offset {} already patched at line {first}",
                    edit.offset
                ),
            ));
        }
        edits.push(edit);
    }

    if edits.is_empty() {
        return Err(PatchError::malformed(4, "patch contains no edits"));
    }

    Ok(PatchDocument { base_digest, edits })
}

fn parse_digest_line(line: &str) -> Result<Digest> {
    let (label, value) = line
        .split_once(':')
        .ok_or_else(|| PatchError::malformed(2, "expected `Original File Hash: <hex>`"))?;
    if label.trim() != HASH_LABEL {
        return Err(PatchError::malformed(
            2,
            format!("expected `{HASH_LABEL}`, found `{}`", label.trim()),
        ));
    }
    let value = value.trim();
    Digest::from_hex(value)
        .ok_or_else(|| PatchError::malformed(2, format!("invalid digest `{value}`")))
}

fn parse_edit_line(number: usize, line: &str) -> Result<Edit> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 3 {
        return Err(PatchError::malformed(
            number,
            format!("expected 3 comma-separated fields, found {}", fields.len()),
        ));
    }

    let offset = field(number, fields[0], OFFSET_LABEL)?;
    let offset: u64 = offset
        .parse()
        .map_err(|_| PatchError::malformed(number, format!("invalid offset `{offset}`")))?;

    // The original byte is validated but not used for application.
    byte_field(number, fields[1], ORIGINAL_LABEL)?;
    let byte = byte_field(number, fields[2], MODIFIED_LABEL)?;

    Ok(Edit { offset, byte })
}

fn field<'a>(number: usize, text: &'a str, label: &str) -> Result<&'a str> {
    match text.split_once(':') {
        Some((l, value)) if l.trim() == label => Ok(value.trim()),
        _ => Err(PatchError::malformed(
            number,
            format!("expected `{label}: <value>`, found `{}`", text.trim()),
        )),
    }
}

fn byte_field(number: usize, text: &str, label: &str) -> Result<u8> {
    let value = field(number, text, label)?;
    value.parse::<u8>().map_err(|_| {
        PatchError::malformed(
            number,
            format!("{label} `{value}` is not a byte value in 0-255"),
        )
    })
}
