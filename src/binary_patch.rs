use std::io::{self, Seek, SeekFrom, Write};

use crate::patch_format::Edit;

/// Overwrite bytes of `target` in place, one seek per run of consecutive
/// offsets. Returns the number of edits written.
///
/// Edits are written in the order given; an offset repeated later in the list
/// overwrites the earlier value.
pub fn apply_edits<F: Write + Seek>(target: &mut F, edits: &[Edit]) -> io::Result<u64> {
    let mut run: Vec<u8> = Vec::new();
    let mut run_start = 0u64;

    for edit in edits {
        if !run.is_empty() && edit.offset == run_start + run.len() as u64 {
            run.push(edit.byte);
            continue;
        }
        flush_run(target, run_start, &run)?;
        run.clear();
        run_start = edit.offset;
        run.push(edit.byte);
    }
    flush_run(target, run_start, &run)?;

    Ok(edits.len() as u64)
}

fn flush_run<F: Write + Seek>(target: &mut F, offset: u64, bytes: &[u8]) -> io::Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    target.seek(SeekFrom::Start(offset))?;
    target.write_all(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn edit(offset: u64, byte: u8) -> Edit {
        Edit { offset, byte }
    }

    #[test]
    fn test_apply_single_edit() {
        let mut file = Cursor::new(b"ABCD".to_vec());
        let n = apply_edits(&mut file, &[edit(1, b'Z')]).unwrap();
        assert_eq!(n, 1);
        assert_eq!(file.into_inner(), b"AZCD");
    }

    #[test]
    fn test_apply_runs_and_gaps() {
        let mut file = Cursor::new(b"0123456789".to_vec());
        let edits = [
            edit(0, b'a'),
            edit(1, b'b'),
            edit(2, b'c'),
            edit(5, b'x'),
            edit(9, b'z'),
            edit(8, b'y'),
        ];
        let n = apply_edits(&mut file, &edits).unwrap();
        assert_eq!(n, 6);
        assert_eq!(file.into_inner(), b"abc34x67yz");
    }

    #[test]
    fn test_apply_empty_is_noop() {
        let mut file = Cursor::new(b"keep".to_vec());
        assert_eq!(apply_edits(&mut file, &[]).unwrap(), 0);
        assert_eq!(file.into_inner(), b"keep");
    }

    #[test]
    fn test_length_never_changes_for_in_range_edits() {
        let mut file = Cursor::new(vec![0u8; 16]);
        let edits: Vec<Edit> = (0..16).map(|i| edit(i, 0xFF)).collect();
        apply_edits(&mut file, &edits).unwrap();
        assert_eq!(file.into_inner(), vec![0xFF; 16]);
    }
}
