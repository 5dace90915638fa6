use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::binary_diff::ByteDiff;
use crate::digest::{self, Digest};
use crate::error::{PatchError, Result};
use crate::patch_format;

const WRITE_BUF_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct CreateSummary {
    pub original_digest: Digest,
    pub file_size: u64,
    /// Number of differing bytes, one patch line each.
    pub bytes_changed: u64,
    pub bytes_unchanged: u64,
    /// False when the inputs were identical and no patch was produced.
    pub patch_written: bool,
    pub patch_size: u64,
}

/// Create a patch that turns `original` into `modified`.
///
/// The patch is staged in a temporary file next to `output` and only renamed
/// into place when at least one byte differs. Identical inputs leave `output`
/// untouched.
pub fn create_patch(original: &Path, modified: &Path, output: &Path) -> Result<CreateSummary> {
    debug!("hashing {}", original.display());
    let original_digest = digest::hash_file(original)?;

    let mut diff = ByteDiff::open(original, modified)?;

    let dir = staging_dir(output);
    let mut builder = tempfile::Builder::new();
    builder.prefix(".bytepatch-").suffix(".tmp");
    // Default to a normally created file's mode; the umask still applies.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let staged = builder
        .tempfile_in(&dir)
        .map_err(|e| PatchError::io(&dir, e))?;

    let writer = BufWriter::with_capacity(WRITE_BUF_SIZE, staged.as_file());
    let bytes_changed = patch_format::write_patch(writer, output, &original_digest, &mut diff)?;
    let file_size = diff.bytes_compared();

    let mut summary = CreateSummary {
        original_digest,
        file_size,
        bytes_changed,
        bytes_unchanged: file_size - bytes_changed,
        patch_written: false,
        patch_size: 0,
    };

    if bytes_changed == 0 {
        info!(
            "no differences between {} and {}",
            original.display(),
            modified.display()
        );
        return Ok(summary);
    }

    staged
        .as_file()
        .sync_all()
        .map_err(|e| PatchError::io(staged.path(), e))?;
    let persisted = staged
        .persist(output)
        .map_err(|e| PatchError::io(output, e.error))?;
    summary.patch_size = persisted
        .metadata()
        .map_err(|e| PatchError::io(output, e))?
        .len();
    summary.patch_written = true;

    info!(
        "wrote {} ({} edits, {} bytes)",
        output.display(),
        bytes_changed,
        summary.patch_size
    );
    Ok(summary)
}

fn staging_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_staging_dir() {
        assert_eq!(staging_dir(Path::new("out.patch")), PathBuf::from("."));
        assert_eq!(
            staging_dir(Path::new("/tmp/x/out.patch")),
            PathBuf::from("/tmp/x")
        );
    }

    #[test]
    fn test_create_single_difference() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        let new = dir.path().join("new.bin");
        let out = dir.path().join("out.patch");
        fs::write(&old, b"ABCD").unwrap();
        fs::write(&new, b"AZCD").unwrap();

        let summary = create_patch(&old, &new, &out).unwrap();
        assert!(summary.patch_written);
        assert_eq!(summary.bytes_changed, 1);
        assert_eq!(summary.bytes_unchanged, 3);
        assert_eq!(summary.file_size, 4);
        assert_eq!(summary.patch_size, fs::metadata(&out).unwrap().len());

        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "PATCH FILE");
        assert_eq!(
            lines[1],
            format!("Original File Hash: {}", digest::hash_file(&old).unwrap())
        );
        assert_eq!(lines[3], "Offset: 1, Original Byte: 66, Modified Byte: 90");
    }

    #[cfg(unix)]
    #[test]
    fn test_patch_mode_matches_plain_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        let new = dir.path().join("new.bin");
        let out = dir.path().join("out.patch");
        fs::write(&old, b"ABCD").unwrap();
        fs::write(&new, b"AZCD").unwrap();

        create_patch(&old, &new, &out).unwrap();
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&out), mode(&old));
    }

    #[test]
    fn test_identical_inputs_leave_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        let out = dir.path().join("out.patch");
        fs::write(&old, b"unchanged").unwrap();

        let summary = create_patch(&old, &old, &out).unwrap();
        assert!(!summary.patch_written);
        assert_eq!(summary.bytes_changed, 0);
        assert!(!out.exists());
        // Staging file is cleaned up as well.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_length_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        let new = dir.path().join("new.bin");
        let out = dir.path().join("out.patch");
        fs::write(&old, b"ABCD").unwrap();
        fs::write(&new, b"ABCDE").unwrap();

        let err = create_patch(&old, &new, &out).unwrap_err();
        assert!(matches!(err, PatchError::LengthMismatch { offset: 4, .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.bin");
        fs::write(&old, b"ABCD").unwrap();

        let err = create_patch(&old, &dir.path().join("nope.bin"), &dir.path().join("o.patch"))
            .unwrap_err();
        assert!(matches!(err, PatchError::Io { .. }));
    }
}
