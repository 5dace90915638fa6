use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::binary_patch;
use crate::digest::{self, Digest};
use crate::error::{PatchError, Result};
use crate::patch_format::{self, Edit, PatchDocument};

/// How edits reach the target file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Seek and overwrite bytes of the target directly.
    #[default]
    InPlace,
    /// Patch a copy next to the target, then rename it over the target.
    Atomic,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub mode: WriteMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplySummary {
    pub base_digest: Digest,
    pub bytes_applied: u64,
    pub mode: WriteMode,
}

/// Read `patch` and apply it to `target`.
///
/// The patch is fully parsed before the target is opened for writing, so a
/// malformed patch never touches the target.
pub fn apply_patch(target: &Path, patch: &Path, opts: ApplyOptions) -> Result<ApplySummary> {
    let document = patch_format::read_patch(patch)?;
    debug!(
        "{} holds {} edits for base {}",
        patch.display(),
        document.edits.len(),
        document.base_digest
    );
    apply_document(target, &document, opts)
}

/// Apply an already parsed patch to `target`.
///
/// An exclusive advisory lock on the target is held from the digest check
/// until the last write is synced. Nothing is written unless the target's
/// digest equals the patch's base digest and every edit lies inside the file.
pub fn apply_document(
    target: &Path,
    document: &PatchDocument,
    opts: ApplyOptions,
) -> Result<ApplySummary> {
    let io_err = |e: io::Error| PatchError::io(target, e);

    let mut file = match OpenOptions::new().read(true).write(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            // A read-only target may still be the wrong base; report that first.
            check_digest(target, document, digest::hash_file(target)?)?;
            return Err(io_err(e));
        }
        Err(e) => return Err(io_err(e)),
    };
    file.lock().map_err(io_err)?;

    let actual = digest::hash_reader(&mut file).map_err(io_err)?;
    check_digest(target, document, actual)?;

    let len = file.metadata().map_err(io_err)?.len();
    if let Some(edit) = document.edits.iter().find(|e| e.offset >= len) {
        return Err(PatchError::EditOutOfRange {
            offset: edit.offset,
            len,
        });
    }

    let bytes_applied = match opts.mode {
        WriteMode::InPlace => {
            let n = binary_patch::apply_edits(&mut file, &document.edits).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
            n
        }
        WriteMode::Atomic => apply_to_copy(target, &mut file, &document.edits)?,
    };

    info!(
        "applied {} edits to {} ({:?})",
        bytes_applied,
        target.display(),
        opts.mode
    );
    Ok(ApplySummary {
        base_digest: actual,
        bytes_applied,
        mode: opts.mode,
    })
}

fn check_digest(target: &Path, document: &PatchDocument, actual: Digest) -> Result<()> {
    if actual == document.base_digest {
        return Ok(());
    }
    warn!(
        "refusing to patch {}: digest {} does not match {}",
        target.display(),
        actual,
        document.base_digest
    );
    Err(PatchError::DigestMismatch {
        path: target.to_path_buf(),
        expected: document.base_digest,
        actual,
    })
}

fn apply_to_copy(target: &Path, locked: &mut File, edits: &[Edit]) -> Result<u64> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".bytepatch-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| PatchError::io(&dir, e))?;
    let staged_err = |path: &Path, e: io::Error| PatchError::io(path, e);

    locked
        .seek(SeekFrom::Start(0))
        .map_err(|e| PatchError::io(target, e))?;
    io::copy(locked, staged.as_file_mut()).map_err(|e| staged_err(staged.path(), e))?;
    let perms = locked
        .metadata()
        .map_err(|e| PatchError::io(target, e))?
        .permissions();
    staged
        .as_file()
        .set_permissions(perms)
        .map_err(|e| staged_err(staged.path(), e))?;

    let n = binary_patch::apply_edits(staged.as_file_mut(), edits)
        .map_err(|e| staged_err(staged.path(), e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| staged_err(staged.path(), e))?;

    debug!("renaming {} over {}", staged.path().display(), target.display());
    staged
        .persist(target)
        .map_err(|e| PatchError::io(target, e.error))?;
    Ok(n)
}
