//! Byte-substitution patches for single binary files.
//!
//! A patch records every offset where two equal-length files differ,
//! together with the BLAKE3 digest of the original. Applying it first checks
//! that the target hashes to that digest, then overwrites the recorded bytes.
//!
//! ```no_run
//! use std::path::Path;
//! use bytepatch::apply::{apply_patch, ApplyOptions};
//! use bytepatch::create::create_patch;
//!
//! let summary = create_patch(
//!     Path::new("save.orig"),
//!     Path::new("save.edited"),
//!     Path::new("save.patch"),
//! )?;
//! if summary.patch_written {
//!     apply_patch(Path::new("save.dat"), Path::new("save.patch"), ApplyOptions::default())?;
//! }
//! # Ok::<(), bytepatch::PatchError>(())
//! ```

pub mod apply;
pub mod binary_diff;
pub mod binary_patch;
pub mod create;
pub mod digest;
pub mod error;
pub mod patch_format;

pub use error::{PatchError, Result};
