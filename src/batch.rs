//! Batch round-trip verification over a directory tree.
//!
//! Every `*.mcb` file found under the root is loaded, saved, reloaded and
//! saved again.  A file passes when the reloaded model matches the original
//! one and both saves produce identical bytes.  Whether the first save also
//! reproduces the input byte for byte is reported separately, since files
//! not already in canonical layout legitimately differ.
//!
//! Files are independent, so with the `parallel` feature they are checked
//! concurrently on the Rayon pool; each worker owns its own [`McbFile`].

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::archive::McbFile;
use crate::error::Result;

pub const MCB_EXTENSION: &str = "mcb";

/// Result of checking one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub texts:          usize,
    /// Reloaded texts, extras and filenames equal the originals.
    pub model_equal:    bool,
    /// Saving twice gave identical bytes.
    pub idempotent:     bool,
    /// The first save reproduced the input exactly.
    pub byte_identical: bool,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.model_equal && self.idempotent
    }
}

pub fn verify_bytes(data: &[u8]) -> Result<Verification> {
    let mut original = McbFile::from_bytes(data)?;
    let first = original.to_bytes()?;
    let mut reloaded = McbFile::from_bytes(&first)?;
    let second = reloaded.to_bytes()?;

    let model_equal = reloaded.texts() == original.texts()
        && reloaded.extras() == original.extras()
        && reloaded.files() == original.files()
        && reloaded.header().outer == original.header().outer
        && reloaded.header().inner == original.header().inner;

    Ok(Verification {
        texts:          original.len(),
        model_equal,
        idempotent:     first == second,
        byte_identical: first == data,
    })
}

pub fn verify_file(path: &Path) -> Result<Verification> {
    let data = std::fs::read(path)?;
    verify_bytes(&data)
}

/// All `*.mcb` files under `root` (case-insensitive extension), sorted.
pub fn find_mcb_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(%err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| x.eq_ignore_ascii_case(MCB_EXTENSION))
        })
        .collect();
    files.sort();
    files
}

/// Verify every MCB file under `root`, in path order.
pub fn verify_dir(root: &Path) -> Vec<(PathBuf, Result<Verification>)> {
    let files = find_mcb_files(root);
    info!(count = files.len(), root = %root.display(), "verifying");
    verify_paths(files)
}

#[cfg(feature = "parallel")]
fn verify_paths(files: Vec<PathBuf>) -> Vec<(PathBuf, Result<Verification>)> {
    use rayon::prelude::*;
    files
        .into_par_iter()
        .map(|p| {
            let r = verify_file(&p);
            (p, r)
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn verify_paths(files: Vec<PathBuf>) -> Vec<(PathBuf, Result<Verification>)> {
    files
        .into_iter()
        .map(|p| {
            let r = verify_file(&p);
            (p, r)
        })
        .collect()
}
