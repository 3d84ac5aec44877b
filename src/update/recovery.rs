// src/update/recovery.rs

//! Journal-less recovery from on-disk filename suffixes
//!
//! When no in-memory journal survives (crash, external abort), the state
//! of a finished or half-finished update can still be inferred from the
//! `.old` pairs an install leaves behind. These operations walk a
//! directory, pair every `<file>.old` with its current counterpart, and
//! either delete the previous version or swap it back into place.

use super::cleanup::{self, CleanupMode};
use super::OLD_FILE_SUFFIX;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Suffix carried by the displaced `.old` member during a swap
const SWAP_FILE_SUFFIX: &str = ".oldest";

/// A `<file>` / `<file>.old` pair found on disk
#[derive(Debug)]
struct VersionPair {
    current: PathBuf,
    old: PathBuf,
}

/// Outcome of [`unsafe_rollback_update`]: the previous version is live
/// again and the rolled-back files wait under the `.old` suffix
#[derive(Debug)]
pub struct RollbackResult {
    loaded_paths: Vec<PathBuf>,
    exe_path: PathBuf,
}

impl RollbackResult {
    /// Paths of the rolled-back (formerly installed) files
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_paths
    }

    /// Delete the rolled-back files with the chosen cleanup mode
    pub fn delete_loaded_version_files(self, mode: CleanupMode) -> Result<()> {
        cleanup::run(self.loaded_paths, &self.exe_path, mode)
    }
}

/// Delete every `<file>.old` that still has a current counterpart
///
/// Unpaired `.old` files are left alone: without a counterpart there is no
/// evidence they came from an update.
pub fn unsafe_delete_previous_version_files(dir: impl AsRef<Path>) -> Result<()> {
    let pairs = scan_version_pairs(dir.as_ref())?;
    info!(
        "deleting {} previous-version file(s) under {}",
        pairs.len(),
        dir.as_ref().display()
    );
    cleanup::delete_all(&pairs.into_iter().map(|p| p.old).collect::<Vec<_>>())
}

/// Swap every `<file>` / `<file>.old` pair back to the previous version
///
/// Each pair goes through a three-rename dance (`old -> oldest`,
/// `current -> old`, `oldest -> current`) so the operation can be reversed
/// if a rename fails half way. Apply it twice and the directory is back to
/// its original layout.
pub fn unsafe_rollback_update(dir: impl AsRef<Path>) -> Result<RollbackResult> {
    let dir = dir.as_ref();
    let pairs = scan_version_pairs(dir)?;
    info!(
        "rolling back {} file pair(s) under {}",
        pairs.len(),
        dir.display()
    );

    // every completed rename, newest last, so a failure can be unwound
    let mut performed: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut rename = |from: &Path, to: &Path| -> Result<()> {
        fs::rename(from, to).map_err(|e| Error::Install {
            path: from.to_path_buf(),
            reason: format!("rename failed during rollback: {}", e),
        })?;
        performed.push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    };

    let mut swap_error = None;
    'pairs: for pair in &pairs {
        let displaced = swap_path(&pair.current);
        for (from, to) in [
            (&pair.old, &displaced),
            (&pair.current, &pair.old),
            (&displaced, &pair.current),
        ] {
            if let Err(e) = rename(from, to) {
                swap_error = Some(e);
                break 'pairs;
            }
        }
        debug!("restored previous version of {}", pair.current.display());
    }
    drop(rename);

    if let Some(error) = swap_error {
        warn!("rollback interrupted, reversing completed renames");
        for (from, to) in performed.into_iter().rev() {
            fs::rename(&to, &from).map_err(|e| Error::RollbackFailed {
                install_error: Box::new(Error::Install {
                    path: to.clone(),
                    reason: error.to_string(),
                }),
                reason: format!("could not reverse rename of {}: {}", to.display(), e),
            })?;
        }
        return Err(error);
    }

    Ok(RollbackResult {
        loaded_paths: pairs.iter().map(|p| p.old.clone()).collect(),
        exe_path: std::env::current_exe()?,
    })
}

/// Walk a directory and pair `.old` files with their current counterparts
fn scan_version_pairs(dir: &Path) -> Result<Vec<VersionPair>> {
    let mut pairs = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| Error::Install {
            path: dir.to_path_buf(),
            reason: format!("directory walk failed: {}", e),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.to_str() else {
            continue;
        };
        let Some(counterpart) = name.strip_suffix(OLD_FILE_SUFFIX) else {
            continue;
        };
        let counterpart = PathBuf::from(counterpart);
        if counterpart.is_file() {
            pairs.push(VersionPair {
                current: counterpart,
                old: path.to_path_buf(),
            });
        }
    }
    Ok(pairs)
}

/// `<file>.oldest` for a current path
fn swap_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(SWAP_FILE_SUFFIX);
    PathBuf::from(name)
}
