// src/update/mod.rs

//! Update orchestration
//!
//! [`UpdateConfig`] glues the pieces together: check configured sources
//! for a newer release, stage its assets into a per-run temp directory,
//! install them over the application directory with the rename protocol,
//! and hand back an [`UpdateResult`] for the deferred cleanup of the
//! replaced files.

mod archive;
mod cleanup;
mod install;
mod pipeline;
mod recovery;

pub use cleanup::CleanupMode;
pub use install::UpdateFile;
pub use recovery::{
    unsafe_delete_previous_version_files, unsafe_rollback_update, RollbackResult,
};

use crate::check::{self, CheckMode};
use crate::config::ApplicationConfig;
use crate::error::{Error, Result};
use crate::source::{Release, SourceCheckStatus, UpdateSource};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Suffix carried by a replaced file until deferred cleanup removes it
pub const OLD_FILE_SUFFIX: &str = ".old";

/// Requested mode bits for an installed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementMode {
    /// Explicit permission bits
    Bits(u32),
    /// Keep the replaced file's mode, or `0o644` when nothing is replaced
    #[default]
    UseDefaultOrExisting,
}

/// Caller's decision for one incoming file
///
/// Produced by the per-file callback of [`UpdateConfig::do_update`]: where
/// the file goes, under which name, with which mode, or whether it is
/// taken at all. For archive entries the entry's directory prefix is
/// appended to `sub_dir`, preserving nested layouts.
#[derive(Debug, Clone)]
pub struct ReplacementFile {
    /// Destination filename, a single path component
    pub file_name: String,
    /// Destination directory relative to the application directory
    pub sub_dir: PathBuf,
    pub mode: ReplacementMode,
    /// Leave this file out of the update
    pub skip: bool,
}

impl ReplacementFile {
    /// Take the file under the given name in the application directory
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            sub_dir: PathBuf::new(),
            mode: ReplacementMode::default(),
            skip: false,
        }
    }

    /// Leave the file out
    pub fn skip() -> Self {
        Self {
            file_name: String::new(),
            sub_dir: PathBuf::new(),
            mode: ReplacementMode::default(),
            skip: true,
        }
    }

    /// Place the file in a sub-directory of the application directory
    pub fn in_dir(mut self, sub_dir: impl Into<PathBuf>) -> Self {
        self.sub_dir = sub_dir.into();
        self
    }

    /// Install with explicit permission bits
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = ReplacementMode::Bits(mode);
        self
    }
}

/// A fully configured updater: application identity plus release sources
///
/// Source order is priority order for [`check_first_ok`](Self::check_first_ok).
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub app_config: ApplicationConfig,
    pub sources: Vec<UpdateSource>,
}

impl UpdateConfig {
    pub fn new(app_config: ApplicationConfig, sources: Vec<UpdateSource>) -> Self {
        Self {
            app_config,
            sources,
        }
    }

    /// Query every source and pick the globally best eligible release
    pub fn check_all(&self) -> (Option<Release>, SourceCheckStatus) {
        check::run_check(&self.app_config, &self.sources, CheckMode::All)
    }

    /// Query sources in priority order; the first one that answers without
    /// a critical failure is authoritative, even with zero candidates
    pub fn check_first_ok(&self) -> (Option<Release>, SourceCheckStatus) {
        check::run_check(&self.app_config, &self.sources, CheckMode::FirstOk)
    }

    /// Download and install a release over the application directory
    ///
    /// `app_dir = None` targets the running executable's directory. The
    /// `choose` callback is invoked once per incoming file (archive
    /// entries included); `before_install` runs after staging finished and
    /// before the first rename, as a last chance to stop the application's
    /// own activity. On any install failure the directory is rolled back
    /// and the install error returned.
    pub fn do_update<F, B>(
        &self,
        release: &Release,
        app_dir: Option<&Path>,
        mut choose: F,
        before_install: B,
    ) -> Result<UpdateResult>
    where
        F: FnMut(&str) -> Result<ReplacementFile>,
        B: FnOnce() -> Result<()>,
    {
        let exe_path = std::env::current_exe()?;
        let app_dir = match app_dir {
            Some(dir) => dir.to_path_buf(),
            None => exe_path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| Error::Install {
                    path: exe_path.clone(),
                    reason: "executable has no parent directory".to_string(),
                })?,
        };

        info!(
            "updating {} -> {} in {}",
            self.app_config.current_version(),
            release.tag(),
            app_dir.display()
        );

        // staged inside the application directory so the final renames
        // never cross a filesystem boundary; removed on every exit path
        let staging = tempfile::Builder::new()
            .prefix(".renew-staging-")
            .tempdir_in(&app_dir)?;

        let mut files =
            pipeline::stage_release(&self.app_config, release, staging.path(), &mut choose)?;
        before_install()?;
        install::install_files(&app_dir, &mut files)?;

        info!("installed {} file(s)", files.len());
        Ok(UpdateResult {
            files,
            app_dir,
            exe_path,
        })
    }

    /// Fetch every filtered asset of a release into a directory, keeping
    /// original filenames and skipping the install machinery entirely
    pub fn load_release_files(&self, release: &Release, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        for asset in release.assets() {
            let dest = install::safe_join(dir, Path::new(""), &asset.filename)?;
            let mut reader = release.open_asset(&self.app_config, asset)?;
            let mut tmp = NamedTempFile::new_in(dir)?;
            io::copy(&mut reader, tmp.as_file_mut()).map_err(|e| Error::Acquisition {
                filename: asset.filename.clone(),
                reason: e.to_string(),
            })?;
            tmp.persist(&dest).map_err(|e| Error::Io(e.error))?;
            info!("loaded {}", dest.display());
        }
        Ok(())
    }
}

/// Outcome of a successful install, ready for deferred cleanup
#[derive(Debug)]
pub struct UpdateResult {
    files: Vec<UpdateFile>,
    app_dir: PathBuf,
    exe_path: PathBuf,
}

impl UpdateResult {
    /// Journal of everything the installer did
    pub fn files(&self) -> &[UpdateFile] {
        &self.files
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Remove the replaced `.old` files
    ///
    /// `PureDelete` fails on hosts where the running executable is among
    /// them and cannot be unlinked; pick `KillProcess` or `RerunExec`
    /// there instead.
    pub fn delete_previous_version_files(self, mode: CleanupMode) -> Result<()> {
        let old_paths: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|f| f.prev_renamed)
            .filter_map(|f| f.dest_path.as_deref().map(install::old_path))
            .collect();
        cleanup::run(old_paths, &self.exe_path, mode)
    }
}
