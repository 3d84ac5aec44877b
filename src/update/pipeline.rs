// src/update/pipeline.rs

//! Asset acquisition pipeline
//!
//! Streams a chosen release's assets into a staging directory. Plain
//! assets are staged directly; archive assets are downloaded once and
//! expanded entry by entry. The caller's callback decides destination
//! name, sub-directory, mode, and whether a file is taken at all. Every
//! staged file gets a journal entry for the installer.

use super::archive::{self, ArchiveKind};
use super::install::UpdateFile;
use super::ReplacementFile;
use crate::config::ApplicationConfig;
use crate::error::{Error, Result};
use crate::source::Release;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Stage every surviving asset of a release into `dest`
///
/// Fails with [`Error::NothingToInstall`] when the callback skipped
/// everything; an update with zero files is always a caller mistake.
pub(crate) fn stage_release<F>(
    cfg: &ApplicationConfig,
    release: &Release,
    dest: &Path,
    choose: &mut F,
) -> Result<Vec<UpdateFile>>
where
    F: FnMut(&str) -> Result<ReplacementFile>,
{
    let mut journal = Vec::new();

    for asset in release.assets() {
        match ArchiveKind::detect(&asset.filename) {
            None => {
                let replacement = choose(&asset.filename)?;
                if replacement.skip {
                    debug!("skipping asset {}", asset.filename);
                    continue;
                }
                let mut reader = release.open_asset(cfg, asset)?;
                let staged = stage_stream(&mut reader, dest, &asset.filename)?;
                journal.push(UpdateFile::staged(replacement, staged));
            }
            Some(kind) => {
                info!("expanding archive asset {}", asset.filename);
                let mut reader = release.open_asset(cfg, asset)?;
                let mut downloaded = NamedTempFile::new_in(dest)?;
                io::copy(&mut reader, downloaded.as_file_mut()).map_err(|e| {
                    Error::Acquisition {
                        filename: asset.filename.clone(),
                        reason: e.to_string(),
                    }
                })?;
                drop(reader);
                archive::unpack_into(
                    kind,
                    &asset.filename,
                    downloaded.path(),
                    dest,
                    choose,
                    &mut journal,
                )?;
                // the archive itself is dropped with the temp file
            }
        }
    }

    if journal.is_empty() {
        return Err(Error::NothingToInstall);
    }

    info!("staged {} file(s)", journal.len());
    Ok(journal)
}

/// Stage a byte stream as a uniquely named file inside `dest`
pub(crate) fn stage_stream<R: Read>(
    reader: &mut R,
    dest: &Path,
    display_name: &str,
) -> Result<PathBuf> {
    let mut tmp = NamedTempFile::new_in(dest)?;
    let bytes = io::copy(reader, tmp.as_file_mut()).map_err(|e| Error::Acquisition {
        filename: display_name.to_string(),
        reason: e.to_string(),
    })?;
    let (_, path) = tmp.keep().map_err(|e| Error::Io(e.error))?;
    debug!("staged {} ({} bytes)", display_name, bytes);
    Ok(path)
}
