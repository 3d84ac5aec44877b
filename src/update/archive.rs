// src/update/archive.rs

//! Archive expansion for downloaded release assets
//!
//! Two container formats are recognized by extension: zip and gzipped tar.
//! Extraction walks file entries only, asks the caller's callback what to
//! do with each base filename, and stages survivors next to the plain
//! assets. Entry paths are kept: the directory prefix of an entry becomes
//! part of its destination sub-directory.

use super::install::UpdateFile;
use super::pipeline::stage_stream;
use super::ReplacementFile;
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Recognized archive container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Detect the archive format from a filename, `None` for plain assets
    pub(crate) fn detect(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tgz") || lower.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Expand a downloaded archive into staged files
pub(crate) fn unpack_into<F>(
    kind: ArchiveKind,
    archive_name: &str,
    archive_path: &Path,
    dest: &Path,
    choose: &mut F,
    journal: &mut Vec<UpdateFile>,
) -> Result<()>
where
    F: FnMut(&str) -> Result<ReplacementFile>,
{
    match kind {
        ArchiveKind::Zip => unpack_zip(archive_name, archive_path, dest, choose, journal),
        ArchiveKind::TarGz => unpack_tar_gz(archive_name, archive_path, dest, choose, journal),
    }
}

fn unpack_zip<F>(
    archive_name: &str,
    archive_path: &Path,
    dest: &Path,
    choose: &mut F,
    journal: &mut Vec<UpdateFile>,
) -> Result<()>
where
    F: FnMut(&str) -> Result<ReplacementFile>,
{
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Archive {
        filename: archive_name.to_string(),
        reason: e.to_string(),
    })?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| Error::Archive {
            filename: archive_name.to_string(),
            reason: e.to_string(),
        })?;
        if entry.is_dir() {
            continue;
        }
        let Some(entry_path) = entry.enclosed_name() else {
            warn!(
                "skipping zip entry with unsafe path '{}' in {}",
                entry.name(),
                archive_name
            );
            continue;
        };
        let Some((base, prefix)) = split_entry_path(&entry_path) else {
            continue;
        };

        let mut replacement = choose(&base)?;
        if replacement.skip {
            debug!("skipping archive entry {}", base);
            continue;
        }
        replacement.sub_dir = replacement.sub_dir.join(prefix);

        let staged = stage_stream(&mut entry, dest, &base)?;
        journal.push(UpdateFile::staged(replacement, staged));
    }

    Ok(())
}

fn unpack_tar_gz<F>(
    archive_name: &str,
    archive_path: &Path,
    dest: &Path,
    choose: &mut F,
    journal: &mut Vec<UpdateFile>,
) -> Result<()>
where
    F: FnMut(&str) -> Result<ReplacementFile>,
{
    let file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let entries = archive.entries().map_err(|e| Error::Archive {
        filename: archive_name.to_string(),
        reason: e.to_string(),
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| Error::Archive {
            filename: archive_name.to_string(),
            reason: e.to_string(),
        })?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let entry_path = entry
            .path()
            .map_err(|e| Error::Archive {
                filename: archive_name.to_string(),
                reason: e.to_string(),
            })?
            .into_owned();
        let Some((base, prefix)) = split_entry_path(&entry_path) else {
            continue;
        };

        let mut replacement = choose(&base)?;
        if replacement.skip {
            debug!("skipping archive entry {}", base);
            continue;
        }
        replacement.sub_dir = replacement.sub_dir.join(prefix);

        let staged = stage_stream(&mut entry, dest, &base)?;
        journal.push(UpdateFile::staged(replacement, staged));
    }

    Ok(())
}

/// Split an archive entry path into base filename and directory prefix
///
/// Only plain path components survive into the prefix; entries whose name
/// cannot be represented (or that point upward) yield `None` and are
/// skipped by the callers.
fn split_entry_path(path: &Path) -> Option<(String, PathBuf)> {
    let base = path.file_name()?.to_str()?.to_string();
    let mut prefix = PathBuf::new();
    if let Some(parent) = path.parent() {
        for component in parent.components() {
            match component {
                Component::Normal(part) => prefix.push(part),
                Component::CurDir => {}
                _ => {
                    warn!("skipping archive entry with unsafe path '{}'", path.display());
                    return None;
                }
            }
        }
    }
    Some((base, prefix))
}
