// src/update/install.rs

//! Rename-based install engine
//!
//! Applies staged files to the live application directory: the previous
//! file is renamed aside with the `.old` suffix, the staged replacement is
//! renamed into place, then mode and ownership are restored. Every step is
//! recorded on the in-memory journal entry so a failure anywhere rolls the
//! directory back to exactly where it started.

use super::{ReplacementFile, ReplacementMode, OLD_FILE_SUFFIX};
use crate::config::DEFAULT_FILE_MODE;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Per-file journal entry, recorded as the installer advances
///
/// Created by the acquisition pipeline pointing at a staged temp file;
/// the install procedure fills in what it did so rollback can reverse it.
#[derive(Debug)]
pub struct UpdateFile {
    pub(crate) replacement: ReplacementFile,
    pub(crate) staged_path: PathBuf,
    pub(crate) dest_path: Option<PathBuf>,
    pub(crate) prev_mode: Option<u32>,
    pub(crate) prev_owner: Option<u32>,
    pub(crate) prev_group: Option<u32>,
    pub(crate) prev_renamed: bool,
    pub(crate) moved_into_place: bool,
}

impl UpdateFile {
    pub(crate) fn staged(replacement: ReplacementFile, staged_path: PathBuf) -> Self {
        Self {
            replacement,
            staged_path,
            dest_path: None,
            prev_mode: None,
            prev_owner: None,
            prev_group: None,
            prev_renamed: false,
            moved_into_place: false,
        }
    }

    pub fn replacement(&self) -> &ReplacementFile {
        &self.replacement
    }

    /// Whether the previous file was renamed aside with the `.old` suffix
    pub fn previous_file_renamed(&self) -> bool {
        self.prev_renamed
    }

    /// Whether the staged replacement now sits at the destination path
    pub fn moved_into_place(&self) -> bool {
        self.moved_into_place
    }
}

/// `<path>.old` for a destination path
pub(crate) fn old_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(OLD_FILE_SUFFIX);
    PathBuf::from(name)
}

/// Join a destination under the application directory, refusing escapes
///
/// The sub-directory may only contain plain components and the filename
/// must be a single plain component; anything else (absolute paths, `..`,
/// separators inside the name) is rejected before a rename can happen.
pub(crate) fn safe_join(base: &Path, sub_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let mut target = base.to_path_buf();
    for component in sub_dir.components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir => {}
            _ => return Err(Error::PathEscape(sub_dir.join(file_name))),
        }
    }

    let name_path = Path::new(file_name);
    let mut parts = name_path.components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(part)), None) => target.push(part),
        _ => return Err(Error::PathEscape(PathBuf::from(file_name))),
    }

    Ok(target)
}

/// Apply every journal entry to the application directory
///
/// On any failure the already-processed entries are rolled back; the
/// original install error is returned when rollback succeeds, and
/// [`Error::RollbackFailed`] when it does not.
pub(crate) fn install_files(app_dir: &Path, journal: &mut [UpdateFile]) -> Result<()> {
    for index in 0..journal.len() {
        if let Err(install_error) = install_one(app_dir, &mut journal[index]) {
            warn!(
                "install failed on '{}', rolling back {} file(s): {}",
                journal[index].replacement.file_name,
                index + 1,
                install_error
            );
            return match rollback_files(journal) {
                Ok(()) => Err(install_error),
                Err(rollback_error) => Err(Error::RollbackFailed {
                    install_error: Box::new(install_error),
                    reason: rollback_error.to_string(),
                }),
            };
        }
    }
    Ok(())
}

fn install_one(app_dir: &Path, file: &mut UpdateFile) -> Result<()> {
    let dest = safe_join(app_dir, &file.replacement.sub_dir, &file.replacement.file_name)?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Install {
            path: parent.to_path_buf(),
            reason: format!("failed to create destination directory: {}", e),
        })?;
    }
    file.dest_path = Some(dest.clone());

    match fs::symlink_metadata(&dest) {
        Ok(meta) if meta.is_dir() => {
            // a directory under the destination name is left alone
            warn!("destination '{}' is a directory, skipping", dest.display());
            return Ok(());
        }
        Ok(meta) => {
            file.prev_mode = Some(mode_of(&meta));
            let (owner, group) = owner_of(&meta);
            file.prev_owner = owner;
            file.prev_group = group;

            let aside = old_path(&dest);
            fs::rename(&dest, &aside).map_err(|e| Error::Install {
                path: dest.clone(),
                reason: format!("failed to rename previous file aside: {}", e),
            })?;
            file.prev_renamed = true;
            debug!("renamed '{}' -> '{}'", dest.display(), aside.display());
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(Error::Install {
                path: dest,
                reason: format!("failed to stat destination: {}", e),
            });
        }
    }

    fs::rename(&file.staged_path, &dest).map_err(|e| Error::Install {
        path: dest.clone(),
        reason: format!("failed to move replacement into place: {}", e),
    })?;
    file.moved_into_place = true;

    let mode = match file.replacement.mode {
        ReplacementMode::Bits(bits) => bits,
        ReplacementMode::UseDefaultOrExisting => file.prev_mode.unwrap_or(DEFAULT_FILE_MODE),
    };
    apply_mode(&dest, mode).map_err(|e| Error::Install {
        path: dest.clone(),
        reason: format!("failed to set mode {:o}: {}", mode, e),
    })?;

    if let (Some(owner), Some(group)) = (file.prev_owner, file.prev_group) {
        restore_owner(&dest, owner, group).map_err(|e| Error::Install {
            path: dest.clone(),
            reason: format!("failed to restore ownership: {}", e),
        })?;
    }

    debug!("installed '{}'", dest.display());
    Ok(())
}

/// Undo every recorded step, newest first
pub(crate) fn rollback_files(journal: &[UpdateFile]) -> Result<()> {
    for file in journal.iter().rev() {
        let Some(dest) = &file.dest_path else {
            continue;
        };
        if file.moved_into_place {
            fs::remove_file(dest)?;
        }
        if file.prev_renamed {
            fs::rename(old_path(dest), dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(_meta: &fs::Metadata) -> u32 {
    DEFAULT_FILE_MODE
}

#[cfg(unix)]
fn owner_of(meta: &fs::Metadata) -> (Option<u32>, Option<u32>) {
    use std::os::unix::fs::MetadataExt;
    (Some(meta.uid()), Some(meta.gid()))
}

#[cfg(not(unix))]
fn owner_of(_meta: &fs::Metadata) -> (Option<u32>, Option<u32>) {
    (None, None)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn restore_owner(path: &Path, owner: u32, group: u32) -> std::io::Result<()> {
    use nix::unistd::{chown, Gid, Uid};
    chown(path, Some(Uid::from_raw(owner)), Some(Gid::from_raw(group)))
        .map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn restore_owner(_path: &Path, _owner: u32, _group: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::ReplacementFile;
    use tempfile::TempDir;

    /// Stage `content` under a unique name and journal it for `name`
    fn staged(staging: &Path, replacement: ReplacementFile, content: &str) -> UpdateFile {
        let staged_path = staging.join(format!("staged-{}", replacement.file_name));
        fs::write(&staged_path, content).unwrap();
        UpdateFile::staged(replacement, staged_path)
    }

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join(".staging");
        fs::create_dir(&staging).unwrap();
        (dir, staging)
    }

    fn read(path: &Path) -> String {
        String::from_utf8(fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_install_replaces_and_keeps_old() {
        let (dir, staging) = setup();
        let app = dir.path();
        fs::write(app.join("tool"), "v1").unwrap();

        let mut journal = vec![staged(&staging, ReplacementFile::new("tool"), "v2")];
        install_files(app, &mut journal).unwrap();

        assert_eq!(read(&app.join("tool")), "v2");
        assert_eq!(read(&app.join("tool.old")), "v1");
        assert!(journal[0].previous_file_renamed());
        assert!(journal[0].moved_into_place());
    }

    #[test]
    fn test_install_new_file_keeps_no_old() {
        let (dir, staging) = setup();
        let app = dir.path();

        let mut journal = vec![staged(&staging, ReplacementFile::new("fresh"), "hello")];
        install_files(app, &mut journal).unwrap();

        assert_eq!(read(&app.join("fresh")), "hello");
        assert!(!app.join("fresh.old").exists());
        assert!(!journal[0].previous_file_renamed());
        assert!(journal[0].moved_into_place());
    }

    #[test]
    fn test_install_creates_destination_subdirectories() {
        let (dir, staging) = setup();
        let app = dir.path();

        let mut journal = vec![staged(
            &staging,
            ReplacementFile::new("plug").in_dir("plugins/extra"),
            "p",
        )];
        install_files(app, &mut journal).unwrap();

        assert_eq!(read(&app.join("plugins/extra/plug")), "p");
    }

    #[test]
    fn test_install_skips_directory_destination() {
        let (dir, staging) = setup();
        let app = dir.path();
        fs::create_dir(app.join("tool")).unwrap();

        let mut journal = vec![staged(&staging, ReplacementFile::new("tool"), "v2")];
        install_files(app, &mut journal).unwrap();

        assert!(app.join("tool").is_dir());
        assert!(!journal[0].moved_into_place());
        assert!(!journal[0].previous_file_renamed());
    }

    #[test]
    fn test_mid_batch_failure_rolls_everything_back() {
        let (dir, staging) = setup();
        let app = dir.path();
        fs::write(app.join("first"), "one").unwrap();
        // "sub" exists as a file, so creating the second entry's
        // destination directory must fail mid-batch
        fs::write(app.join("sub"), "blocker").unwrap();
        fs::write(app.join("third"), "three").unwrap();

        let mut journal = vec![
            staged(&staging, ReplacementFile::new("first"), "ONE"),
            staged(&staging, ReplacementFile::new("second").in_dir("sub"), "TWO"),
            staged(&staging, ReplacementFile::new("third"), "THREE"),
        ];

        let err = install_files(app, &mut journal).unwrap_err();
        assert!(matches!(err, Error::Install { .. }));

        // original layout and contents are back, no .old files remain
        assert_eq!(read(&app.join("first")), "one");
        assert_eq!(read(&app.join("sub")), "blocker");
        assert_eq!(read(&app.join("third")), "three");
        assert!(!app.join("first.old").exists());
        assert!(!app.join("third.old").exists());
        assert!(!app.join("sub").is_dir());
    }

    #[test]
    #[cfg(unix)]
    fn test_rollback_preserves_original_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, staging) = setup();
        let app = dir.path();
        fs::write(app.join("tool"), "v1").unwrap();
        fs::set_permissions(&app.join("tool"), fs::Permissions::from_mode(0o750)).unwrap();
        fs::write(app.join("sub"), "blocker").unwrap();

        let mut journal = vec![
            staged(&staging, ReplacementFile::new("tool"), "v2"),
            staged(&staging, ReplacementFile::new("x").in_dir("sub"), "y"),
        ];
        install_files(app, &mut journal).unwrap_err();

        let mode = fs::metadata(app.join("tool")).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
        assert_eq!(read(&app.join("tool")), "v1");
    }

    #[test]
    #[cfg(unix)]
    fn test_explicit_mode_is_applied() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, staging) = setup();
        let app = dir.path();

        let mut journal = vec![staged(
            &staging,
            ReplacementFile::new("tool").with_mode(0o755),
            "v2",
        )];
        install_files(app, &mut journal).unwrap();

        let mode = fs::metadata(app.join("tool")).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    #[cfg(unix)]
    fn test_default_mode_keeps_previous_or_falls_back() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, staging) = setup();
        let app = dir.path();
        fs::write(app.join("kept"), "v1").unwrap();
        fs::set_permissions(&app.join("kept"), fs::Permissions::from_mode(0o700)).unwrap();

        let mut journal = vec![
            staged(&staging, ReplacementFile::new("kept"), "v2"),
            staged(&staging, ReplacementFile::new("fresh"), "new"),
        ];
        install_files(app, &mut journal).unwrap();

        let kept = fs::metadata(app.join("kept")).unwrap().permissions().mode() & 0o777;
        assert_eq!(kept, 0o700);
        let fresh = fs::metadata(app.join("fresh")).unwrap().permissions().mode() & 0o777;
        assert_eq!(fresh, 0o644);
    }

    #[test]
    fn test_safe_join_plain() {
        let base = Path::new("/app");
        let joined = safe_join(base, Path::new("plugins"), "tool").unwrap();
        assert_eq!(joined, PathBuf::from("/app/plugins/tool"));
    }

    #[test]
    fn test_safe_join_rejects_parent_components() {
        let base = Path::new("/app");
        assert!(safe_join(base, Path::new("../etc"), "passwd").is_err());
        assert!(safe_join(base, Path::new("ok/../.."), "f").is_err());
    }

    #[test]
    fn test_safe_join_rejects_absolute_sub_dir() {
        let base = Path::new("/app");
        assert!(safe_join(base, Path::new("/etc"), "passwd").is_err());
    }

    #[test]
    fn test_safe_join_rejects_separators_in_filename() {
        let base = Path::new("/app");
        assert!(safe_join(base, Path::new(""), "a/b").is_err());
        assert!(safe_join(base, Path::new(""), "..").is_err());
        assert!(safe_join(base, Path::new(""), "").is_err());
    }

    #[test]
    fn test_old_path_appends_suffix() {
        assert_eq!(
            old_path(Path::new("/app/tool")),
            PathBuf::from("/app/tool.old")
        );
        assert_eq!(
            old_path(Path::new("/app/tool.exe")),
            PathBuf::from("/app/tool.exe.old")
        );
    }
}
