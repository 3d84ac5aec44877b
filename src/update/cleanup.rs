// src/update/cleanup.rs

//! Deferred cleanup of replaced `.old` files
//!
//! After a successful install the previous files sit next to the new ones
//! under the `.old` suffix. Deleting them is trivial except for the one
//! case where the running executable is among them on a platform that
//! refuses to remove an open executable; there a detached helper process
//! waits out the parent and deletes the leftovers.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// What to do with the replaced files after a successful install
#[derive(Debug, Clone)]
pub enum CleanupMode {
    /// Remove every `.old` file directly; fails where the running
    /// executable cannot be deleted while in use
    PureDelete,
    /// Delete (deferring where the platform requires it) and terminate the
    /// current process with exit code 0
    KillProcess,
    /// Delete like `KillProcess`, then spawn the just-installed executable
    /// with the given arguments and exit 0
    RerunExec(Vec<OsString>),
}

/// Execute a cleanup mode over the listed `.old` paths
pub(crate) fn run(old_paths: Vec<PathBuf>, exe_path: &Path, mode: CleanupMode) -> Result<()> {
    match mode {
        CleanupMode::PureDelete => delete_all(&old_paths),
        CleanupMode::KillProcess => {
            delete_while_running(&old_paths)?;
            info!("previous version removed, exiting");
            std::process::exit(0);
        }
        CleanupMode::RerunExec(args) => {
            delete_while_running(&old_paths)?;
            info!("restarting {}", exe_path.display());
            Command::new(exe_path)
                .args(&args)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()?;
            std::process::exit(0);
        }
    }
}

/// Remove every listed path, reporting the first failure after trying all
pub(crate) fn delete_all(paths: &[PathBuf]) -> Result<()> {
    let mut first_error = None;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(e) => {
                warn!("failed to remove {}: {}", path.display(), e);
                if first_error.is_none() {
                    first_error = Some(Error::Install {
                        path: path.clone(),
                        reason: format!("failed to remove previous file: {}", e),
                    });
                }
            }
        }
    }
    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Delete `.old` files even when one of them backs the running executable
///
/// Unix hosts allow unlinking an open executable, so this is a plain
/// delete. Windows refuses; leftovers are handed to a detached `cmd.exe`
/// child that waits ~10 seconds for the parent to exit and deletes them.
#[cfg(unix)]
fn delete_while_running(paths: &[PathBuf]) -> Result<()> {
    delete_all(paths)
}

#[cfg(windows)]
fn delete_while_running(paths: &[PathBuf]) -> Result<()> {
    use std::os::windows::process::CommandExt;

    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

    let mut leftovers = Vec::new();
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(_) => leftovers.push(path.clone()),
        }
    }
    if leftovers.is_empty() {
        return Ok(());
    }

    let mut command = String::from("timeout /T 10 /NOBREAK >NUL");
    for path in &leftovers {
        command.push_str(&format!(" & del /F /Q \"{}\"", path.display()));
    }
    info!("deferring deletion of {} file(s) to a helper process", leftovers.len());
    Command::new("cmd.exe")
        .args(["/C", &command])
        .creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}
