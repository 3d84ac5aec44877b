// src/error.rs

//! Crate-wide error type and result alias.
//!
//! Every fallible operation in the update path returns [`Result`]. Source
//! checks additionally collect errors into per-source statuses instead of
//! aborting, so a single bad release never takes down a whole check.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by the update engine
#[derive(Debug, Error)]
pub enum Error {
    /// Version string is not valid semantic versioning
    #[error("invalid version: {0}")]
    VersionParse(#[from] semver::Error),

    /// First pre-release identifier is numeric, so it cannot name a channel
    #[error("version '{0}' has a numeric pre-release channel identifier")]
    NumericPreRelease(String),

    /// Version does not map onto any configured channel
    #[error("version '{version}' does not name a configured channel")]
    UnknownChannel { version: String },

    /// Two configured channels share a name
    #[error("channel name '{0}' is not unique")]
    DuplicateChannel(String),

    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response arrived with a status code the caller does not accept
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Response body could not be decoded
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// A candidate release was dropped during validation (non-critical)
    #[error("release '{tag}' discarded: {reason}")]
    ReleaseDiscarded { tag: String, reason: String },

    /// Downloading or staging an asset failed
    #[error("failed to fetch asset '{filename}': {reason}")]
    Acquisition { filename: String, reason: String },

    /// The pipeline finished with nothing left to install
    #[error("no assets to install")]
    NothingToInstall,

    /// An archive asset could not be read
    #[error("failed to read archive '{filename}': {reason}")]
    Archive { filename: String, reason: String },

    /// A rename/chmod/chown step of the install procedure failed
    #[error("install failed for '{path}': {reason}")]
    Install { path: PathBuf, reason: String },

    /// A replacement destination would land outside the application directory
    #[error("destination path escapes the application directory: {0}")]
    PathEscape(PathBuf),

    /// Rollback itself failed; the application directory is in an
    /// indeterminate state and needs manual recovery
    #[error("rollback failed ({reason}) while recovering from: {install_error}")]
    RollbackFailed {
        install_error: Box<Error>,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
