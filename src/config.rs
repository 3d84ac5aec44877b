// src/config.rs

//! Application-side update configuration
//!
//! Holds the running version, the declared channel set with assigned
//! weights, and the asset-filename filters that decide which release files
//! apply to this host.

use crate::error::{Error, Result};
use crate::version::{parse_with_channels, Channel, CurrentVersion};
use regex::Regex;
use semver::Version;
use std::collections::HashSet;

/// Default mode bits for installed files when neither the caller nor a
/// previous file supplies one
pub(crate) const DEFAULT_FILE_MODE: u32 = 0o644;

/// Build the default asset-name filter for a given platform pair
///
/// Accepts any filename containing `<os>_<arch>` as a substring. Exposed
/// as a pure function so tests can pin a platform instead of inheriting
/// the build host's.
pub fn default_asset_pattern_for(os: &str, arch: &str) -> Regex {
    // escaped platform identifiers always form a valid pattern
    Regex::new(&format!(".*{}_{}.*", regex::escape(os), regex::escape(arch)))
        .expect("escaped platform pattern")
}

/// Default asset-name filter for the build host
pub fn default_asset_pattern() -> Regex {
    default_asset_pattern_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Immutable update configuration for the running application
///
/// Channel order matters: the first declared channel gets the highest
/// weight among named channels. The release channel always outranks the
/// named ones regardless of where it is declared.
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    current: CurrentVersion,
    channels: Vec<Channel>,
    asset_patterns: Vec<Regex>,
    /// When set, per-release validation errors (discarded drafts, filtered
    /// releases, duplicate filenames) are surfaced in source statuses
    /// instead of being silently dropped
    pub surface_release_errors: bool,
}

impl ApplicationConfig {
    /// Create a configuration from the running version string, the channel
    /// list, and optional asset-name filters
    ///
    /// Fails on duplicate channel names, more than one release channel, or
    /// a current version that does not parse under the channel set. A
    /// `None` filter installs the host `<os>_<arch>` default.
    pub fn new(
        version: &str,
        mut channels: Vec<Channel>,
        asset_patterns: Option<Vec<Regex>>,
    ) -> Result<Self> {
        let count = channels.len() as u32;
        let mut names: HashSet<String> = HashSet::with_capacity(channels.len());
        let mut releases = 0usize;
        for (index, channel) in channels.iter_mut().enumerate() {
            if channel.is_release() {
                releases += 1;
                if releases > 1 {
                    return Err(Error::DuplicateChannel("release".to_string()));
                }
                channel.set_weight(count + 1);
            } else {
                if !names.insert(channel.name().to_string()) {
                    return Err(Error::DuplicateChannel(channel.name().to_string()));
                }
                channel.set_weight(count - index as u32);
            }
        }

        let (version, channel) = parse_with_channels(&channels, version)?;
        let current = CurrentVersion::new(version, channel)?;

        let asset_patterns = match asset_patterns {
            Some(patterns) if !patterns.is_empty() => patterns,
            _ => vec![default_asset_pattern()],
        };

        Ok(Self {
            current,
            channels,
            asset_patterns,
            surface_release_errors: false,
        })
    }

    pub fn current_version(&self) -> &CurrentVersion {
        &self.current
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Parse a release tag under this configuration's channel set
    pub fn parse_version(&self, input: &str) -> Result<(Version, Channel)> {
        parse_with_channels(&self.channels, input)
    }

    /// Whether a release asset filename applies to this host
    pub(crate) fn asset_name_accepted(&self, filename: &str) -> bool {
        self.asset_patterns.iter().any(|p| p.is_match(filename))
    }

    /// True when only the release channel participates in updates, in which
    /// case pre-release-flagged records are not eligible at all
    pub(crate) fn release_only_updates(&self) -> bool {
        let mut release_updates = false;
        let mut named_updates = 0usize;
        for channel in &self.channels {
            if channel.is_release() {
                if !channel.use_for_update() {
                    return false;
                }
                release_updates = true;
            } else if channel.use_for_update() {
                named_updates += 1;
            }
        }
        release_updates && named_updates == 0
    }
}
