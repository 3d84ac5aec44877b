// src/version/mod.rs

//! Version and channel model
//!
//! Versions follow semantic versioning with one extra rule: the first
//! pre-release identifier names the release track ("channel") the build
//! belongs to. `1.2.3-beta.4` is build 4 on the `beta` channel; `1.2.3`
//! belongs to the distinguished release channel, whose pre-release segment
//! is empty. A numeric first identifier is rejected because it cannot name
//! a channel.
//!
//! Ordering across channels works on a canonical comparison key: the
//! channel tag is dropped from the pre-release list and a terminal numeric
//! `0` is appended to whatever remains. The tag therefore never takes part
//! in ordering, while the surviving non-empty pre-release list keeps any
//! channel build below the plain release with the same numeric version.
//! Equal keys fall back to channel weight, where release outranks all.

use crate::error::{Error, Result};
use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;

/// A named release track with an update-selection weight
///
/// Weights are assigned by [`ApplicationConfig`](crate::ApplicationConfig)
/// at construction: earlier-declared channels weigh more, and the release
/// channel always weighs more than every named channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    name: String,
    weight: u32,
    use_for_update: bool,
    is_release: bool,
}

impl Channel {
    /// A named pre-release channel, e.g. `beta`
    pub fn new(name: impl Into<String>, use_for_update: bool) -> Self {
        Self {
            name: name.into(),
            weight: 0,
            use_for_update,
            is_release: false,
        }
    }

    /// The distinguished release channel (empty pre-release segment)
    pub fn release(use_for_update: bool) -> Self {
        Self {
            name: String::new(),
            weight: 0,
            use_for_update,
            is_release: true,
        }
    }

    /// Conventional `dev` channel
    pub fn dev(use_for_update: bool) -> Self {
        Self::new("dev", use_for_update)
    }

    /// Conventional `alpha` channel
    pub fn alpha(use_for_update: bool) -> Self {
        Self::new("alpha", use_for_update)
    }

    /// Conventional `beta` channel
    pub fn beta(use_for_update: bool) -> Self {
        Self::new("beta", use_for_update)
    }

    /// Channel name as it appears in version strings (empty for release)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_release(&self) -> bool {
        self.is_release
    }

    /// Whether candidates on this channel may be selected for update
    pub fn use_for_update(&self) -> bool {
        self.use_for_update
    }

    pub fn set_use_for_update(&mut self, use_for_update: bool) {
        self.use_for_update = use_for_update;
    }

    pub(crate) fn weight(&self) -> u32 {
        self.weight
    }

    pub(crate) fn set_weight(&mut self, weight: u32) {
        self.weight = weight;
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_release {
            write!(f, "release")
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Canonical comparison key: channel tag stripped, terminal `0` appended,
/// build metadata ignored, channel weight as tie-break
#[derive(Debug, Clone)]
pub struct ComparisonKey {
    version: Version,
    weight: u32,
}

impl ComparisonKey {
    pub(crate) fn new(version: &Version, channel: &Channel) -> Result<Self> {
        let mut canonical = version.clone();
        canonical.build = BuildMetadata::EMPTY;
        if !version.pre.is_empty() {
            let mut idents: Vec<&str> = version.pre.as_str().split('.').skip(1).collect();
            idents.push("0");
            canonical.pre = Prerelease::new(&idents.join("."))?;
        }
        Ok(Self {
            version: canonical,
            weight: channel.weight(),
        })
    }
}

impl PartialEq for ComparisonKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ComparisonKey {}

impl Ord for ComparisonKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp_precedence(&other.version)
            .then(self.weight.cmp(&other.weight))
    }
}

impl PartialOrd for ComparisonKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The running application's version and channel, fixed at configuration
#[derive(Debug, Clone)]
pub struct CurrentVersion {
    version: Version,
    channel: Channel,
    key: ComparisonKey,
}

impl CurrentVersion {
    pub(crate) fn new(version: Version, channel: Channel) -> Result<Self> {
        let key = ComparisonKey::new(&version, &channel)?;
        Ok(Self {
            version,
            channel,
            key,
        })
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub(crate) fn key(&self) -> &ComparisonKey {
        &self.key
    }
}

impl fmt::Display for CurrentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

/// Parse a version string against a declared channel set
///
/// Strips surrounding whitespace and a leading `v`, then binds the version
/// to a channel: an empty pre-release segment means the release channel
/// (an error when none is declared), otherwise the first pre-release
/// identifier must equal the name of a declared channel.
pub(crate) fn parse_with_channels(channels: &[Channel], input: &str) -> Result<(Version, Channel)> {
    let cleaned = input.trim().trim_start_matches('v');
    let version = Version::parse(cleaned)?;

    if version.pre.is_empty() {
        return match channels.iter().find(|c| c.is_release) {
            Some(channel) => Ok((version, channel.clone())),
            None => Err(Error::UnknownChannel {
                version: input.trim().to_string(),
            }),
        };
    }

    let first = version.pre.as_str().split('.').next().unwrap_or("");
    if first.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::NumericPreRelease(input.trim().to_string()));
    }

    match channels.iter().find(|c| !c.is_release && c.name == first) {
        Some(channel) => Ok((version, channel.clone())),
        None => Err(Error::UnknownChannel {
            version: input.trim().to_string(),
        }),
    }
}
