// src/source/mod.rs

//! Release sources
//!
//! A source produces candidate releases and opens per-asset byte streams.
//! Two kinds exist: a hosted-repository API ([`GitSource`]) and a plain
//! HTTP manifest index ([`ServerSource`]). Both are modeled as variants of
//! [`UpdateSource`] and dispatched by match; the narrow [`ReleaseProvider`]
//! trait exists so the check orchestration can run against test doubles.
//!
//! Sources never abort a check: every failure is folded into the returned
//! [`SourceStatus`], critical when the source produced nothing at all.

mod client;
mod git;
mod server;
mod status;

pub use git::{GitRelease, GitSource};
pub use server::{ManifestAsset, ManifestRelease, ServerRelease, ServerSource};
pub use status::{CheckStatus, SourceCheckStatus, SourceStatus};

pub(crate) use client::HttpClient;

use crate::config::ApplicationConfig;
use crate::error::{Error, Result};
use crate::version::{Channel, ComparisonKey};
use semver::Version;
use std::collections::HashSet;
use std::io::Read;

/// One downloadable file of a release
#[derive(Debug, Clone)]
pub struct Asset {
    pub filename: String,
    pub locator: AssetLocator,
}

/// Where an asset's bytes come from; opaque to everything but the source
#[derive(Debug, Clone)]
pub enum AssetLocator {
    /// Hosted-repo asset id, resolved through the API asset endpoint
    GitAssetId(u64),
    /// Fully formed download URL
    Url(String),
}

/// A candidate release produced by a source
#[derive(Debug, Clone)]
pub enum Release {
    Git(git::GitRelease),
    Server(server::ServerRelease),
}

impl Release {
    /// Verbatim release tag, e.g. `v1.2.3-beta.4`
    pub fn tag(&self) -> &str {
        match self {
            Release::Git(r) => &r.tag,
            Release::Server(r) => &r.tag,
        }
    }

    /// Human-readable release title
    pub fn title(&self) -> &str {
        match self {
            Release::Git(r) => &r.title,
            Release::Server(r) => &r.title,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Release::Git(r) => &r.description,
            Release::Server(r) => &r.description,
        }
    }

    pub fn version(&self) -> &Version {
        match self {
            Release::Git(r) => &r.version,
            Release::Server(r) => &r.version,
        }
    }

    pub fn channel(&self) -> &Channel {
        match self {
            Release::Git(r) => &r.channel,
            Release::Server(r) => &r.channel,
        }
    }

    /// Assets surviving the configuration's filename filter
    pub fn assets(&self) -> &[Asset] {
        match self {
            Release::Git(r) => &r.assets,
            Release::Server(r) => &r.assets,
        }
    }

    pub(crate) fn key(&self) -> &ComparisonKey {
        match self {
            Release::Git(r) => &r.key,
            Release::Server(r) => &r.key,
        }
    }

    /// Open the byte stream of one of this release's assets
    pub fn open_asset(
        &self,
        cfg: &ApplicationConfig,
        asset: &Asset,
    ) -> Result<Box<dyn Read>> {
        match self {
            Release::Git(r) => r.source.open_asset(cfg, asset),
            Release::Server(_) => server::open_asset_url(cfg, asset),
        }
    }
}

/// A configured release source
#[derive(Debug, Clone)]
pub enum UpdateSource {
    GitRepo(GitSource),
    HttpServer(ServerSource),
}

impl UpdateSource {
    /// Hosted-repository source for `owner/repo`
    pub fn git(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        UpdateSource::GitRepo(GitSource::new(owner, repo))
    }

    /// HTTP manifest source reading the document at `manifest_url`
    pub fn http_server(manifest_url: impl Into<String>) -> Self {
        UpdateSource::HttpServer(ServerSource::new(manifest_url))
    }
}

/// The two operations every source supports
pub(crate) trait ReleaseProvider {
    /// Stable description used in statuses and logs
    fn describe(&self) -> String;

    /// Query the source for candidate releases; failures land in the status
    fn list_releases(&self, cfg: &ApplicationConfig) -> (Vec<Release>, SourceStatus);

    /// Open a byte stream for one asset previously listed by this source
    fn open_asset(&self, cfg: &ApplicationConfig, asset: &Asset) -> Result<Box<dyn Read>>;
}

impl ReleaseProvider for UpdateSource {
    fn describe(&self) -> String {
        match self {
            UpdateSource::GitRepo(s) => s.describe(),
            UpdateSource::HttpServer(s) => s.describe(),
        }
    }

    fn list_releases(&self, cfg: &ApplicationConfig) -> (Vec<Release>, SourceStatus) {
        match self {
            UpdateSource::GitRepo(s) => s.list_releases(cfg),
            UpdateSource::HttpServer(s) => s.list_releases(cfg),
        }
    }

    fn open_asset(&self, cfg: &ApplicationConfig, asset: &Asset) -> Result<Box<dyn Read>> {
        match self {
            UpdateSource::GitRepo(s) => s.open_asset(cfg, asset),
            UpdateSource::HttpServer(_) => server::open_asset_url(cfg, asset),
        }
    }
}

/// Apply the host filename filter and reject duplicate names
///
/// Returns the surviving assets, or a discard error when nothing matches
/// the host or a filename repeats within the release.
pub(crate) fn filter_assets(
    cfg: &ApplicationConfig,
    tag: &str,
    assets: Vec<Asset>,
) -> Result<Vec<Asset>> {
    let kept: Vec<Asset> = assets
        .into_iter()
        .filter(|a| cfg.asset_name_accepted(&a.filename))
        .collect();

    if kept.is_empty() {
        return Err(Error::ReleaseDiscarded {
            tag: tag.to_string(),
            reason: "no assets match this host".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(kept.len());
    for asset in &kept {
        if !seen.insert(asset.filename.as_str()) {
            return Err(Error::ReleaseDiscarded {
                tag: tag.to_string(),
                reason: format!("duplicate asset filename '{}'", asset.filename),
            });
        }
    }

    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Channel;

    fn cfg() -> ApplicationConfig {
        ApplicationConfig::new(
            "1.0.0",
            vec![Channel::release(true)],
            Some(vec![crate::config::default_asset_pattern_for(
                "linux", "x86_64",
            )]),
        )
        .unwrap()
    }

    fn asset(name: &str) -> Asset {
        Asset {
            filename: name.to_string(),
            locator: AssetLocator::GitAssetId(1),
        }
    }

    #[test]
    fn test_filter_drops_foreign_platforms() {
        let kept = filter_assets(
            &cfg(),
            "v1.0.1",
            vec![asset("app_linux_x86_64"), asset("app_darwin_aarch64")],
        )
        .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].filename, "app_linux_x86_64");
    }

    #[test]
    fn test_filter_rejects_release_without_matching_assets() {
        let err = filter_assets(&cfg(), "v1.0.1", vec![asset("app_darwin_aarch64")]).unwrap_err();
        assert!(matches!(err, Error::ReleaseDiscarded { .. }));
    }

    #[test]
    fn test_filter_rejects_duplicate_filenames() {
        let err = filter_assets(
            &cfg(),
            "v1.0.1",
            vec![asset("app_linux_x86_64"), asset("app_linux_x86_64")],
        )
        .unwrap_err();
        assert!(matches!(err, Error::ReleaseDiscarded { .. }));
    }
}
