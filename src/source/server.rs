// src/source/server.rs

//! Plain HTTP manifest source
//!
//! Reads a single JSON document listing releases. Each release names a
//! `folder_url` (always ending in `/`) plus its asset filenames; an asset
//! URL is simply the concatenation of the two. Only status 200 is
//! accepted anywhere on this source.

use super::{filter_assets, Asset, AssetLocator, HttpClient, Release, SourceStatus};
use crate::config::ApplicationConfig;
use crate::error::{Error, Result};
use crate::version::{Channel, ComparisonKey};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::debug;

/// One release entry of the manifest document
///
/// Field names follow the served document verbatim; the same type is used
/// by the manifest generator, so the two sides cannot drift apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRelease {
    #[serde(rename = "folder_url", default)]
    pub folder_url: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Assets", default)]
    pub assets: Vec<ManifestAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestAsset {
    #[serde(rename = "Filename")]
    pub filename: String,
}

/// A release listed by the manifest document
#[derive(Debug, Clone)]
pub struct ServerRelease {
    pub(crate) tag: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) version: Version,
    pub(crate) channel: Channel,
    pub(crate) key: ComparisonKey,
    pub(crate) assets: Vec<Asset>,
}

/// HTTP manifest source configuration
#[derive(Debug, Clone)]
pub struct ServerSource {
    manifest_url: String,
}

impl ServerSource {
    pub fn new(manifest_url: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
        }
    }

    pub(crate) fn describe(&self) -> String {
        format!("server:{}", self.manifest_url)
    }

    pub(crate) fn list_releases(
        &self,
        cfg: &ApplicationConfig,
    ) -> (Vec<Release>, SourceStatus) {
        let mut status = SourceStatus::new(self.describe());

        let client = match HttpClient::new(cfg) {
            Ok(client) => client,
            Err(e) => {
                status.append_error(e, true);
                return (Vec::new(), status);
            }
        };

        let entries: Vec<ManifestRelease> = match client.get_json(&self.manifest_url, &[]) {
            Ok(entries) => entries,
            Err(e) => {
                status.append_error(e, true);
                return (Vec::new(), status);
            }
        };

        let mut releases = Vec::new();
        for entry in entries {
            match build_release(cfg, entry) {
                Ok(release) => releases.push(Release::Server(release)),
                Err(e) => {
                    debug!("skipping release: {}", e);
                    if cfg.surface_release_errors {
                        status.append_error(e, false);
                    }
                }
            }
        }

        (releases, status)
    }
}

/// Turn one manifest entry into a candidate, or explain why it is dropped
fn build_release(cfg: &ApplicationConfig, entry: ManifestRelease) -> Result<ServerRelease> {
    let (version, channel) =
        cfg.parse_version(&entry.version)
            .map_err(|e| Error::ReleaseDiscarded {
                tag: entry.version.clone(),
                reason: e.to_string(),
            })?;
    let key = ComparisonKey::new(&version, &channel)?;

    let assets = entry
        .assets
        .into_iter()
        .map(|a| Asset {
            locator: AssetLocator::Url(format!("{}{}", entry.folder_url, a.filename)),
            filename: a.filename,
        })
        .collect();
    let assets = filter_assets(cfg, &entry.version, assets)?;

    Ok(ServerRelease {
        tag: entry.version,
        title: entry.name,
        description: entry.description,
        version,
        channel,
        key,
        assets,
    })
}

/// Stream an asset from its fully formed URL (manifest sources only)
pub(crate) fn open_asset_url(
    cfg: &ApplicationConfig,
    asset: &Asset,
) -> Result<Box<dyn Read>> {
    let url = match &asset.locator {
        AssetLocator::Url(url) => url.clone(),
        AssetLocator::GitAssetId(id) => {
            return Err(Error::Acquisition {
                filename: asset.filename.clone(),
                reason: format!("asset id {} has no download URL", id),
            });
        }
    };
    let response = HttpClient::new(cfg)?.get(&url, &[], &[200])?;
    Ok(Box::new(response))
}
