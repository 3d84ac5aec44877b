// src/source/git.rs

//! Hosted-repository release source
//!
//! Talks to a GitHub-style releases API: one listing endpoint returning an
//! array of release records, one asset endpoint streaming a file by id.
//! Asset downloads accept 200 and 302, because the hosted API answers
//! asset requests with a redirect to its storage backend.

use super::{filter_assets, Asset, AssetLocator, HttpClient, Release, SourceStatus};
use crate::config::ApplicationConfig;
use crate::error::{Error, Result};
use crate::version::{Channel, ComparisonKey};
use chrono::{DateTime, Utc};
use semver::Version;
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Statuses accepted when streaming an asset
const ASSET_OK: [u16; 2] = [200, 302];

/// Release record as served by the hosted API (subset consumed)
#[derive(Debug, Deserialize)]
struct ReleaseRecord {
    tag_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<AssetRecord>,
}

#[derive(Debug, Deserialize)]
struct AssetRecord {
    name: String,
    id: u64,
}

/// A release listed by the hosted API
#[derive(Debug, Clone)]
pub struct GitRelease {
    pub(crate) tag: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) published_at: Option<DateTime<Utc>>,
    pub(crate) version: Version,
    pub(crate) channel: Channel,
    pub(crate) key: ComparisonKey,
    pub(crate) assets: Vec<Asset>,
    pub(crate) source: GitSource,
}

/// Hosted-repository source configuration
#[derive(Debug, Clone)]
pub struct GitSource {
    owner: String,
    repo: String,
    api_url: String,
    access_token: Option<String>,
    include_drafts: bool,
}

impl GitSource {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            api_url: DEFAULT_API_URL.to_string(),
            access_token: None,
            include_drafts: false,
        }
    }

    /// Point at a different API host (self-hosted instances, tests)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Attach a personal access token to every request
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Consider draft releases eligible (they are skipped by default)
    pub fn include_drafts(mut self, include: bool) -> Self {
        self.include_drafts = include;
        self
    }

    pub(crate) fn describe(&self) -> String {
        format!("github:{}/{}", self.owner, self.repo)
    }

    fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_url, self.owner, self.repo
        )
    }

    fn asset_url(&self, id: u64) -> String {
        format!(
            "{}/repos/{}/{}/releases/assets/{}",
            self.api_url, self.owner, self.repo, id
        )
    }

    fn auth_header(&self) -> Option<(&'static str, String)> {
        self.access_token
            .as_ref()
            .map(|t| ("Authorization", format!("token {}", t)))
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

        let auth = self.auth_header();
        let mut headers: Vec<(&str, &str)> = Vec::new();
        if let Some((name, value)) = &auth {
            headers.push((*name, value.as_str()));
        }

        let records: Vec<ReleaseRecord> =
            match client.get_json(&self.releases_url(), &headers) {
                Ok(records) => records,
                Err(e) => {
                    status.append_error(e, true);
                    return (Vec::new(), status);
                }
            };

        let mut releases = Vec::new();
        for record in records {
            match self.build_release(cfg, record) {
                Ok(release) => releases.push(Release::Git(release)),
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

    /// Turn one wire record into a candidate, or explain why it is dropped
    fn build_release(&self, cfg: &ApplicationConfig, record: ReleaseRecord) -> Result<GitRelease> {
        if record.draft && !self.include_drafts {
            return Err(Error::ReleaseDiscarded {
                tag: record.tag_name,
                reason: "draft release".to_string(),
            });
        }
        if record.prerelease && cfg.release_only_updates() {
            return Err(Error::ReleaseDiscarded {
                tag: record.tag_name,
                reason: "pre-release excluded by release-only configuration".to_string(),
            });
        }

        let (version, channel) =
            cfg.parse_version(&record.tag_name)
                .map_err(|e| Error::ReleaseDiscarded {
                    tag: record.tag_name.clone(),
                    reason: e.to_string(),
                })?;
        let key = ComparisonKey::new(&version, &channel)?;

        let assets = record
            .assets
            .into_iter()
            .map(|a| Asset {
                filename: a.name,
                locator: AssetLocator::GitAssetId(a.id),
            })
            .collect();
        let assets = filter_assets(cfg, &record.tag_name, assets)?;

        Ok(GitRelease {
            tag: record.tag_name,
            title: record.name,
            description: record.body,
            published_at: record.published_at,
            version,
            channel,
            key,
            assets,
            source: self.clone(),
        })
    }

    pub(crate) fn open_asset(
        &self,
        cfg: &ApplicationConfig,
        asset: &Asset,
    ) -> Result<Box<dyn Read>> {
        let url = match &asset.locator {
            AssetLocator::GitAssetId(id) => self.asset_url(*id),
            AssetLocator::Url(url) => url.clone(),
        };

        let auth = self.auth_header();
        let mut headers: Vec<(&str, &str)> = vec![("Accept", "application/octet-stream")];
        if let Some((name, value)) = &auth {
            headers.push((*name, value.as_str()));
        }

        let response = HttpClient::new(cfg)?.get(&url, &headers, &ASSET_OK)?;
        Ok(Box::new(response))
    }
}

impl GitRelease {
    /// When the hosted API published this release
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}
