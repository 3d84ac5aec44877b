// src/source/client.rs

//! HTTP client for release sources
//!
//! Thin wrapper around a blocking reqwest client: short connect timeout,
//! long read deadline for large asset streams, a User-Agent identifying
//! the engine and host platform, and retry for the small metadata fetches.

use crate::config::ApplicationConfig;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Connect/handshake timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall response deadline; asset downloads can be large
const READ_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Retry attempts for release-list fetches
const MAX_RETRIES: u32 = 3;

/// Base retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

pub(crate) struct HttpClient {
    client: reqwest::blocking::Client,
    user_agent: String,
}

impl HttpClient {
    pub(crate) fn new(cfg: &ApplicationConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;
        let user_agent = format!(
            "renew {} (rust {}-{})",
            cfg.current_version(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        );
        Ok(Self { client, user_agent })
    }

    /// GET a URL, accepting only the listed status codes
    pub(crate) fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        accepted: &[u16],
    ) -> Result<reqwest::blocking::Response> {
        debug!("GET {}", url);
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send()?;
        let status = response.status().as_u16();
        if !accepted.contains(&status) {
            return Err(Error::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// GET and decode a JSON document, retrying transport failures
    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.get(url, headers, &[200]) {
                Ok(response) => {
                    return response.json::<T>().map_err(|e| Error::Decode {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(Error::Http(e)) if attempt < MAX_RETRIES => {
                    warn!("fetch attempt {} for {} failed: {}, retrying", attempt, url, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
