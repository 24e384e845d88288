// src/catalog/mod.rs

//! Remote catalog client.
//!
//! This module provides functionality for:
//! - Fetching channel/distribution metadata from the update service
//! - Resolving "latest" queries against a series anchor
//! - Opening distribution/dependency/tool artifacts, following the
//!   catalog's single-hop signed-URL redirects
//!
//! All payloads are decoded structurally with serde; the catalog is pure
//! query state and nothing here touches the local stores.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Read timeout for catalog requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for catalog requests
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Content type set on the redirected artifact request
const BINARY_CONTENT_TYPE: &str = "binary/data";

/// A named release track, newest first in the grouped listing.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub distributions: Vec<Distribution>,
}

/// One installable release as described by the catalog.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub name: String,
    pub version: String,
    pub kind: String,
    pub channel: String,
    pub dependency: String,
}

/// Latest tool release and its compatibility verdict.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolVersion {
    pub version: String,
    #[serde(rename = "compatibility")]
    pub compatible: bool,
}

/// Wire row of `GET /distributions`; the dependency bundle rides in a
/// nested one-element list.
#[derive(Debug, Deserialize)]
struct DistributionRow {
    #[serde(default)]
    name: String,
    version: String,
    #[serde(rename = "type", default)]
    kind: String,
    channel: String,
    #[serde(default)]
    dependencies: Vec<DependencyRef>,
}

#[derive(Debug, Deserialize)]
struct DependencyRef {
    name: String,
}

impl From<DistributionRow> for Distribution {
    fn from(row: DistributionRow) -> Self {
        let dependency = row
            .dependencies
            .into_iter()
            .next_back()
            .map(|d| d.name)
            .unwrap_or_default();
        Distribution {
            name: row.name,
            version: row.version,
            kind: row.kind,
            channel: row.channel,
            dependency,
        }
    }
}

/// Group wire rows into channels. Channels are prepended as discovered so
/// the newest track ends up first; distributions keep wire order within a
/// channel (oldest first, latest last).
fn group_channels(rows: Vec<DistributionRow>) -> Vec<Channel> {
    let mut channels: Vec<Channel> = Vec::new();
    for row in rows {
        let dist = Distribution::from(row);
        match channels.iter().position(|c| c.name == dist.channel) {
            Some(index) => channels[index].distributions.push(dist),
            None => channels.insert(
                0,
                Channel {
                    name: dist.channel.clone(),
                    distributions: vec![dist],
                },
            ),
        }
    }
    channels
}

/// Find a version's catalog entry across all channels.
pub fn find_distribution<'a>(channels: &'a [Channel], version: &str) -> Option<&'a Distribution> {
    channels
        .iter()
        .flat_map(|c| c.distributions.iter())
        .find(|d| d.version == version)
}

/// Dependency bundle name the catalog associates with a version.
pub fn find_dependency(channels: &[Channel], version: &str) -> Option<String> {
    find_distribution(channels, version).map(|d| d.dependency.clone())
}

/// Versions in `version`'s channel that declare the same dependency bundle.
/// This is the reference set for dependency garbage collection.
pub fn versions_sharing_dependency(channels: &[Channel], version: &str) -> Vec<String> {
    let Some(dist) = find_distribution(channels, version) else {
        return Vec::new();
    };
    channels
        .iter()
        .filter(|c| c.name == dist.channel)
        .flat_map(|c| c.distributions.iter())
        .filter(|d| d.dependency == dist.dependency)
        .map(|d| d.version.clone())
        .collect()
}

/// Percent-encode the `+` characters JDK bundle names carry.
pub fn encode_dependency_name(name: &str) -> String {
    name.replace('+', "%2B")
}

/// Blocking HTTP client for one catalog environment.
///
/// Redirect handling is disabled on purpose: the artifact endpoints answer
/// with a single signed-URL hop that is followed by hand, and anything
/// deeper is a protocol violation that must fail loudly rather than loop.
pub struct CatalogClient {
    client: Client,
    base_url: String,
    user_agent: String,
    test_mode: bool,
    proxied: bool,
}

impl CatalogClient {
    /// Create a client for the configured environment.
    pub fn new(config: &Config, user_agent: String) -> Result<Self> {
        let proxied = config.proxy.is_some();
        let mut builder = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(Policy::none());

        if let Some(proxy) = &config.proxy {
            let mut proxy_config =
                reqwest::Proxy::all(format!("http://{}:{}", proxy.host, proxy.port))
                    .map_err(|e| Error::Settings(e.to_string()))?;
            if let (Some(user), Some(password)) = (&proxy.user, &proxy.password) {
                proxy_config = proxy_config.basic_auth(user, password);
            }
            builder = builder.proxy(proxy_config);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Server(format!("failed to create HTTP client: {}", e)))?;

        Ok(CatalogClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent,
            test_mode: config.test_mode,
            proxied,
        })
    }

    /// Transport failures surface differently when a proxy is in play.
    fn connection_error(&self) -> Error {
        if self.proxied {
            Error::ProxyConnection
        } else {
            Error::Connection
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        self.client
            .get(url)
            .headers(self.headers())
            .send()
            .map_err(|e| {
                warn!("request to {} failed: {}", url, e);
                self.connection_error()
            })
    }

    fn server_error(response: Response) -> Error {
        let status = response.status();
        let message = response
            .text()
            .ok()
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| status.to_string());
        Error::Server(message)
    }

    /// Fetch all channels with their distributions, newest channel first.
    pub fn fetch_channels(&self) -> Result<Vec<Channel>> {
        let url = format!("{}/distributions", self.base_url);
        let response = self.get(&url)?;
        if !response.status().is_success() {
            return Err(Self::server_error(response));
        }
        let body = response.text().map_err(|_| self.connection_error())?;
        let rows: Vec<DistributionRow> = serde_json::from_str(&body)?;
        let channels = group_channels(rows);
        debug!("catalog returned {} channels", channels.len());
        Ok(channels)
    }

    /// Most recent version the server files under the same series anchor as
    /// `version`. `Ok(None)` means the server had nothing for that anchor.
    pub fn fetch_latest(&self, version: &str, bucket: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/distributions/latest?version={}&type={}",
            self.base_url, version, bucket
        );
        let response = self.get(&url)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else if status.is_success() {
            let body = response.text().map_err(|_| self.connection_error())?;
            let payload: serde_json::Value = serde_json::from_str(&body)?;
            Ok(payload
                .get(bucket)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string))
        } else {
            Err(Self::server_error(response))
        }
    }

    /// Latest tool release and whether it is backward compatible with this
    /// one. `Ok(None)` when the server has no verdict.
    pub fn fetch_latest_tool_version(&self) -> Result<Option<ToolVersion>> {
        let url = format!("{}/versions/latest", self.base_url);
        let response = self.get(&url)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else if status.is_success() {
            let body = response.text().map_err(|_| self.connection_error())?;
            Ok(Some(serde_json::from_str(&body)?))
        } else {
            Err(Self::server_error(response))
        }
    }

    pub fn distribution_artifact_url(&self, version: &str) -> String {
        format!("{}/distributions/{}", self.base_url, version)
    }

    pub fn dependency_artifact_url(&self, name: &str) -> String {
        format!(
            "{}/dependencies/{}",
            self.base_url,
            encode_dependency_name(name)
        )
    }

    pub fn tool_artifact_url(&self, version: &str) -> String {
        format!("{}/versions/{}", self.base_url, version)
    }

    /// Open an artifact for streaming. A 302 is followed exactly once to the
    /// signed binary location; a redirect behind the redirect is a protocol
    /// violation and fails. `Ok(None)` means the artifact does not exist and
    /// the caller maps it to the right not-found kind.
    pub fn open_artifact(&self, url: &str) -> Result<Option<Response>> {
        let mut request = self.client.get(url).headers(self.headers());
        if self.test_mode {
            request = request.header("testMode", "true");
        }
        let response = request.send().map_err(|_| self.connection_error())?;

        let status = response.status();
        if status == StatusCode::FOUND {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::Server("redirect response carried no location".to_string())
                })?;
            debug!("following redirect to signed location");
            let redirected = self
                .client
                .get(&location)
                .headers(self.headers())
                .header(CONTENT_TYPE, BINARY_CONTENT_TYPE)
                .send()
                .map_err(|_| self.connection_error())?;
            if redirected.status().is_success() {
                Ok(Some(redirected))
            } else if redirected.status() == StatusCode::FOUND {
                Err(Error::Server(
                    "the artifact location redirected more than once".to_string(),
                ))
            } else {
                Ok(None)
            }
        } else if status.is_success() {
            Ok(Some(response))
        } else {
            Ok(None)
        }
    }
}
