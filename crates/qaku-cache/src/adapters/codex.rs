//! Codex storage node client
//!
//! Implements both storage node ports over the Codex REST API:
//!
//! - `GET  {base}/api/codex/v1/data/{cid}/network/manifest`
//! - `POST {base}/api/codex/v1/data/{cid}/network`
//!
//! Only `200 OK` counts as success on either call. It also fetches node
//! identity and raw dataset content for the read-through gateway.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::{ContentId, DataContent, DatasetManifest};
use crate::error::{ConfigError, ResolutionError, TriggerError};
use crate::ports::{ManifestResolver, ReplicationTrigger};

/// Base URL used when none is configured.
pub const DEFAULT_CODEX_URL: &str = "http://codex:8080";

/// Error bodies are cut to this many characters before being kept.
const MAX_ERROR_BODY_CHARS: usize = 256;

const API_PREFIX: [&str; 3] = ["api", "codex", "v1"];

/// Connection settings for [`CodexClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodexClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for CodexClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CODEX_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl CodexClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Identity of the storage node, from `GET {base}/api/codex/v1/debug/info`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    #[serde(rename = "announceAddresses", default)]
    pub announce_addresses: Vec<String>,
}

impl NodeInfo {
    /// First announced address, if the node announces any.
    pub fn primary_address(&self) -> Option<&str> {
        self.announce_addresses.first().map(String::as_str)
    }
}

/// Parse a service base URL: absolute, http(s), with a host.
///
/// Trailing slashes are ignored.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim().trim_end_matches('/'))
        .map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) URL".to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// HTTP client for one Codex node.
#[derive(Clone, Debug)]
pub struct CodexClient {
    client: Client,
    base_url: Url,
}

impl CodexClient {
    /// Create a client. Fails on an unusable base URL.
    pub fn new(config: &CodexClientConfig) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&config.base_url)?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/api/codex/v1/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    pub(crate) fn manifest_url(&self, cid: &ContentId) -> Url {
        self.endpoint(&["data", cid.as_str(), "network", "manifest"])
    }

    pub(crate) fn replication_url(&self, cid: &ContentId) -> Url {
        self.endpoint(&["data", cid.as_str(), "network"])
    }

    pub(crate) fn data_url(&self, cid: &ContentId) -> Url {
        self.endpoint(&["data", cid.as_str()])
    }

    /// Start downloading a dataset from `GET {base}/api/codex/v1/data/{cid}`.
    ///
    /// Returns the response whatever its status, with the body not yet read,
    /// so callers can relay both. Only transport failures are errors. The
    /// request timeout covers the whole download.
    pub async fn fetch_data(
        &self,
        cid: &ContentId,
    ) -> Result<reqwest::Response, ResolutionError> {
        let url = self.data_url(cid);
        debug!(%url, "Fetching dataset");

        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolutionError::Unavailable(e.to_string()))
    }

    /// Fetch the node identity. Used as a startup connectivity check and by
    /// the gateway's info endpoint.
    pub async fn node_info(&self) -> Result<NodeInfo, ResolutionError> {
        let response = self
            .client
            .get(self.endpoint(&["debug", "info"]))
            .send()
            .await
            .map_err(|e| ResolutionError::Unavailable(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(ResolutionError::Unavailable(format!(
                "status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ResolutionError::Malformed(e.to_string()))
    }
}

fn truncate_body(body: String) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body
    } else {
        body.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

#[async_trait]
impl ManifestResolver for CodexClient {
    async fn resolve_manifest(&self, cid: &ContentId) -> Result<DatasetManifest, ResolutionError> {
        let url = self.manifest_url(cid);
        debug!(%url, "Fetching manifest");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolutionError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(ResolutionError::NotFound {
                    cid: cid.to_string(),
                })
            }
            status => {
                return Err(ResolutionError::Unavailable(format!("status {status}")));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ResolutionError::Unavailable(e.to_string()))?;

        Ok(DataContent::from_json(&body)?.manifest)
    }
}

#[async_trait]
impl ReplicationTrigger for CodexClient {
    async fn trigger_replication(&self, cid: &ContentId) -> Result<(), TriggerError> {
        let url = self.replication_url(cid);
        debug!(%url, "Requesting network replication");

        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| TriggerError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TriggerError::Rejected {
            status: status.as_u16(),
            body: truncate_body(body),
        })
    }
}
