//! # Cache Node Configuration
//!
//! Everything is read once from the environment at startup. Malformed values
//! never abort startup: they are logged and the default is kept.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CODEX_API_URL` | `http://codex:8080` |
//! | `QAKU_CACHE_MAX_SIZE` | `5242880` |
//! | `QAKU_CONTENT_TOPIC` | `/0/qaku/1/persist/json` |
//! | `QAKU_MAX_IN_FLIGHT` | `64` |
//! | `QAKU_REQUEST_TIMEOUT_SECS` | `30` |
//! | `QAKU_CONNECT_TIMEOUT_SECS` | `5` |
//! | `QAKU_DRAIN_TIMEOUT_SECS` | `5` |
//! | `QAKU_DEDUPE_IN_FLIGHT` | `false` |
//! | `QAKU_BUS_CAPACITY` | `1000` |
//! | `QAKU_GATEWAY_ADDR` | `0.0.0.0:8080` |
//! | `QAKU_CORS_ORIGINS` | `http://localhost:3000,https://qaku.app` |
//! | `WAKU_REST_URL` | unset (relay bridge disabled) |
//! | `WAKU_POLL_INTERVAL_MS` | `1000` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use qaku_cache::{parse_base_url, CodexClientConfig, PipelineConfig, PolicyConfig};
use shared_bus::{ContentTopic, DEFAULT_CHANNEL_CAPACITY, QAKU_PERSIST_TOPIC};
use tracing::warn;

/// Default relay poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default read-through gateway listen address.
pub const DEFAULT_GATEWAY_ADDR: &str = "0.0.0.0:8080";

/// Browser origins allowed to call the gateway by default.
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "https://qaku.app"];

/// Complete cache node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Storage node connection.
    pub codex: CodexClientConfig,
    /// Size policy, admission gate and drain settings.
    pub pipeline: PipelineConfig,
    /// Content topic persist announcements arrive on.
    pub content_topic: ContentTopic,
    /// Messages the bus buffers per subscriber before dropping the oldest.
    pub bus_capacity: usize,
    /// Read-through HTTP gateway.
    pub gateway: GatewayConfig,
    /// Waku REST relay bridge, if enabled.
    pub relay: Option<RelayConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            codex: CodexClientConfig::default(),
            pipeline: PipelineConfig::default(),
            content_topic: ContentTopic::new(QAKU_PERSIST_TOPIC),
            bus_capacity: DEFAULT_CHANNEL_CAPACITY,
            gateway: GatewayConfig::default(),
            relay: None,
        }
    }
}

/// Read-through HTTP gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    /// Origins granted CORS access.
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// Waku REST relay bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Base URL of the Waku node REST API.
    pub base_url: String,
    pub poll_interval: Duration,
}

impl RelayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut codex = defaults.codex;
        if let Some(url) = get("CODEX_API_URL").and_then(|raw| valid_url(&raw, "CODEX_API_URL"))
        {
            codex.base_url = url;
        }
        codex.request_timeout =
            positive_secs(get("QAKU_REQUEST_TIMEOUT_SECS"), "QAKU_REQUEST_TIMEOUT_SECS")
                .unwrap_or(codex.request_timeout);
        codex.connect_timeout =
            positive_secs(get("QAKU_CONNECT_TIMEOUT_SECS"), "QAKU_CONNECT_TIMEOUT_SECS")
                .unwrap_or(codex.connect_timeout);

        let policy = PolicyConfig::from_env_value(get("QAKU_CACHE_MAX_SIZE").as_deref());
        let mut pipeline = PipelineConfig::new(policy);
        pipeline.max_in_flight = parse_var::<usize>(get("QAKU_MAX_IN_FLIGHT"), "QAKU_MAX_IN_FLIGHT")
            .filter(|&n| {
                if n == 0 {
                    warn!("QAKU_MAX_IN_FLIGHT must be positive, using default");
                }
                n > 0
            })
            .unwrap_or(pipeline.max_in_flight);
        pipeline.drain_timeout =
            positive_secs(get("QAKU_DRAIN_TIMEOUT_SECS"), "QAKU_DRAIN_TIMEOUT_SECS")
                .unwrap_or(pipeline.drain_timeout);
        pipeline.dedupe_in_flight = get("QAKU_DEDUPE_IN_FLIGHT")
            .and_then(|raw| parse_flag(&raw, "QAKU_DEDUPE_IN_FLIGHT"))
            .unwrap_or(pipeline.dedupe_in_flight);

        let content_topic = get("QAKU_CONTENT_TOPIC")
            .map(|topic| ContentTopic::new(topic.trim()))
            .unwrap_or(defaults.content_topic);

        let bus_capacity = parse_var::<usize>(get("QAKU_BUS_CAPACITY"), "QAKU_BUS_CAPACITY")
            .filter(|&n| {
                if n == 0 {
                    warn!("QAKU_BUS_CAPACITY must be positive, using default");
                }
                n > 0
            })
            .unwrap_or(defaults.bus_capacity);

        let mut gateway = defaults.gateway;
        gateway.listen_addr =
            parse_var::<SocketAddr>(get("QAKU_GATEWAY_ADDR"), "QAKU_GATEWAY_ADDR")
                .unwrap_or(gateway.listen_addr);
        if let Some(raw) = get("QAKU_CORS_ORIGINS") {
            let origins: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
            if origins.is_empty() {
                warn!(value = %raw, "QAKU_CORS_ORIGINS lists no origin, using default");
            } else {
                gateway.allowed_origins = origins;
            }
        }

        // An invalid Waku URL disables the bridge instead of failing every poll.
        let relay = get("WAKU_REST_URL")
            .and_then(|raw| valid_url(&raw, "WAKU_REST_URL"))
            .map(|url| {
                let mut relay = RelayConfig::new(url);
                relay.poll_interval =
                    parse_var::<u64>(get("WAKU_POLL_INTERVAL_MS"), "WAKU_POLL_INTERVAL_MS")
                        .filter(|&ms| ms > 0)
                        .map(Duration::from_millis)
                        .unwrap_or(DEFAULT_POLL_INTERVAL);
                relay
            });

        Self {
            codex,
            pipeline,
            content_topic,
            bus_capacity,
            gateway,
            relay,
        }
    }
}

/// Base URL without trailing slashes, or `None` (logged) if unusable.
fn valid_url(raw: &str, key: &str) -> Option<String> {
    match parse_base_url(raw) {
        Ok(_) => Some(raw.trim().trim_end_matches('/').to_string()),
        Err(e) => {
            warn!(key, value = raw, error = %e, "Invalid URL, ignoring");
            None
        }
    }
}

fn parse_var<T>(raw: Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Invalid value, using default");
            None
        }
    }
}

fn positive_secs(raw: Option<String>, key: &str) -> Option<Duration> {
    match parse_var::<u64>(raw, key)? {
        0 => {
            warn!(key, "Timeout must be positive, using default");
            None
        }
        secs => Some(Duration::from_secs(secs)),
    }
}

fn parse_flag(raw: &str, key: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(key, value = raw, "Invalid boolean, using default");
            None
        }
    }
}
