// src/feed/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::fetcher::{HttpFetcher, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
use crate::feed::types::{FetchRequestOptions, OrderBy, DEFAULT_LIMIT, DEFAULT_MIN_MAGNITUDE};

pub const DEFAULT_FEED_CONFIG_PATH: &str = "config/feed.toml";
pub const DEFAULT_ENDPOINT: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

pub const ENV_FEED_CONFIG_PATH: &str = "QUAKE_FEED_CONFIG_PATH";
pub const ENV_FEED_ENDPOINT: &str = "QUAKE_FEED_ENDPOINT";
pub const ENV_MIN_MAGNITUDE: &str = "QUAKE_MIN_MAGNITUDE";
pub const ENV_ORDER_BY: &str = "QUAKE_ORDER_BY";
pub const ENV_LIMIT: &str = "QUAKE_LIMIT";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_min_magnitude() -> String {
    DEFAULT_MIN_MAGNITUDE.to_string()
}
fn default_limit() -> u32 {
    DEFAULT_LIMIT
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}
fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}
fn default_user_agent() -> String {
    concat!("quake-feed/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// String-encoded decimal, passed to `minmag=` verbatim.
    #[serde(default = "default_min_magnitude")]
    pub min_magnitude: String,
    #[serde(default)]
    pub order_by: OrderBy,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            min_magnitude: default_min_magnitude(),
            order_by: OrderBy::default(),
            limit: default_limit(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl FeedConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FeedConfig = toml::from_str(s).context("parsing feed config toml")?;
        cfg.validated()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve config file + env overrides:
    /// 1) $QUAKE_FEED_CONFIG_PATH (must exist)
    /// 2) config/feed.toml
    /// 3) built-in defaults
    ///
    /// then QUAKE_FEED_ENDPOINT / QUAKE_MIN_MAGNITUDE / QUAKE_ORDER_BY / QUAKE_LIMIT.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_FEED_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_FEED_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_FEED_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        base.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_nonempty(ENV_FEED_ENDPOINT) {
            self.endpoint = v;
        }
        if let Some(v) = env_nonempty(ENV_MIN_MAGNITUDE) {
            self.min_magnitude = v;
        }
        if let Some(v) = env_nonempty(ENV_ORDER_BY) {
            self.order_by = v.parse().with_context(|| format!("invalid {ENV_ORDER_BY}"))?;
        }
        if let Some(v) = env_nonempty(ENV_LIMIT) {
            self.limit = v
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_LIMIT}: {v:?}"))?;
        }
        self.validated()
    }

    fn validated(self) -> Result<Self> {
        let mag = self.min_magnitude.trim();
        if !mag.parse::<f64>().is_ok_and(f64::is_finite) {
            return Err(anyhow!("min_magnitude must be a decimal number, got {mag:?}"));
        }
        if self.connect_timeout_ms == 0 || self.read_timeout_ms == 0 {
            return Err(anyhow!("timeouts must be > 0 ms"));
        }
        Ok(self)
    }

    pub fn request_options(&self) -> FetchRequestOptions {
        FetchRequestOptions::new(self.min_magnitude.trim(), self.order_by, self.limit)
    }

    pub fn fetcher(&self) -> Result<HttpFetcher> {
        HttpFetcher::build(
            Duration::from_millis(self.connect_timeout_ms),
            Duration::from_millis(self.read_timeout_ms),
            &self.user_agent,
        )
        .context("building feed http client")
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
