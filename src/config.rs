// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::MonitorConfig;
use crate::reddit::DEFAULT_BASE_URL;
use crate::target::Target;

pub const ENV_CONFIG_PATH: &str = "LISTING_MONITOR_CONFIG";
pub const ENV_ACCESS_TOKEN: &str = "REDDIT_ACCESS_TOKEN";

fn default_interval_ms() -> u64 {
    2_000
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_user_agent() -> String {
    format!("listing-monitor/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub subreddit_comments: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub inbox: bool,
    #[serde(default)]
    pub mentions: bool,
}

impl WatchConfig {
    /// One target per monitored resource. Subreddit lists are combined into a
    /// single multi-reddit listing.
    pub fn targets(&self) -> Vec<Target> {
        let mut out = Vec::new();
        if !self.subreddits.is_empty() {
            out.push(Target::Subreddits(self.subreddits.clone()));
        }
        if !self.subreddit_comments.is_empty() {
            out.push(Target::SubredditComments(self.subreddit_comments.clone()));
        }
        out.extend(self.users.iter().cloned().map(Target::User));
        if self.inbox {
            out.push(Target::Inbox);
        }
        if self.mentions {
            out.push(Target::Mentions);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum gap between two monitor updates, shared by all monitors.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Bearer token. "ENV" means: read from REDDIT_ACCESS_TOKEN.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Serve Prometheus `/metrics` here. Without it the recorder is still
    /// installed and a snapshot is logged at shutdown.
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            access_token: None,
            metrics_addr: None,
            monitor: MonitorConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn finish(mut self) -> Result<Self> {
        if self
            .access_token
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("env"))
        {
            let t = std::env::var(ENV_ACCESS_TOKEN)
                .map_err(|_| anyhow!("Missing {ENV_ACCESS_TOKEN} env var"))?;
            self.access_token = Some(t);
        }
        self.monitor = self.monitor.sanitized();
        if self.interval_ms == 0 {
            self.interval_ms = default_interval_ms();
        }
        Ok(self)
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_from(path: &Path) -> Result<EngineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, &ext)?.finish()
}

/// Load config using env var + fallbacks:
/// 1) $LISTING_MONITOR_CONFIG
/// 2) config/monitor.toml
/// 3) config/monitor.json
/// 4) built-in defaults
pub fn load_default() -> Result<EngineConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    for candidate in ["config/monitor.toml", "config/monitor.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_from(&p);
        }
    }
    EngineConfig::default().finish()
}

fn parse_config(s: &str, hint_ext: &str) -> Result<EngineConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing json config");
    }
    match toml::from_str(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!(toml_err))
            .context("unsupported config format"),
    }
}
