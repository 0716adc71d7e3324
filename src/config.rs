// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const ENV_CONFIG_PATH: &str = "WIDGETS_CONFIG_PATH";
pub const ENV_BASE_URL: &str = "WIDGETS_BASE_URL";

fn default_base_url() -> String {
    "http://127.0.0.1:10000".to_string()
}
fn default_news_limit() -> u32 {
    20
}
fn default_news_timeout_ms() -> u64 {
    15_000
}
fn default_refresh_interval_ms() -> u64 {
    120_000
}
fn default_chat_timeout_ms() -> u64 {
    15_000
}
fn default_news_container_id() -> String {
    "news".to_string()
}

/// Endpoints and timings shared by both widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Base of the remote service, e.g. `https://bot.example.com/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// `limit` query parameter for the news endpoint (1..=100).
    #[serde(default = "default_news_limit")]
    pub news_limit: u32,
    #[serde(default = "default_news_timeout_ms")]
    pub news_timeout_ms: u64,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_chat_timeout_ms")]
    pub chat_timeout_ms: u64,
    #[serde(default = "default_news_container_id")]
    pub news_container_id: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            news_limit: default_news_limit(),
            news_timeout_ms: default_news_timeout_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
            chat_timeout_ms: default_chat_timeout_ms(),
            news_container_id: default_news_container_id(),
        }
    }
}

impl WidgetConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading widget config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing widget config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $WIDGETS_CONFIG_PATH
    /// 2) config/widgets.toml
    /// 3) config/widgets.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/widgets.toml");
        if toml_p.exists() {
            return Self::load_from_file(&toml_p);
        }
        let json_p = PathBuf::from("config/widgets.json");
        if json_p.exists() {
            return Self::load_from_file(&json_p);
        }
        Ok(Self::default())
    }

    /// `WIDGETS_BASE_URL` wins over whatever the file said.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(base) = std::env::var(ENV_BASE_URL) {
            let base = base.trim();
            if !base.is_empty() {
                self.base_url = base.to_string();
            }
        }
        self
    }

    fn sanitized(mut self) -> Self {
        self.news_limit = self.news_limit.clamp(1, 100);
        if self.news_timeout_ms == 0 {
            self.news_timeout_ms = default_news_timeout_ms();
        }
        if self.chat_timeout_ms == 0 {
            self.chat_timeout_ms = default_chat_timeout_ms();
        }
        if self.refresh_interval_ms == 0 {
            self.refresh_interval_ms = default_refresh_interval_ms();
        }
        if self.news_container_id.trim().is_empty() {
            self.news_container_id = default_news_container_id();
        }
        self
    }

    /// `<base>/news?limit=N`
    pub fn news_url(&self) -> Result<Url, url::ParseError> {
        let mut u = endpoint(&self.base_url, "news")?;
        u.query_pairs_mut()
            .append_pair("limit", &self.news_limit.to_string());
        Ok(u)
    }

    /// `<base>/chat`
    pub fn chat_url(&self) -> Result<Url, url::ParseError> {
        endpoint(&self.base_url, "chat")
    }

    pub fn news_timeout(&self) -> Duration {
        Duration::from_millis(self.news_timeout_ms)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_millis(self.chat_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Join `segment` below the base path, keeping any prefix like `/api`.
fn endpoint(base: &str, segment: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base.trim())?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(segment)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WidgetConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    if hint_ext == "toml" {
        return Ok(toml::from_str(s)?);
    }
    // Unknown extension: try JSON, then TOML.
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    toml::from_str(s).map_err(|e| anyhow!("unsupported widget config format: {e}"))
}
