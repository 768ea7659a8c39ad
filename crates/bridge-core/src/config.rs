use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "bridge.toml";

/// Bridge settings. Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Decision service root, e.g. `http://127.0.0.1:7777`.
    pub base_url: String,
    /// Where the engine writes the frame capture that accompanies each published state.
    pub artifact_path: PathBuf,
    pub capture_delay_ms: u64,
    /// Measured from arming the capture gate, not from the capture itself.
    pub publish_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub http_timeout_ms: u64,
    /// Runner frame interval.
    pub tick_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7777".to_string(),
            artifact_path: PathBuf::from("bot_screenshot.png"),
            capture_delay_ms: 1_000,
            publish_delay_ms: 2_000,
            poll_interval_ms: 5_000,
            http_timeout_ms: 10_000,
            tick_ms: 16,
        }
    }
}

impl BridgeConfig {
    /// File (if any) followed by `BRIDGE_*` overrides from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match ConfigLoader::resolve_path(CONFIG_FILE) {
            Some(path) => ConfigLoader::parse_from_path(&path)?,
            None => {
                tracing::info!(target: "bridge.config", file = CONFIG_FILE, "no config file, using defaults");
                Self::default()
            }
        };
        cfg.apply_env(|key| env::var(key).ok());
        Ok(cfg)
    }

    /// Applies `BRIDGE_*` overrides. Blank values are ignored, unparsable numbers keep the
    /// current value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        if let Some(url) = var("BRIDGE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(path) = var("BRIDGE_ARTIFACT_PATH") {
            self.artifact_path = PathBuf::from(path);
        }
        let millis = [
            ("BRIDGE_CAPTURE_DELAY_MS", &mut self.capture_delay_ms),
            ("BRIDGE_PUBLISH_DELAY_MS", &mut self.publish_delay_ms),
            ("BRIDGE_POLL_INTERVAL_MS", &mut self.poll_interval_ms),
            ("BRIDGE_HTTP_TIMEOUT_MS", &mut self.http_timeout_ms),
            ("BRIDGE_TICK_MS", &mut self.tick_ms),
        ];
        for (key, slot) in millis {
            let Some(raw) = var(key) else {
                continue;
            };
            match raw.trim().parse() {
                Ok(value) => *slot = value,
                Err(_) => {
                    tracing::warn!(target: "bridge.config", key, value = %raw, "ignoring non-numeric override")
                }
            }
        }
    }

    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    pub fn publish_delay(&self) -> Duration {
        Duration::from_millis(self.publish_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// TOML loader.
///
/// Search order:
/// 1) `BRIDGE_CONFIG_DIR/<relative_path>`
/// 2) `./<relative_path>`
/// 3) `<repo_root>/config/<relative_path>`
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn parse_from_path<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::parse_from_string(&text)
            .with_context(|| format!("Invalid config at {}", path.display()))
    }

    pub fn parse_from_string<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
        toml::from_str(text).context("Failed to parse TOML")
    }

    pub fn resolve_path(relative_path: &str) -> Option<PathBuf> {
        let rel = Path::new(relative_path);

        if let Some(root) = env::var_os("BRIDGE_CONFIG_DIR") {
            let candidate = PathBuf::from(root).join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if let Ok(cwd) = env::current_dir() {
            let candidate = cwd.join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        // This crate lives at <repo_root>/crates/bridge-core.
        let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .ancestors()
            .nth(2)?
            .join("config")
            .join(rel);
        candidate.is_file().then_some(candidate)
    }
}
