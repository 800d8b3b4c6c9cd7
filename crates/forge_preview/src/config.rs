//! Preview configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use forge_runner::BuildConfig;
use serde::{Deserialize, Serialize};

use crate::error::{PreviewError, PreviewResult};

const DEFAULT_ROOT_NAME: &str = "forge_preview";

/// Settings for the preview server and workspace lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Interface the preview server binds to.
    pub host: String,
    /// Fixed preview port; 0 picks an ephemeral one.
    pub port: u16,
    /// Readiness probes before giving up on the server.
    pub readiness_attempts: u32,
    /// Delay between readiness probes, in milliseconds.
    pub readiness_interval_ms: u64,
    /// Free-space floor checked before every build, in bytes.
    pub min_free_bytes: u64,
    /// Shared directory holding every workspace.
    pub preview_root: PathBuf,
    pub build: BuildConfig,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            readiness_attempts: 50,
            readiness_interval_ms: 100,
            min_free_bytes: 50 * 1024 * 1024,
            preview_root: std::env::temp_dir().join(DEFAULT_ROOT_NAME),
            build: BuildConfig::default(),
        }
    }
}

impl PreviewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn preview_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.preview_root = root.into();
        self
    }

    pub fn min_free_bytes(mut self, bytes: u64) -> Self {
        self.min_free_bytes = bytes;
        self
    }

    pub fn readiness(mut self, attempts: u32, interval_ms: u64) -> Self {
        self.readiness_attempts = attempts;
        self.readiness_interval_ms = interval_ms;
        self
    }

    pub fn build(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> PreviewResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| PreviewError::Config(format!("invalid bind address {}:{}: {}", self.host, self.port, e)))
    }
}

/// Top-level configuration file.
///
/// ```toml
/// [preview]
/// port = 3000
///
/// [preview.build]
/// build_timeout_seconds = 300
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub preview: PreviewConfig,
}

impl ForgeConfig {
    pub fn from_toml_str(raw: &str) -> PreviewResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a file; a missing file yields the defaults.
    pub fn load(path: &Path) -> PreviewResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}
