//! Build configuration.

use serde::{Deserialize, Serialize};

/// Timeouts and options for a single build attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Dependency install timeout in seconds.
    pub install_timeout_seconds: u64,
    /// Timeout for topping up missing build-time dependencies.
    pub dev_install_timeout_seconds: u64,
    /// Production build timeout in seconds.
    pub build_timeout_seconds: u64,
    /// Conventional output directory names, tried in order.
    pub output_dirs: Vec<String>,
    /// Forward toolchain output lines to the log as they arrive.
    pub stream_logs: bool,
    /// Install declared devDependencies missing from `node_modules`.
    pub install_dev_dependencies: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            install_timeout_seconds: 900,
            dev_install_timeout_seconds: 600,
            build_timeout_seconds: 600,
            output_dirs: vec!["dist".to_string(), "build".to_string()],
            stream_logs: false,
            install_dev_dependencies: true,
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install_timeout(mut self, seconds: u64) -> Self {
        self.install_timeout_seconds = seconds;
        self
    }

    pub fn dev_install_timeout(mut self, seconds: u64) -> Self {
        self.dev_install_timeout_seconds = seconds;
        self
    }

    pub fn build_timeout(mut self, seconds: u64) -> Self {
        self.build_timeout_seconds = seconds;
        self
    }

    pub fn output_dirs(mut self, dirs: Vec<String>) -> Self {
        self.output_dirs = dirs;
        self
    }

    pub fn stream(mut self) -> Self {
        self.stream_logs = true;
        self
    }

    pub fn skip_dev_dependencies(mut self) -> Self {
        self.install_dev_dependencies = false;
        self
    }
}
