//! # Application Configuration
//!
//! [`AppConfig`] is read from a YAML or JSON file (chosen by extension) and
//! can then be overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `SEGROUTE_APP_NAME` | `name` |
//! | `SEGROUTE_APP_VERSION` | `version` |
//! | `SEGROUTE_VISUALIZE_ROUTES` | `visualize_routes` |
//! | `SEGROUTE_LOG_*` | `log` (see [`crate::logging`]) |
//!
//! ```yaml
//! name: pets
//! version: 1.2.0
//! visualize_routes: true
//! log:
//!   level: debug
//!   format: pretty
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::logging::LogConfig;

/// Settings for an [`App`](crate::app::App).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name; also the name of the root router
    pub name: String,
    pub version: String,
    /// Log the route tree when the app is frozen
    pub visualize_routes: bool,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            version: "0.0.0".to_string(),
            visualize_routes: false,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Config with the given name and every other field defaulted.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let config = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?,
            other => bail!(
                "Unsupported config extension '{other}' for {}: expected yaml, yml or json",
                path.display()
            ),
        };
        Ok(config)
    }

    /// Override fields from `SEGROUTE_*` variables that are set.
    pub fn apply_env(&mut self) {
        if let Ok(name) = env::var("SEGROUTE_APP_NAME") {
            self.name = name;
        }
        if let Ok(version) = env::var("SEGROUTE_APP_VERSION") {
            self.version = version;
        }
        if let Some(visualize) = env::var("SEGROUTE_VISUALIZE_ROUTES")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.visualize_routes = visualize;
        }
        self.log.apply_env();
    }

    /// Defaults overridden by the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }
}
