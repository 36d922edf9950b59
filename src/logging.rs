//! Structured logging setup.
//!
//! Nothing in the library writes to a process-wide logger on its own. An
//! [`App`](crate::app::App) may be handed a [`Dispatch`] built by
//! [`build_sink`]; the registry and the dispatcher then scope every event
//! they emit to it. Without one, events go to whatever default subscriber is
//! installed. [`init_logging`] installs a global subscriber and is meant for
//! binaries.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `SEGROUTE_LOG_LEVEL` | `info` | trace/debug/info/warn/error |
//! | `SEGROUTE_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `SEGROUTE_LOG_TARGET_FILTER` | unset | extra comma-separated filter directives |
//! | `SEGROUTE_LOG_INCLUDE_LOCATION` | `false` | add file and line to each event |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Logging configuration, loadable from a config file or the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    #[serde(rename = "level")]
    pub log_level: String,
    pub format: LogFormat,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: default_level(),
            format: LogFormat::Json,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields for every `SEGROUTE_LOG_*` variable that is set.
    pub fn apply_env(&mut self) {
        if let Ok(level) = env::var("SEGROUTE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(format) = env::var("SEGROUTE_LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Ok(filter) = env::var("SEGROUTE_LOG_TARGET_FILTER") {
            self.target_filter = Some(filter);
        }
        if let Some(include) = env::var("SEGROUTE_LOG_INCLUDE_LOCATION")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.include_location = include;
        }
    }

    /// Verbose, human-readable settings for local runs and tests
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            include_location: true,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn filter(&self, base: EnvFilter) -> EnvFilter {
        let mut env_filter = base;
        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',') {
                let filter = filter.trim();
                if filter.is_empty() {
                    continue;
                }
                match filter.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
                }
            }
        }
        env_filter
    }
}

/// Build a subscriber writing to stdout, wrapped as a [`Dispatch`].
#[must_use]
pub fn build_sink(config: &LogConfig) -> Dispatch {
    build_sink_with_writer(config, std::io::stdout)
}

/// Build a subscriber writing to `writer`.
///
/// The level comes from `config` only; `RUST_LOG` is not consulted, so an
/// injected sink behaves the same in every environment.
#[must_use]
pub fn build_sink_with_writer<W>(config: &LogConfig, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = config.filter(EnvFilter::new(config.level().as_str()));
    Dispatch::new(subscriber(config, filter, writer))
}

fn subscriber<W>(
    config: &LogConfig,
    filter: EnvFilter,
    writer: W,
) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };
    tracing_subscriber::registry().with(filter).with(fmt_layer)
}

/// Install a global subscriber for the process. `RUST_LOG`, when set, takes
/// precedence over the configured level.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let base = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));
    let dispatch = Dispatch::new(subscriber(config, config.filter(base), std::io::stderr));
    tracing::dispatcher::set_global_default(dispatch).context("Failed to initialize logging")
}

/// Run `f` with `sink` as the default subscriber, if one is given.
pub(crate) fn scoped<R>(sink: Option<&Dispatch>, f: impl FnOnce() -> R) -> R {
    match sink {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}
