use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use http::Method;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

use crate::app::App;
use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::logging::init_logging;
use crate::manifest::Manifest;
use crate::router::Resolution;

/// Inspect and exercise a route manifest.
#[derive(Debug, Parser)]
#[command(name = "segroute")]
#[command(about = "Segment-trie router CLI", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the routes come from.
#[derive(Debug, Clone, Args)]
pub struct Source {
    /// Route manifest (YAML or JSON)
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// App config file; overrides the manifest's `app` section
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the routing tree
    Tree {
        #[command(flatten)]
        source: Source,
    },
    /// List every served route
    Routes {
        #[command(flatten)]
        source: Source,

        /// Emit JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show which route a request would select, without running it
    Resolve {
        #[command(flatten)]
        source: Source,

        /// HTTP method (case-insensitive)
        method: String,

        /// Request path, optionally with a query string
        path: String,
    },
    /// Dispatch a request through the echo handlers and print the response
    Request {
        #[command(flatten)]
        source: Source,

        method: String,

        path: String,

        /// Request header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

impl Commands {
    fn source(&self) -> &Source {
        match self {
            Commands::Tree { source }
            | Commands::Routes { source, .. }
            | Commands::Resolve { source, .. }
            | Commands::Request { source, .. } => source,
        }
    }
}

/// Resolve the app config: defaults, then the manifest's section, then the
/// config file, then the environment.
fn load_config(source: &Source, manifest: &Manifest) -> Result<AppConfig> {
    let mut config = match &source.config {
        Some(path) => AppConfig::from_file(path)?,
        None => manifest.app.clone().unwrap_or_default(),
    };
    config.apply_env();
    Ok(config)
}

fn build(source: &Source) -> Result<App> {
    let manifest = Manifest::from_file(&source.manifest)?;
    let config = load_config(source, &manifest)?;
    manifest.build_with(config)
}

fn freeze(app: App) -> Result<Dispatcher> {
    app.freeze().context("Route table failed validation")
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{raw}'"))
}

/// Parse arguments from the process and run, writing to stdout.
///
/// Logging goes to stderr so command output stays machine-readable.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let source = cli.command.source();
    let manifest = Manifest::from_file(&source.manifest)?;
    let config = load_config(source, &manifest)?;
    init_logging(&config.log)?;
    let app = manifest.build_with(config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&cli.command, app, &mut out)
}

/// Run one command, writing its output to `out`. No global logger is
/// installed.
pub fn run_command(command: &Commands, out: &mut impl Write) -> Result<()> {
    let app = build(command.source())?;
    execute(command, app, out)
}

fn execute(command: &Commands, app: App, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Tree { .. } => {
            let dispatcher = freeze(app)?;
            write!(out, "{}", dispatcher.render_tree())?;
        }
        Commands::Routes { json, .. } => {
            let dispatcher = freeze(app)?;
            if *json {
                let routes: Vec<_> = dispatcher
                    .routes()
                    .map(|r| {
                        json!({
                            "method": r.method().as_str(),
                            "path": r.full_path(),
                            "params": r.param_names().iter().map(|p| p.as_ref()).collect::<Vec<_>>(),
                            "operation_id": r.operation_id(),
                            "description": r.description(),
                            "responses": r.effective_responses(),
                        })
                    })
                    .collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&routes)?)?;
            } else {
                for r in dispatcher.routes() {
                    let names = r.param_names();
                    let params: Vec<&str> = names.iter().map(|p| p.as_ref()).collect();
                    writeln!(
                        out,
                        "{:<7} {:<40} [{}]",
                        r.method().as_str(),
                        r.full_path().unwrap_or_default(),
                        params.join(", ")
                    )?;
                }
            }
        }
        Commands::Resolve { method, path, .. } => {
            let dispatcher = freeze(app)?;
            let method = parse_method(method)?;
            let path_only = path.split('?').next().unwrap_or_default();
            match dispatcher.resolve(&method, path_only) {
                Resolution::Matched(m) => {
                    let params: Vec<String> = m
                        .path_params
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect();
                    let line = format!(
                        "200 {} {} {}",
                        m.route.method(),
                        m.route.full_path().unwrap_or_default(),
                        params.join(" ")
                    );
                    writeln!(out, "{}", line.trim_end())?;
                }
                Resolution::NotFound => writeln!(out, "404 Not Found")?,
                Resolution::MethodNotAllowed { allow } => {
                    writeln!(out, "405 Method Not Allowed (Allow: {allow})")?;
                }
            }
        }
        Commands::Request {
            method,
            path,
            headers,
            body,
            ..
        } => {
            let dispatcher = freeze(app)?;
            let mut builder = http::Request::builder()
                .method(parse_method(method)?)
                .uri(path.as_str());
            for header in headers {
                let (name, value) = header
                    .split_once(':')
                    .with_context(|| format!("header '{header}' is not in 'name: value' form"))?;
                builder = builder.header(name.trim(), value.trim());
            }
            let request = builder
                .body(body.clone().unwrap_or_default().into_bytes())
                .context("Failed to build request")?;
            let resp = dispatcher.dispatch(request);
            writeln!(out, "{}", resp.status)?;
            for (name, value) in &resp.headers {
                writeln!(out, "{name}: {value}")?;
            }
            writeln!(out)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&resp.body)?)?;
        }
    }
    Ok(())
}
