//! Declarative route tables.
//!
//! A manifest describes routers, their routes and how they are mounted, in
//! YAML or JSON. Top-level `routes`, `mounts` and `responses` belong to the
//! root router. Every route gets an [`EchoHandler`], which makes a manifest
//! useful for checking how requests resolve without writing handlers.
//!
//! ```yaml
//! app:
//!   name: shop
//! routes:
//!   - method: GET
//!     path: /health
//! mounts:
//!   - prefix: /users
//!     router: users
//! routers:
//!   - name: users
//!     routes:
//!       - method: GET
//!         path: /{id}
//!         fields:
//!           - { name: id, in: path, kind: integer }
//!       - method: GET
//!         path: /files/*rest
//! ```

use anyhow::{anyhow, bail, Context, Result};
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::app::App;
use crate::config::AppConfig;
use crate::dispatcher::Handler;
use crate::echo::EchoHandler;
use crate::error::ConfigErrors;
use crate::fields::FieldSchema;
use crate::router::{Responses, RouterId};

/// One route entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: FieldSchema,
    #[serde(default)]
    pub responses: Responses,
}

/// Mount `router` (by name) at `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    pub prefix: String,
    pub router: String,
}

/// A named router and what it contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterSpec {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub mounts: Vec<MountSpec>,
    #[serde(default)]
    pub responses: Responses,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub app: Option<AppConfig>,
    pub routes: Vec<RouteSpec>,
    pub mounts: Vec<MountSpec>,
    pub responses: Responses,
    pub routers: Vec<RouterSpec>,
}

impl Manifest {
    /// Load a manifest; `.yaml`/`.yml` is read as YAML, anything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        if is_yaml {
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse manifest {}", path.display()))
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse manifest {}", path.display()))
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build an app using the manifest's own `app` section (or defaults).
    pub fn build(&self) -> Result<App> {
        self.build_with(self.app.clone().unwrap_or_default())
    }

    /// Build an app with echo handlers on every route.
    ///
    /// Routers are created first, then every route is registered, then
    /// mounts are applied in declaration order (root's first). Registration
    /// and mount problems are collected and reported together.
    pub fn build_with(&self, config: AppConfig) -> Result<App> {
        let mut app = App::new(config);
        let root = app.root();
        let handler: Arc<dyn Handler> = Arc::new(EchoHandler);
        let mut errors = ConfigErrors::default();

        let mut ids: HashMap<&str, RouterId> = HashMap::new();
        for spec in &self.routers {
            if spec.name == app.config().name || ids.contains_key(spec.name.as_str()) {
                bail!("router name '{}' is used more than once", spec.name);
            }
            let id = app.router(&spec.name);
            let router = app.router_mut(id)?;
            if let Some(tag) = &spec.tag {
                router.set_tag(tag.clone());
            }
            router.set_description(spec.description.clone());
            for (status, doc) in &spec.responses {
                router.add_response(*status, doc.clone());
            }
            ids.insert(spec.name.as_str(), id);
        }
        {
            let router = app.router_mut(root)?;
            for (status, doc) in &self.responses {
                router.add_response(*status, doc.clone());
            }
        }

        let sections = std::iter::once((root, &self.routes, &self.mounts)).chain(
            self.routers
                .iter()
                .filter_map(|spec| ids.get(spec.name.as_str()).map(|id| (*id, &spec.routes, &spec.mounts))),
        );
        let sections: Vec<_> = sections.collect();

        for (router, routes, _) in &sections {
            for spec in routes.iter() {
                let method = parse_method(&spec.method)?;
                match app.register_shared(
                    *router,
                    method,
                    &spec.path,
                    Arc::new(spec.fields.clone()),
                    Arc::clone(&handler),
                ) {
                    Ok(id) => {
                        let route = app.route_mut(id)?;
                        route.set_description(spec.description.clone());
                        for (status, doc) in &spec.responses {
                            route.with_response(*status, doc.clone());
                        }
                    }
                    Err(e) => errors.push(e),
                }
            }
        }

        for (router, _, mounts) in &sections {
            for mount in mounts.iter() {
                let sub = ids
                    .get(mount.router.as_str())
                    .copied()
                    .ok_or_else(|| anyhow!("mount refers to unknown router '{}'", mount.router))?;
                if let Err(e) = app.mount(*router, &mount.prefix, sub) {
                    errors.push(e);
                }
            }
        }

        if !errors.is_empty() {
            return Err(anyhow::Error::new(errors).context("Manifest describes an invalid route table"));
        }
        Ok(app)
    }
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{raw}'"))
}
