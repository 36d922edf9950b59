//! Configuration facade.
//!
//! An [`App`] owns the root router and every router created through it.
//! Routes are registered and routers mounted while the app is mutable;
//! [`App::freeze`] consumes it and returns the [`Dispatcher`] that serves
//! requests. There is no way back from a dispatcher to a mutable tree.
//!
//! ```rust
//! use segroute::{App, AppConfig, FieldSchema, HandlerRequest, HandlerResponse};
//! use serde_json::json;
//!
//! let mut app = App::new(AppConfig::named("pets"));
//! let pets = app.router("pets");
//! app.get(pets, "/{id}", FieldSchema::default(), |req: &HandlerRequest| {
//!     HandlerResponse::json(200, json!({ "id": req.get_path_param("id") }))
//! })
//! .unwrap();
//! app.include_router("/pets", pets).unwrap();
//!
//! let dispatcher = app.freeze().unwrap();
//! let req = http::Request::get("/pets/7").body(Vec::new()).unwrap();
//! assert_eq!(dispatcher.dispatch(req).body["id"], "7");
//! ```

use http::Method;
use std::sync::Arc;
use tracing::{info, Dispatch};

use crate::config::AppConfig;
use crate::dispatcher::{Dispatcher, Handler};
use crate::error::{ConfigError, ConfigErrors};
use crate::fields::{Binder, FieldSchema, SchemaBinder};
use crate::logging::scoped;
use crate::middleware::Middleware;
use crate::router::{Registry, Route, RouteId, Router, RouterId};

pub struct App {
    config: AppConfig,
    registry: Registry,
    root: RouterId,
    binder: Arc<dyn Binder>,
    sink: Option<Dispatch>,
}

impl App {
    /// Create an app whose root router is named after `config.name`.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let mut registry = Registry::new();
        let root = registry.add_router(&config.name);
        Self {
            config,
            registry,
            root,
            binder: Arc::new(SchemaBinder),
            sink: None,
        }
    }

    /// Send this app's log events (configuration and serving) to `sink`.
    #[must_use]
    pub fn with_log_sink(mut self, sink: Dispatch) -> Self {
        self.registry.set_sink(Some(sink.clone()));
        self.sink = Some(sink);
        self
    }

    /// Replace the default [`SchemaBinder`].
    #[must_use]
    pub fn with_binder(mut self, binder: Arc<dyn Binder>) -> Self {
        self.binder = binder;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The root router requests are dispatched through.
    #[must_use]
    pub fn root(&self) -> RouterId {
        self.root
    }

    /// Create a detached router. It serves nothing until it is mounted,
    /// directly or indirectly, on the root router.
    pub fn router(&mut self, name: &str) -> RouterId {
        self.registry.add_router(name)
    }

    pub fn router_ref(&self, id: RouterId) -> Result<&Router, ConfigError> {
        self.registry.router(id)
    }

    /// Access a router to set its tag, description or responses.
    pub fn router_mut(&mut self, id: RouterId) -> Result<&mut Router, ConfigError> {
        self.registry.router_mut(id)
    }

    /// Register `handler` for any method.
    pub fn register<H>(
        &mut self,
        router: RouterId,
        method: Method,
        path: &str,
        fields: FieldSchema,
        handler: H,
    ) -> Result<RouteId, ConfigError>
    where
        H: Handler + 'static,
    {
        self.register_shared(router, method, path, Arc::new(fields), Arc::new(handler))
    }

    /// Register a handler (and schema) that may be shared between routes.
    pub fn register_shared(
        &mut self,
        router: RouterId,
        method: Method,
        path: &str,
        fields: Arc<FieldSchema>,
        handler: Arc<dyn Handler>,
    ) -> Result<RouteId, ConfigError> {
        self.registry.register(router, method, path, fields, handler)
    }

    pub fn get<H: Handler + 'static>(
        &mut self,
        router: RouterId,
        path: &str,
        fields: FieldSchema,
        handler: H,
    ) -> Result<RouteId, ConfigError> {
        self.register(router, Method::GET, path, fields, handler)
    }

    pub fn post<H: Handler + 'static>(
        &mut self,
        router: RouterId,
        path: &str,
        fields: FieldSchema,
        handler: H,
    ) -> Result<RouteId, ConfigError> {
        self.register(router, Method::POST, path, fields, handler)
    }

    pub fn put<H: Handler + 'static>(
        &mut self,
        router: RouterId,
        path: &str,
        fields: FieldSchema,
        handler: H,
    ) -> Result<RouteId, ConfigError> {
        self.register(router, Method::PUT, path, fields, handler)
    }

    pub fn patch<H: Handler + 'static>(
        &mut self,
        router: RouterId,
        path: &str,
        fields: FieldSchema,
        handler: H,
    ) -> Result<RouteId, ConfigError> {
        self.register(router, Method::PATCH, path, fields, handler)
    }

    pub fn delete<H: Handler + 'static>(
        &mut self,
        router: RouterId,
        path: &str,
        fields: FieldSchema,
        handler: H,
    ) -> Result<RouteId, ConfigError> {
        self.register(router, Method::DELETE, path, fields, handler)
    }

    /// Mount `sub` on `router` at `prefix`. The app's root router cannot be
    /// mounted.
    pub fn mount(&mut self, router: RouterId, prefix: &str, sub: RouterId) -> Result<(), ConfigError> {
        if sub == self.root && router != self.root {
            return Err(ConfigError::RootMounted {
                router: self.registry.router(sub)?.name().to_string(),
                parent: self.registry.router(router)?.name().to_string(),
            });
        }
        self.registry.mount(router, prefix, sub)
    }

    /// Mount `sub` on the root router.
    pub fn include_router(&mut self, prefix: &str, sub: RouterId) -> Result<(), ConfigError> {
        self.registry.mount(self.root, prefix, sub)
    }

    /// Add middleware to every route under `router`, including routes of
    /// routers mounted below it.
    pub fn use_middleware<M>(&mut self, router: RouterId, mw: M) -> Result<(), ConfigError>
    where
        M: Middleware + 'static,
    {
        self.registry.router_mut(router)?.add_middleware(Arc::new(mw));
        Ok(())
    }

    pub fn route(&self, id: RouteId) -> Result<&Route, ConfigError> {
        self.registry.route(id)
    }

    /// Access a route to set its description or responses.
    pub fn route_mut(&mut self, id: RouteId) -> Result<&mut Route, ConfigError> {
        self.registry.route_mut(id)
    }

    /// Routes reachable from `router`, depth first.
    pub fn all_routes(&self, router: RouterId) -> Result<Vec<RouteId>, ConfigError> {
        self.registry.all_routes(router)
    }

    /// Full path `route` would get if the app were frozen now.
    pub fn full_path(&self, route: RouteId) -> Result<String, ConfigError> {
        self.registry.compute_full_path(route)
    }

    /// ASCII drawing of the root router's tree.
    #[must_use]
    pub fn render_tree(&self) -> String {
        self.registry.render_tree(self.root).unwrap_or_default()
    }

    /// Finish configuration.
    ///
    /// Fixes every route's full path, response overlay and middleware chain,
    /// validates path field schemas, and returns a dispatcher over the
    /// resulting read-only tree. All problems are reported together.
    pub fn freeze(self) -> Result<Dispatcher, ConfigErrors> {
        let App {
            config,
            registry,
            root,
            binder,
            sink,
        } = self;

        scoped(sink.as_ref(), || {
            info!(app = %config.name, version = %config.version, "Freezing route table");
        });

        let table = registry.freeze(root)?;

        if config.visualize_routes {
            let tree = table.render_tree();
            scoped(sink.as_ref(), || {
                info!(app = %config.name, "Route tree:\n{tree}");
            });
        }
        Ok(Dispatcher::with_binder(table, binder))
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
