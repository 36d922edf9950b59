//! Router registry: registration, mounting, enumeration and the frozen
//! route table used on the hot path.

use http::Method;
use smallvec::SmallVec;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info, warn, Dispatch};

use super::radix::{NodeId, RadixTree, SpliceConflict};
use super::route::{Responses, Route, RouteId};
use super::segment::{join, segments, tokenize, Segment};
use crate::dispatcher::Handler;
use crate::error::{ConfigError, ConfigErrors};
use crate::fields::FieldSchema;
use crate::logging::scoped;
use crate::middleware::Middleware;

/// Maximum number of captured path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured parameters, in the order their segments appear in the pattern.
///
/// Names are `Arc<str>` shared with the route tree; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Handle to a router inside a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouterId(usize);

impl RouterId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named group of routes sharing a mount prefix.
///
/// `children` and `parent` describe how routers were composed; they are only
/// walked for enumeration, documentation and freeze-time overlays. Dispatch
/// never looks at routers, only at the merged node tree.
#[derive(Clone)]
pub struct Router {
    pub(crate) id: RouterId,
    pub(crate) name: String,
    pub(crate) tag: String,
    pub(crate) description: String,
    /// Prefix this router was mounted at (empty until mounted)
    pub(crate) prefix: String,
    /// Node new registrations start from: the router's own root until it is
    /// mounted, the junction node afterwards
    pub(crate) node: NodeId,
    pub(crate) routes: Vec<RouteId>,
    pub(crate) children: Vec<RouterId>,
    pub(crate) parent: Option<RouterId>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) responses: Responses,
}

impl Router {
    #[must_use]
    pub fn id(&self) -> RouterId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documentation tag; defaults to the router name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn parent(&self) -> Option<RouterId> {
        self.parent
    }

    /// Routes registered directly on this router, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteId] {
        &self.routes
    }

    /// Routers mounted on this one, in mount order.
    #[must_use]
    pub fn children(&self) -> &[RouterId] {
        &self.children
    }

    #[must_use]
    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    pub fn add_response(&mut self, status: u16, doc: super::route::ResponseDoc) {
        self.responses.insert(status, doc);
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// Configuration-time owner of every router, route and node.
///
/// Not `Sync`-safe for mutation: registration and mounting are expected to
/// run on one thread before serving starts. [`Registry::freeze`] turns it
/// into an immutable [`RouteTable`].
#[derive(Clone, Default)]
pub struct Registry {
    tree: RadixTree,
    routers: Vec<Router>,
    routes: Vec<Route>,
    sink: Option<Dispatch>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope every event this registry emits to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Dispatch) -> Self {
        self.sink = Some(sink);
        self
    }

    pub(crate) fn set_sink(&mut self, sink: Option<Dispatch>) {
        self.sink = sink;
    }

    /// Create a detached router with its own empty subtree.
    pub fn add_router(&mut self, name: &str) -> RouterId {
        let id = RouterId(self.routers.len());
        let node = self.tree.alloc_root();
        self.routers.push(Router {
            id,
            name: name.to_string(),
            tag: name.to_string(),
            description: String::new(),
            prefix: String::new(),
            node,
            routes: Vec::new(),
            children: Vec::new(),
            parent: None,
            middlewares: Vec::new(),
            responses: Responses::new(),
        });
        scoped(self.sink.as_ref(), || {
            debug!(router = %name, router_id = id.0, "Router created");
        });
        id
    }

    pub fn router(&self, id: RouterId) -> Result<&Router, ConfigError> {
        self.routers
            .get(id.0)
            .ok_or(ConfigError::UnknownRouter { index: id.0 })
    }

    pub fn router_mut(&mut self, id: RouterId) -> Result<&mut Router, ConfigError> {
        self.routers
            .get_mut(id.0)
            .ok_or(ConfigError::UnknownRouter { index: id.0 })
    }

    /// First router with this name, in creation order.
    #[must_use]
    pub fn find_router(&self, name: &str) -> Option<RouterId> {
        self.routers.iter().find(|r| r.name == name).map(|r| r.id)
    }

    pub fn route(&self, id: RouteId) -> Result<&Route, ConfigError> {
        self.routes.get(id.index()).ok_or(ConfigError::UnknownRoute {
            index: id.index(),
        })
    }

    pub fn route_mut(&mut self, id: RouteId) -> Result<&mut Route, ConfigError> {
        self.routes
            .get_mut(id.index())
            .ok_or(ConfigError::UnknownRoute { index: id.index() })
    }

    #[must_use]
    pub fn tree(&self) -> &RadixTree {
        &self.tree
    }

    /// Bind `handler` for `method` at `path`, relative to `router`.
    ///
    /// Missing nodes are created on the way down. Any error leaves the tree
    /// exactly as it was.
    pub fn register(
        &mut self,
        router: RouterId,
        method: Method,
        path: &str,
        fields: Arc<FieldSchema>,
        handler: Arc<dyn Handler>,
    ) -> Result<RouteId, ConfigError> {
        let start = self.router(router)?.node;
        let segs = segments(path);
        validate_pattern(path, &segs, false)?;

        if let Some(node) = self.tree.find_path(start, &segs) {
            if self.tree.node(node).route(&method).is_some() {
                return Err(ConfigError::DuplicateMethod {
                    method,
                    path: path.to_string(),
                    existing: self.tree.pattern(node),
                });
            }
        }

        let node = self.tree.ensure_path(start, &segs)?;
        let id = RouteId::from_index(self.routes.len());
        if self.tree.bind(node, method.clone(), id).is_err() {
            return Err(ConfigError::DuplicateMethod {
                method,
                path: path.to_string(),
                existing: self.tree.pattern(node),
            });
        }

        self.routes.push(Route {
            id,
            method: method.clone(),
            path: path.to_string(),
            router,
            full_path: OnceLock::new(),
            handler,
            fields,
            description: String::new(),
            responses: Responses::new(),
            effective_responses: Responses::new(),
            middlewares: Vec::new(),
        });
        self.routers[router.0].routes.push(id);

        let sink = self.sink.as_ref();
        let router_name = &self.routers[router.0].name;
        scoped(sink, || {
            info!(
                router = %router_name,
                method = %method,
                path = %path,
                route_id = id.index(),
                "Route registered"
            );
        });
        Ok(id)
    }

    /// Splice `sub`'s subtree into `router`'s tree at `prefix`.
    ///
    /// Every precondition and conflict is checked before anything moves, so a
    /// failed mount leaves both trees and both routers untouched.
    pub fn mount(&mut self, router: RouterId, prefix: &str, sub: RouterId) -> Result<(), ConfigError> {
        let start = self.router(router)?.node;
        let sub_root = self.router(sub)?.node;

        if prefix.is_empty() || !prefix.starts_with('/') {
            return Err(ConfigError::InvalidMountPrefix {
                prefix: prefix.to_string(),
            });
        }
        if router == sub {
            return Err(ConfigError::SelfMount {
                router: self.routers[router.0].name.clone(),
            });
        }
        if let Some(parent) = self.routers[sub.0].parent {
            return Err(ConfigError::AlreadyMounted {
                router: self.routers[sub.0].name.clone(),
                parent: self.routers[parent.0].name.clone(),
            });
        }
        if self.ancestors(router).any(|a| a == sub) {
            return Err(ConfigError::MountCycle {
                router: self.routers[router.0].name.clone(),
                sub: self.routers[sub.0].name.clone(),
            });
        }

        let segs = segments(prefix);
        validate_pattern(prefix, &segs, true)?;
        self.tree.probe_path(start, &segs)?;

        if let Some(junction) = self.tree.find_path(start, &segs) {
            if let Some(conflict) = self.tree.splice_conflict(sub_root, junction) {
                return Err(self.splice_error(junction, conflict));
            }
        }

        let junction = self.tree.ensure_path(start, &segs)?;
        self.tree.splice(sub_root, junction);

        // Routers mounted at `/` on `sub` shared its root node
        for r in &mut self.routers {
            if r.node == sub_root {
                r.node = junction;
            }
        }
        let mounted = &mut self.routers[sub.0];
        mounted.prefix = prefix.to_string();
        mounted.parent = Some(router);
        self.routers[router.0].children.push(sub);

        let sink = self.sink.as_ref();
        let parent_name = &self.routers[router.0].name;
        let sub_name = &self.routers[sub.0].name;
        let pattern = self.tree.pattern(junction);
        scoped(sink, || {
            info!(
                router = %parent_name,
                sub_router = %sub_name,
                prefix = %prefix,
                junction = %pattern,
                "Router mounted"
            );
        });
        Ok(())
    }

    fn splice_error(&self, junction: NodeId, conflict: SpliceConflict) -> ConfigError {
        match conflict {
            SpliceConflict::Segment { existing, incoming } => ConfigError::ConflictingSegment {
                parent: self.tree.pattern(junction),
                segment: self.segment_text(incoming),
                existing: self.segment_text(existing),
            },
            SpliceConflict::Method {
                method, incoming, ..
            } => ConfigError::DuplicateMethod {
                method,
                path: self
                    .routes
                    .get(incoming.index())
                    .map(|r| r.path.clone())
                    .unwrap_or_default(),
                existing: self.tree.pattern(junction),
            },
        }
    }

    fn segment_text(&self, node: NodeId) -> String {
        self.tree
            .node(node)
            .segment()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Parent chain of `router`, nearest first, excluding `router` itself.
    pub fn ancestors(&self, router: RouterId) -> impl Iterator<Item = RouterId> + '_ {
        std::iter::successors(
            self.routers.get(router.0).and_then(|r| r.parent),
            move |id| self.routers.get(id.0).and_then(|r| r.parent),
        )
    }

    /// `router` followed by its ancestors up to the outermost one, reversed
    /// so the outermost comes first.
    fn lineage(&self, router: RouterId) -> Vec<RouterId> {
        let mut chain: Vec<RouterId> = std::iter::once(router).chain(self.ancestors(router)).collect();
        chain.reverse();
        chain
    }

    /// Every route reachable from `router`: its own routes in registration
    /// order, then each mounted router's, depth first.
    pub fn all_routes(&self, router: RouterId) -> Result<Vec<RouteId>, ConfigError> {
        self.router(router)?;
        let mut out = Vec::new();
        let mut stack = vec![router];
        while let Some(id) = stack.pop() {
            let r = &self.routers[id.0];
            out.extend_from_slice(&r.routes);
            stack.extend(r.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Normalised full path of a route: every prefix from the outermost
    /// router down, then the local path.
    pub fn compute_full_path(&self, route: RouteId) -> Result<String, ConfigError> {
        let r = self.route(route)?;
        let mut segs: Vec<Segment> = Vec::new();
        for id in self.lineage(r.router) {
            segs.extend(segments(&self.routers[id.0].prefix));
        }
        segs.extend(segments(&r.path));
        Ok(join(&segs))
    }

    /// ASCII drawing of the subtree `router` dispatches through.
    pub fn render_tree(&self, router: RouterId) -> Result<String, ConfigError> {
        Ok(self.tree.render(self.router(router)?.node))
    }

    /// Resolve full paths, response overlays and middleware chains, validate
    /// field schemas, and hand the tree to an immutable [`RouteTable`]
    /// dispatching from `root`.
    ///
    /// Every problem found is reported, not just the first.
    pub fn freeze(mut self, root: RouterId) -> Result<RouteTable, ConfigErrors> {
        let root_router = self.router(root).map_err(ConfigErrors::from)?;
        if let Some(parent) = root_router.parent {
            return Err(ConfigError::RootMounted {
                router: root_router.name.clone(),
                parent: self.routers[parent.0].name.clone(),
            }
            .into());
        }
        let root_node = root_router.node;
        let mut errors = ConfigErrors::default();

        for idx in 0..self.routes.len() {
            let id = RouteId::from_index(idx);
            let full = match self.compute_full_path(id) {
                Ok(full) => full,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            let lineage = self.lineage(self.routes[idx].router);

            let mut effective = Responses::new();
            let mut chain: Vec<Arc<dyn Middleware>> = Vec::new();
            for rid in &lineage {
                let router = &self.routers[rid.0];
                effective.extend(router.responses.iter().map(|(k, v)| (*k, v.clone())));
                chain.extend(router.middlewares.iter().map(Arc::clone));
            }

            let route = &mut self.routes[idx];
            effective.extend(route.responses.iter().map(|(k, v)| (*k, v.clone())));
            route.effective_responses = effective;
            route.middlewares = chain;

            let declared = route.fields.path_count();
            let captured = segments(&full).iter().filter(|s| s.is_dynamic()).count();
            if declared > 0 && declared != captured {
                errors.push(ConfigError::PathFieldMismatch {
                    route: format!("{} {}", route.method, full),
                    declared,
                    captured,
                });
            }
            route.freeze_full_path(full);
        }

        let order = self.all_routes(root).map_err(ConfigErrors::from)?;
        let sink = self.sink.clone();

        scoped(sink.as_ref(), || {
            for router in &self.routers {
                let top = self.lineage(router.id).first().copied().unwrap_or(router.id);
                if top != root {
                    warn!(
                        router = %router.name,
                        routes_count = router.routes.len(),
                        "Router is not attached to the root router; its routes will not be served"
                    );
                }
            }
        });

        if !errors.is_empty() {
            scoped(sink.as_ref(), || {
                warn!(errors_count = errors.len(), "Route table rejected");
            });
            return Err(errors);
        }

        let routes: Vec<Arc<Route>> = self.routes.into_iter().map(Arc::new).collect();
        let summary: Vec<String> = order
            .iter()
            .take(10)
            .map(|id| routes[id.index()].to_string())
            .collect();
        scoped(sink.as_ref(), || {
            info!(
                routes_count = order.len(),
                routers_count = self.routers.len(),
                routes_summary = ?summary,
                "Route table frozen"
            );
        });

        Ok(RouteTable {
            tree: self.tree,
            root: root_node,
            routes,
            order,
            sink,
        })
    }
}

/// Reject `{}` and any wildcard that is not last (or, for a mount prefix,
/// any wildcard at all).
fn validate_pattern(path: &str, segs: &[Segment], is_prefix: bool) -> Result<(), ConfigError> {
    let last = segs.len().saturating_sub(1);
    for (i, seg) in segs.iter().enumerate() {
        match seg {
            Segment::Param(name) if name.is_empty() => {
                return Err(ConfigError::EmptyParamName {
                    path: path.to_string(),
                });
            }
            Segment::Wildcard(_) if is_prefix || i != last => {
                return Err(ConfigError::WildcardNotTrailing {
                    path: path.to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// A successful resolution: the selected route and its captured values.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Captured values in pattern order
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths (e.g., `/org/{id}/team/{team_id}/user/{id}`),
    /// returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Captured values alone, in pattern order.
    #[must_use]
    pub fn values(&self) -> SmallVec<[&str; MAX_INLINE_PARAMS]> {
        self.path_params.iter().map(|(_, v)| v.as_str()).collect()
    }
}

/// Outcome of resolving one `(method, path)` pair.
#[derive(Debug, Clone)]
pub enum Resolution {
    Matched(RouteMatch),
    /// No node for the path, or a node with nothing bound
    NotFound,
    /// The node exists but `method` is not bound there
    MethodNotAllowed {
        /// Methods bound at the node, comma separated
        allow: String,
    },
}

impl Resolution {
    /// HTTP status this outcome maps to when nothing else intervenes.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Resolution::Matched(_) => 200,
            Resolution::NotFound => 404,
            Resolution::MethodNotAllowed { .. } => 405,
        }
    }
}

/// Immutable routing tree produced by [`Registry::freeze`].
///
/// Holds no interior mutability, so it can be shared across threads behind
/// an `Arc` and read without locking.
pub struct RouteTable {
    tree: RadixTree,
    root: NodeId,
    routes: Vec<Arc<Route>>,
    order: Vec<RouteId>,
    sink: Option<Dispatch>,
}

impl RouteTable {
    /// Walk the tree for `path` and select the route bound for `method`.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        scoped(self.sink.as_ref(), || self.resolve_inner(method, path))
    }

    fn resolve_inner(&self, method: &Method, path: &str) -> Resolution {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let tokens = tokenize(path);
        let Some((node_id, params)) = self.tree.lookup(self.root, &tokens, method) else {
            warn!(
                method = %method,
                path = %path,
                duration_us = match_start.elapsed().as_micros(),
                "No route matched"
            );
            return Resolution::NotFound;
        };

        let node = self.tree.node(node_id);
        if !node.has_routes() {
            warn!(
                method = %method,
                path = %path,
                node = %self.tree.pattern(node_id),
                "No route bound at matched node"
            );
            return Resolution::NotFound;
        }

        let Some(route_id) = node.route(method) else {
            warn!(
                method = %method,
                path = %path,
                allow = %node.allow(),
                "Method not allowed"
            );
            return Resolution::MethodNotAllowed {
                allow: node.allow().to_string(),
            };
        };

        let Some(route) = self.routes.get(route_id.index()) else {
            warn!(route_id = route_id.index(), "Route missing from table");
            return Resolution::NotFound;
        };

        debug!(
            method = %method,
            path = %path,
            route_pattern = %route.full_path().unwrap_or_default(),
            path_params = ?params,
            duration_us = match_start.elapsed().as_micros(),
            "Route matched"
        );
        Resolution::Matched(RouteMatch {
            route: Arc::clone(route),
            path_params: params,
        })
    }

    /// Every route reachable from the root router, in enumeration order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> + '_ {
        self.order.iter().filter_map(|id| self.routes.get(id.index()))
    }

    #[must_use]
    pub fn route(&self, id: RouteId) -> Option<&Arc<Route>> {
        self.routes.get(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn render_tree(&self) -> String {
        self.tree.render(self.root)
    }

    pub(crate) fn sink(&self) -> Option<&Dispatch> {
        self.sink.as_ref()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("nodes", &self.tree.len())
            .field("routes", &self.order.len())
            .finish_non_exhaustive()
    }
}
