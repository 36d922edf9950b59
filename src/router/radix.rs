//! Segment trie used for route matching.
//!
//! Nodes live in a single arena ([`RadixTree`]) and refer to each other by
//! [`NodeId`]. A node exclusively owns its children (each id appears in
//! exactly one `children` list); the `parent` link is a plain back-reference
//! used to rebuild patterns for logs, errors and rendering.
//!
//! ## Sibling rules
//!
//! Under any node:
//! - static children have pairwise-distinct text
//! - there is at most one parameter child
//! - there is at most one wildcard child
//!
//! These are checked whenever a child is created or moved in, so the lookup
//! below never has to break a tie.
//!
//! ## Lookup
//!
//! For each request segment the walk tries, in order, an exact static child,
//! the parameter child, then the wildcard child (which swallows the rest of
//! the path). Once a candidate is taken the walk never goes back to try
//! another branch.

use http::Method;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use super::core::ParamVec;
use super::route::RouteId;
use super::segment::{join, PathTokens, Segment, SegmentKind};
use crate::error::ConfigError;

/// Handle to a node in a [`RadixTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One vertex of the routing trie.
#[derive(Debug, Clone)]
pub struct Node {
    /// `None` for the root of a router's subtree
    segment: Option<Segment>,
    parent: Option<NodeId>,
    /// All children in insertion order
    children: Vec<NodeId>,
    /// Cached index of the single parameter child
    param: Option<NodeId>,
    /// Cached index of the single wildcard child
    wildcard: Option<NodeId>,
    /// Routes terminating exactly here
    routes: HashMap<Method, RouteId>,
    /// Methods in `routes`, in registration order
    methods: Vec<Method>,
    /// `methods` joined for the `Allow` header
    allow: String,
}

impl Node {
    fn new(segment: Option<Segment>, parent: Option<NodeId>) -> Self {
        Self {
            segment,
            parent,
            children: Vec::new(),
            param: None,
            wildcard: None,
            routes: HashMap::new(),
            methods: Vec::new(),
            allow: String::new(),
        }
    }

    #[must_use]
    pub fn segment(&self) -> Option<&Segment> {
        self.segment.as_ref()
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Route bound for `method` at this node, if any.
    #[must_use]
    pub fn route(&self, method: &Method) -> Option<RouteId> {
        self.routes.get(method).copied()
    }

    /// Methods bound at this node, in registration order.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Pre-joined `Allow` header value (`GET, POST`).
    #[must_use]
    pub fn allow(&self) -> &str {
        &self.allow
    }

    #[must_use]
    pub fn has_routes(&self) -> bool {
        !self.routes.is_empty()
    }

    fn refresh_allow(&mut self) {
        self.allow = self
            .methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
    }
}

/// Conflict found while checking a splice before any node is moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SpliceConflict {
    /// A moved child collides with an existing child of the junction.
    Segment { existing: NodeId, incoming: NodeId },
    /// Both roots bind the same method.
    Method {
        method: Method,
        existing: RouteId,
        incoming: RouteId,
    },
}

/// Arena holding every node of every router.
#[derive(Debug, Clone, Default)]
pub struct RadixTree {
    nodes: Vec<Node>,
}

impl RadixTree {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Allocate a detached root node.
    pub fn alloc_root(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(None, None));
        id
    }

    /// Number of nodes ever allocated (including emptied splice sources).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Normalised pattern from the tree root down to `id` (`/api/{id}`).
    #[must_use]
    pub fn pattern(&self, id: NodeId) -> String {
        let mut segs = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            let node = self.node(n);
            if let Some(seg) = &node.segment {
                segs.push(seg.clone());
            }
            current = node.parent;
        }
        segs.reverse();
        join(&segs)
    }

    /// Child of `parent` with exactly this kind and text.
    #[must_use]
    pub fn find_child(&self, parent: NodeId, segment: &Segment) -> Option<NodeId> {
        let node = self.node(parent);
        match segment.kind() {
            SegmentKind::Param => node
                .param
                .filter(|c| self.node(*c).segment.as_ref() == Some(segment)),
            SegmentKind::Wildcard => node
                .wildcard
                .filter(|c| self.node(*c).segment.as_ref() == Some(segment)),
            SegmentKind::Static => node
                .children
                .iter()
                .copied()
                .find(|c| self.node(*c).segment.as_ref() == Some(segment)),
        }
    }

    /// Node reached by following `segments` exactly, without creating any.
    #[must_use]
    pub fn find_path(&self, root: NodeId, segments: &[Segment]) -> Option<NodeId> {
        segments
            .iter()
            .try_fold(root, |current, seg| self.find_child(current, seg))
    }

    /// Existing sibling that would make adding `segment` under `parent`
    /// ambiguous, if any.
    fn occupant(&self, parent: NodeId, segment: &Segment) -> Option<NodeId> {
        let node = self.node(parent);
        match segment.kind() {
            SegmentKind::Param => node.param,
            SegmentKind::Wildcard => node.wildcard,
            SegmentKind::Static => self.find_child(parent, segment),
        }
    }

    fn conflict(&self, parent: NodeId, segment: &Segment, existing: NodeId) -> ConfigError {
        ConfigError::ConflictingSegment {
            parent: self.pattern(parent),
            segment: segment.to_string(),
            existing: self
                .node(existing)
                .segment
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }

    /// Create a new child, enforcing the sibling rules.
    pub fn add_child(&mut self, parent: NodeId, segment: Segment) -> Result<NodeId, ConfigError> {
        if let Some(existing) = self.occupant(parent, &segment) {
            return Err(self.conflict(parent, &segment, existing));
        }
        let id = NodeId(self.nodes.len());
        let kind = segment.kind();
        self.nodes.push(Node::new(Some(segment), Some(parent)));
        self.attach(parent, id, kind);
        Ok(id)
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, kind: SegmentKind) {
        let node = self.node_mut(parent);
        node.children.push(child);
        match kind {
            SegmentKind::Param => node.param = Some(child),
            SegmentKind::Wildcard => node.wildcard = Some(child),
            SegmentKind::Static => {}
        }
    }

    /// Check that `segments` can be walked or created below `root` without
    /// breaking a sibling rule. Nothing is modified.
    pub fn probe_path(&self, root: NodeId, segments: &[Segment]) -> Result<(), ConfigError> {
        let mut current = root;
        for seg in segments {
            match self.find_child(current, seg) {
                Some(child) => current = child,
                None => {
                    if let Some(existing) = self.occupant(current, seg) {
                        return Err(self.conflict(current, seg, existing));
                    }
                    // Everything below a fresh node is fresh too
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Walk `segments` from `root`, creating missing nodes, and return the
    /// terminal node. Fails without modifying the tree.
    pub fn ensure_path(&mut self, root: NodeId, segments: &[Segment]) -> Result<NodeId, ConfigError> {
        self.probe_path(root, segments)?;
        let mut current = root;
        for seg in segments {
            current = match self.find_child(current, seg) {
                Some(child) => child,
                None => self.add_child(current, seg.clone())?,
            };
        }
        Ok(current)
    }

    /// Bind `route` for `method` at `node`. On collision returns the route
    /// already bound there.
    pub fn bind(&mut self, node: NodeId, method: Method, route: RouteId) -> Result<(), RouteId> {
        let n = self.node_mut(node);
        if let Some(existing) = n.routes.get(&method) {
            return Err(*existing);
        }
        n.routes.insert(method.clone(), route);
        n.methods.push(method);
        n.refresh_allow();
        Ok(())
    }

    /// First reason the contents of `from` cannot be moved onto `onto`.
    pub(crate) fn splice_conflict(&self, from: NodeId, onto: NodeId) -> Option<SpliceConflict> {
        for &child in &self.node(from).children {
            let Some(seg) = self.node(child).segment.as_ref() else {
                continue;
            };
            if let Some(existing) = self.occupant(onto, seg) {
                return Some(SpliceConflict::Segment {
                    existing,
                    incoming: child,
                });
            }
        }
        let source = self.node(from);
        let target = self.node(onto);
        for method in &source.methods {
            if let (Some(existing), Some(incoming)) =
                (target.routes.get(method), source.routes.get(method))
            {
                return Some(SpliceConflict::Method {
                    method: method.clone(),
                    existing: *existing,
                    incoming: *incoming,
                });
            }
        }
        None
    }

    /// Move every child and route of `from` onto `onto`. Children keep their
    /// identity; only their parent link changes. `from` is left empty.
    ///
    /// Callers must have checked [`splice_conflict`](Self::splice_conflict).
    pub(crate) fn splice(&mut self, from: NodeId, onto: NodeId) {
        let moved = std::mem::take(&mut self.node_mut(from).children);
        for child in moved {
            let kind = self
                .node(child)
                .segment
                .as_ref()
                .map_or(SegmentKind::Static, Segment::kind);
            self.node_mut(child).parent = Some(onto);
            self.attach(onto, child, kind);
        }

        let source = self.node_mut(from);
        source.param = None;
        source.wildcard = None;
        let methods = std::mem::take(&mut source.methods);
        let mut routes = std::mem::take(&mut source.routes);
        source.refresh_allow();

        let target = self.node_mut(onto);
        for method in methods {
            if let Some(route) = routes.remove(&method) {
                target.routes.insert(method.clone(), route);
                target.methods.push(method);
            }
        }
        target.refresh_allow();
    }

    /// Walk the tree for one request path.
    ///
    /// Returns the landing node and the captured values in the order their
    /// segments appear in the pattern, or `None` when some segment has no
    /// candidate child. `method` only steers the empty-remainder wildcard
    /// case: a trailing wildcard that binds it wins over a landing node that
    /// does not.
    #[must_use]
    pub fn lookup(
        &self,
        root: NodeId,
        tokens: &PathTokens<'_>,
        method: &Method,
    ) -> Option<(NodeId, ParamVec)> {
        let mut current = root;
        let mut params = ParamVec::new();

        let mut idx = 0;
        while let Some(text) = tokens.text(idx) {
            let node = self.node(current);

            let static_hit = node.children.iter().copied().find(|c| {
                matches!(&self.node(*c).segment, Some(Segment::Static(s)) if s.as_ref() == text)
            });

            if let Some(child) = static_hit {
                current = child;
            } else if let Some(child) = node.param {
                self.capture(child, text, &mut params);
                current = child;
            } else if let Some(child) = node.wildcard {
                self.capture(child, tokens.remainder_from(idx), &mut params);
                return Some((child, params));
            } else {
                return None;
            }
            idx += 1;
        }

        // Path exhausted: an empty remainder still satisfies a trailing
        // wildcard unless the landing node itself serves the method.
        let node = self.node(current);
        if let Some(child) = node.wildcard {
            let descend = !node.has_routes()
                || (node.route(method).is_none() && self.node(child).route(method).is_some());
            if descend {
                self.capture(child, "", &mut params);
                current = child;
            }
        }
        Some((current, params))
    }

    fn capture(&self, child: NodeId, value: &str, params: &mut ParamVec) {
        let name = self
            .node(child)
            .segment
            .as_ref()
            .and_then(Segment::capture_name)
            .unwrap_or_else(|| Arc::from("*"));
        params.push((name, value.to_string()));
    }

    /// ASCII rendering of the subtree under `root`, one node per line.
    #[must_use]
    pub fn render(&self, root: NodeId) -> String {
        let mut out = String::new();
        let node = self.node(root);
        let label = node
            .segment
            .as_ref()
            .map_or_else(|| "/".to_string(), ToString::to_string);
        Self::render_line(&mut out, "", &label, node);
        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            self.render_node(&mut out, *child, "", i + 1 == count);
        }
        out
    }

    fn render_node(&self, out: &mut String, id: NodeId, prefix: &str, is_last: bool) {
        let node = self.node(id);
        let branch = if is_last { "└── " } else { "├── " };
        let label = node
            .segment
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        Self::render_line(out, &format!("{prefix}{branch}"), &label, node);

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            self.render_node(out, *child, &child_prefix, i + 1 == count);
        }
    }

    fn render_line(out: &mut String, lead: &str, label: &str, node: &Node) {
        if node.methods.is_empty() {
            writeln!(out, "{lead}{label}").ok();
        } else {
            writeln!(out, "{lead}{label} | Methods: [{}]", node.allow).ok();
        }
    }
}
