use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::{Arc, OnceLock};

use super::core::RouterId;
use super::segment::{segments, Segment};
use crate::dispatcher::Handler;
use crate::fields::FieldSchema;
use crate::middleware::Middleware;

/// Handle to a registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(usize);

impl RouteId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// Documentation for one response status of a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseDoc {
    #[serde(default)]
    pub description: String,
    /// Optional JSON Schema of the response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ResponseDoc {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            schema: None,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Status code to response documentation.
pub type Responses = BTreeMap<u16, ResponseDoc>;

/// A single `(method, path) -> handler` binding.
///
/// The full path is only known once every mount above the owning router has
/// happened, so it is filled in exactly once when the app is frozen and
/// reported as `None` before that.
#[derive(Clone)]
pub struct Route {
    pub(crate) id: RouteId,
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) router: RouterId,
    pub(crate) full_path: OnceLock<String>,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) fields: Arc<FieldSchema>,
    pub(crate) description: String,
    /// Entries declared on the route itself
    pub(crate) responses: Responses,
    /// Router responses overlaid with the route's own, filled at freeze
    pub(crate) effective_responses: Responses,
    /// Middleware of every router from the root down, filled at freeze
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
}

impl Route {
    #[must_use]
    pub fn id(&self) -> RouteId {
        self.id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path as passed to registration, relative to the owning router.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn router(&self) -> RouterId {
        self.router
    }

    /// Every router prefix from the root down plus the local path.
    #[must_use]
    pub fn full_path(&self) -> Option<&str> {
        self.full_path.get().map(String::as_str)
    }

    /// Record the full path. Returns `false` if it was already set.
    pub(crate) fn freeze_full_path(&self, full: String) -> bool {
        self.full_path.set(full).is_ok()
    }

    #[must_use]
    pub fn fields(&self) -> &FieldSchema {
        &self.fields
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Responses documented directly on this route.
    #[must_use]
    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    /// Responses after overlaying every enclosing router. Empty until frozen.
    #[must_use]
    pub fn effective_responses(&self) -> &Responses {
        &self.effective_responses
    }

    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    /// Names of the dynamic segments, in pattern order.
    #[must_use]
    pub fn param_names(&self) -> Vec<Arc<str>> {
        let path = self.full_path().unwrap_or(&self.path);
        segments(path)
            .iter()
            .filter_map(Segment::capture_name)
            .collect()
    }

    /// Stable identifier: hex encoding of the method followed by the full path.
    #[must_use]
    pub fn operation_id(&self) -> String {
        let path = self.full_path().unwrap_or(&self.path);
        let mut out = String::with_capacity((self.method.as_str().len() + path.len()) * 2);
        for byte in self.method.as_str().bytes().chain(path.bytes()) {
            write!(out, "{byte:02x}").ok();
        }
        out
    }

    /// Attach a description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Document one response status.
    pub fn with_response(&mut self, status: u16, doc: ResponseDoc) -> &mut Self {
        self.responses.insert(status, doc);
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("full_path", &self.full_path.get())
            .field("router", &self.router)
            .field("fields", &self.fields.len())
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.full_path().unwrap_or(&self.path))
    }
}
