//! Dispatcher core module - hot path for request dispatch.

use http::header::{HeaderName, HeaderValue, COOKIE};
use http::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::fields::{Binder, SchemaBinder};
use crate::ids::RequestId;
use crate::logging::scoped;
use crate::router::{ParamVec, Resolution, Route, RouteMatch, RouteTable};

/// Maximum inline headers/cookies before heap allocation
/// Most requests have ≤16 headers
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header and cookie storage for the hot path.
///
/// Names are `Arc<str>`; values are per-request `String`s.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Everything a handler sees about one dispatched request.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Request path as received
    pub path: String,
    /// The selected route (its full path is the matched pattern)
    pub route: Arc<Route>,
    /// Captured path values, in pattern order
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    /// Header names are lowercase
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    /// Request body parsed as JSON (if present and valid)
    pub body: Option<Value>,
    /// Output of the binder for this route
    pub input: Value,
}

impl HandlerRequest {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths, returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Matched pattern (`/users/{id}`).
    #[must_use]
    pub fn route_path(&self) -> &str {
        self.route.full_path().unwrap_or_else(|| self.route.path())
    }

    /// Note: This allocates - use get_path_param() in hot paths
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Note: This allocates - use get_query_param() in hot paths
    #[must_use]
    pub fn query_params_map(&self) -> HashMap<String, String> {
        self.query_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Status, headers and JSON body produced for a request.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Convert into an `http::Response` with a serialized JSON body.
    ///
    /// A `null` body becomes an empty body; headers that are not valid HTTP
    /// are dropped.
    #[must_use]
    pub fn into_http(self) -> Response<Vec<u8>> {
        let body = if self.body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&self.body).unwrap_or_default()
        };
        let mut resp = Response::new(body);
        *resp.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in &self.headers {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                resp.headers_mut().append(n, v);
            }
        }
        resp
    }
}

/// Request handler bound to a route.
pub trait Handler: Send + Sync {
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse;
}

impl<F> Handler for F
where
    F: Fn(&HandlerRequest) -> HandlerResponse + Send + Sync,
{
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse {
        self(req)
    }
}

/// Serving handle over a frozen route table.
///
/// Cheap to clone and safe to share across threads: every clone reads the
/// same immutable table.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    binder: Arc<dyn Binder>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: RouteTable) -> Self {
        Self::with_binder(table, Arc::new(SchemaBinder))
    }

    #[must_use]
    pub fn with_binder(table: RouteTable, binder: Arc<dyn Binder>) -> Self {
        Self {
            table: Arc::new(table),
            binder,
        }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Route selection only; no binding, middleware or handler.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        self.table.resolve(method, path)
    }

    /// Every served route, in enumeration order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> + '_ {
        self.table.routes()
    }

    #[must_use]
    pub fn render_tree(&self) -> String {
        self.table.render_tree()
    }

    /// Run the full pipeline for one request: resolve, bind, middleware
    /// `before` hooks, handler, middleware `after` hooks.
    ///
    /// Routing misses become 404, method mismatches 405 with `Allow`, and
    /// binding failures 400. Handler panics are not caught.
    #[must_use]
    pub fn dispatch(&self, request: Request<Vec<u8>>) -> HandlerResponse {
        scoped(self.table.sink(), || self.dispatch_inner(request))
    }

    fn dispatch_inner(&self, request: Request<Vec<u8>>) -> HandlerResponse {
        let request_id = RequestId::from_header_or_new(
            request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let route_match = match self.table.resolve(&method, &path) {
            Resolution::Matched(m) => m,
            Resolution::NotFound => {
                let mut resp = HandlerResponse::error(404, "Not Found");
                resp.set_header(REQUEST_ID_HEADER, request_id.to_string());
                return resp;
            }
            Resolution::MethodNotAllowed { allow } => {
                let mut resp = HandlerResponse::error(405, "Method Not Allowed");
                resp.set_header("allow", allow);
                resp.set_header(REQUEST_ID_HEADER, request_id.to_string());
                return resp;
            }
        };

        let input = match self
            .binder
            .bind(&route_match.route, &route_match.path_params, &request)
        {
            Ok(input) => input,
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    field = %e.field,
                    error = %e,
                    "Request input could not be bound"
                );
                let mut resp = HandlerResponse::json(
                    400,
                    serde_json::json!({ "error": e.message, "field": e.field }),
                );
                resp.set_header(REQUEST_ID_HEADER, request_id.to_string());
                return resp;
            }
        };

        let req = build_request(request_id, request, route_match, input);
        let mut resp = run_route(&req);
        resp.set_header(REQUEST_ID_HEADER, request_id.to_string());
        resp
    }
}

fn build_request(
    request_id: RequestId,
    request: Request<Vec<u8>>,
    route_match: RouteMatch,
    input: Value,
) -> HandlerRequest {
    let (parts, body) = request.into_parts();

    let mut query_params = ParamVec::new();
    if let Some(q) = parts.uri.query() {
        for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
            query_params.push((Arc::from(k.as_ref()), v.into_owned()));
        }
    }

    let mut headers = HeaderVec::new();
    let mut cookies = HeaderVec::new();
    for (name, value) in &parts.headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        if name == COOKIE {
            for pair in value.split(';') {
                if let Some((k, v)) = pair.trim().split_once('=') {
                    cookies.push((Arc::from(k), v.to_string()));
                }
            }
        }
        headers.push((Arc::from(name.as_str()), value.to_string()));
    }

    let body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };

    HandlerRequest {
        request_id,
        method: parts.method,
        path: parts.uri.path().to_string(),
        route: route_match.route,
        path_params: route_match.path_params,
        query_params,
        headers,
        cookies,
        body,
        input,
    }
}

/// Middleware `before` hooks, handler, then every `after` hook.
fn run_route(req: &HandlerRequest) -> HandlerResponse {
    let route = &req.route;
    let middleware_count = route.middlewares.len();

    debug!(
        request_id = %req.request_id,
        middleware_count = middleware_count,
        "Middleware before execution"
    );

    let mut early_resp: Option<HandlerResponse> = None;
    for (idx, mw) in route.middlewares.iter().enumerate() {
        early_resp = mw.before(req);
        if early_resp.is_some() {
            debug!(
                request_id = %req.request_id,
                middleware_idx = idx,
                middleware_name = std::any::type_name_of_val(mw.as_ref()),
                "Middleware returned early response"
            );
            break;
        }
    }

    let (mut resp, latency) = if let Some(r) = early_resp {
        (r, Duration::from_millis(0))
    } else {
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            route = %req.route_path(),
            "Request dispatched to handler"
        );
        let start = Instant::now();
        let r = route.handler.handle(req);
        (r, start.elapsed())
    };

    debug!(
        request_id = %req.request_id,
        middleware_count = middleware_count,
        response_status = resp.status,
        latency_ms = latency.as_millis() as u64,
        "Middleware after execution"
    );

    for mw in &route.middlewares {
        mw.after(req, &mut resp, latency);
    }
    resp
}
