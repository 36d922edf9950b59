use std::time::Duration;

use tracing::{debug, info, info_span, warn, Span};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Logs the start and completion of every request under a `request` span.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

fn request_span(req: &HandlerRequest) -> Span {
    info_span!(
        "request",
        request_id = %req.request_id,
        method = %req.method,
        route = %req.route_path()
    )
}

impl Middleware for TracingMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        let _enter = request_span(req).entered();
        debug!(path = %req.path, "Request started");
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        let _enter = request_span(req).entered();
        let latency_ms = latency.as_millis() as u64;
        if res.status >= 500 {
            warn!(status = res.status, latency_ms, path = %req.path, "Request failed");
        } else {
            info!(status = res.status, latency_ms, path = %req.path, "Request completed");
        }
    }
}
