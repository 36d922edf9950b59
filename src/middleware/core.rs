use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Hooks run around a route's handler.
///
/// A route's chain is every middleware registered on the routers enclosing
/// it, outermost router first, fixed when the app is frozen. `before` hooks
/// run in chain order and the first one returning a response skips the
/// remaining `before` hooks and the handler. Every `after` hook runs, in
/// chain order, on whatever response was produced.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}
