use serde_json::{json, Map, Value};

use crate::dispatcher::{Handler, HandlerRequest, HandlerResponse};

/// Handler that reports what the router resolved instead of doing any work.
///
/// Used for routes built from a manifest, where no real handler exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl Handler for EchoHandler {
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse {
        HandlerResponse::json(200, echo_body(req))
    }
}

/// JSON description of a dispatched request.
#[must_use]
pub fn echo_body(req: &HandlerRequest) -> Value {
    let params: Map<String, Value> = req
        .path_params
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
        .collect();
    json!({
        "request_id": req.request_id,
        "operation_id": req.route.operation_id(),
        "method": req.method.as_str(),
        "path": req.path,
        "route": req.route_path(),
        "params": params,
        "input": req.input,
    })
}
