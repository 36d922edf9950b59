//! Typed handlers.
//!
//! [`typed`] wraps a function over a `serde` input type so it can be
//! registered like any other [`Handler`]. The bound input value is
//! deserialized into the function's request type (400 when that fails) and
//! its return value is serialized as a 200 JSON response.

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{error, warn};

use crate::dispatcher::{Handler, HandlerRequest, HandlerResponse};
use crate::ids::RequestId;
use crate::router::ParamVec;

/// Request passed to a typed handler.
#[derive(Debug, Clone)]
pub struct TypedHandlerRequest<T> {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    /// Matched pattern
    pub route_path: String,
    pub path_params: ParamVec,
    pub data: T,
}

impl<T> TypedHandlerRequest<T> {
    /// Build from a dispatched request, deserializing its bound input.
    pub fn from_request(req: &HandlerRequest) -> Result<Self, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        let data = T::deserialize(&req.input)?;
        Ok(Self {
            request_id: req.request_id,
            method: req.method.clone(),
            path: req.path.clone(),
            route_path: req.route_path().to_string(),
            path_params: req.path_params.clone(),
            data,
        })
    }
}

/// Adapter produced by [`typed`].
pub struct Typed<F, TReq, TRes> {
    f: F,
    _types: PhantomData<fn(TReq) -> TRes>,
}

/// Wrap `f` as a [`Handler`].
pub fn typed<TReq, TRes, F>(f: F) -> Typed<F, TReq, TRes>
where
    F: Fn(TypedHandlerRequest<TReq>) -> TRes + Send + Sync,
    TReq: DeserializeOwned,
    TRes: Serialize,
{
    Typed {
        f,
        _types: PhantomData,
    }
}

impl<F, TReq, TRes> Handler for Typed<F, TReq, TRes>
where
    F: Fn(TypedHandlerRequest<TReq>) -> TRes + Send + Sync,
    TReq: DeserializeOwned,
    TRes: Serialize,
{
    fn handle(&self, req: &HandlerRequest) -> HandlerResponse {
        let typed_req = match TypedHandlerRequest::<TReq>::from_request(req) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    request_id = %req.request_id,
                    route = %req.route_path(),
                    error = %e,
                    "Input does not match handler type"
                );
                return HandlerResponse::error(400, &format!("invalid input: {e}"));
            }
        };

        match serde_json::to_value((self.f)(typed_req)) {
            Ok(body) => HandlerResponse::json(200, body),
            Err(e) => {
                error!(
                    request_id = %req.request_id,
                    route = %req.route_path(),
                    error = %e,
                    "Handler output could not be serialized"
                );
                HandlerResponse::error(500, "response serialization failed")
            }
        }
    }
}
