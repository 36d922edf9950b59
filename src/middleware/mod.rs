//! Request middleware.
//!
//! Middleware is attached to routers, not to the dispatcher: a route runs the
//! chain of every router above it. See [`Middleware`] for ordering.

mod core;
mod tracing;

pub use core::Middleware;
pub use tracing::TracingMiddleware;
