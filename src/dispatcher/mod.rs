//! # Dispatcher Module
//!
//! Turns an inbound `http::Request` into a [`HandlerResponse`] using a frozen
//! route table.
//!
//! ## Request Flow
//!
//! 1. The path is tokenized and the tree walked once ([`Dispatcher::resolve`])
//! 2. A miss returns 404; a node without the method returns 405 with `Allow`
//! 3. The route's binder materialises the input value (failure: 400)
//! 4. Middleware `before` hooks run, outermost router first; the first one
//!    that returns a response short-circuits the handler
//! 5. The handler runs, then every middleware `after` hook
//!
//! The dispatcher keeps no per-request state beyond the call itself, so a
//! single instance (or any number of clones) can serve from many threads.
//! Handler panics propagate to the caller.

mod core;

pub use core::{
    Dispatcher, Handler, HandlerRequest, HandlerResponse, HeaderVec, MAX_INLINE_HEADERS,
    REQUEST_ID_HEADER,
};
