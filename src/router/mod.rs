//! # Router Module
//!
//! Segment-trie routing: route registration, router composition and request
//! resolution.
//!
//! ## Overview
//!
//! - [`segment`] splits paths into classified segments. Registration and
//!   dispatch share it, so both always agree on how a path splits.
//! - [`radix`] is the node arena. Each node owns its children, a method map
//!   and a cached `Allow` value.
//! - [`core`](self::core) holds the [`Registry`] that builds the tree and the
//!   frozen [`RouteTable`] that serves lookups.
//!
//! ## Lifecycle
//!
//! 1. **Configuration**: routes are registered on routers and routers are
//!    mounted on each other. Mounting moves the sub-router's nodes into the
//!    parent's tree at the prefix; nothing is copied.
//! 2. **Freeze**: full paths, response overlays and middleware chains are
//!    resolved once, then the tree becomes read-only.
//! 3. **Serving**: each request is one tree walk. Static children win over
//!    the parameter child, which wins over the wildcard child, and the walk
//!    never backtracks once it has picked a branch.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use segroute::router::{Registry, Resolution};
//! use segroute::{FieldSchema, HandlerResponse};
//! use std::sync::Arc;
//!
//! let mut registry = Registry::new();
//! let root = registry.add_router("Default");
//! let users = registry.add_router("users");
//! registry
//!     .register(
//!         users,
//!         Method::GET,
//!         "/{id}",
//!         Arc::new(FieldSchema::default()),
//!         Arc::new(|_: &segroute::HandlerRequest| HandlerResponse::json(200, serde_json::json!({}))),
//!     )
//!     .unwrap();
//! registry.mount(root, "/users", users).unwrap();
//!
//! let table = registry.freeze(root).unwrap();
//! match table.resolve(&Method::GET, "/users/42") {
//!     Resolution::Matched(m) => assert_eq!(m.get_path_param("id"), Some("42")),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

mod core;
pub mod radix;
mod route;
pub mod segment;
#[cfg(test)]
mod tests;

pub use core::{
    ParamVec, Registry, Resolution, RouteMatch, RouteTable, Router, RouterId, MAX_INLINE_PARAMS,
};
pub use radix::{NodeId, RadixTree};
pub use route::{ResponseDoc, Responses, Route, RouteId};
pub use segment::{tokenize, PathTokens, Segment, SegmentKind};
