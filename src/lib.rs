//! # segroute
//!
//! **segroute** is an HTTP request router built on a segment trie. Routes are
//! registered on named routers, routers are mounted inside each other, and
//! the merged tree resolves every request with a single walk.
//!
//! ## Architecture
//!
//! - **[`router`]** - Path tokenizer, node arena, registration, mounting and
//!   the frozen route table
//! - **[`fields`]** - Route input schemas and the binder that fills them
//! - **[`dispatcher`]** - Request pipeline: resolve, bind, middleware, handler
//! - **[`middleware`]** - Per-router `before`/`after` hooks
//! - **[`typed`]** - Handlers over `serde` request and response types
//! - **[`app`]** - Configuration facade that freezes into a dispatcher
//! - **[`config`]** / **[`logging`]** - App settings and `tracing` setup
//! - **[`manifest`]** / **[`cli`]** - Declarative route tables and their CLI
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Dispatcher
//!     participant Table as RouteTable
//!     participant Binder
//!     participant MW as Middleware
//!     participant Handler
//!
//!     Client->>Dispatcher: http::Request
//!     Dispatcher->>Table: resolve(method, path)
//!     alt no node / nothing bound
//!         Table-->>Dispatcher: NotFound
//!         Dispatcher-->>Client: 404
//!     else method not bound
//!         Table-->>Dispatcher: MethodNotAllowed { allow }
//!         Dispatcher-->>Client: 405 + Allow
//!     else matched
//!         Table-->>Dispatcher: RouteMatch { route, params }
//!         Dispatcher->>Binder: bind(route, params, request)
//!         Binder-->>Dispatcher: input | 400
//!         Dispatcher->>MW: before (outermost router first)
//!         Dispatcher->>Handler: handle(request)
//!         Dispatcher->>MW: after
//!         Dispatcher-->>Client: HandlerResponse
//!     end
//! ```
//!
//! ## Path syntax
//!
//! | Segment | Matches |
//! |---|---|
//! | `users` | exactly `users` |
//! | `{id}` | any one segment, captured as `id` |
//! | `*rest` / `*` | the rest of the path (possibly empty), captured as `rest` / `*` |
//!
//! At each node a static child is tried first, then the parameter child, then
//! the wildcard child. Once a branch is taken the walk does not go back, so a
//! request that commits to a static branch cannot fall back to a sibling
//! parameter branch further down.
//!
//! ## Quick Start
//!
//! ```rust
//! use segroute::{App, AppConfig, FieldKind, FieldLocation, FieldMeta, FieldSchema};
//! use segroute::{HandlerRequest, HandlerResponse, TracingMiddleware};
//! use serde_json::json;
//!
//! let mut app = App::new(AppConfig::named("shop"));
//! let users = app.router("users");
//! app.use_middleware(users, TracingMiddleware).unwrap();
//!
//! let fields = FieldSchema::default()
//!     .field(FieldMeta::new("id", FieldLocation::Path, FieldKind::Integer));
//! app.get(users, "/{id}", fields, |req: &HandlerRequest| {
//!     HandlerResponse::json(200, json!({ "user": req.input["id"] }))
//! })
//! .unwrap();
//! app.include_router("/users", users).unwrap();
//!
//! let dispatcher = app.freeze().unwrap();
//! let resp = dispatcher.dispatch(http::Request::get("/users/42").body(Vec::new()).unwrap());
//! assert_eq!(resp.status, 200);
//! assert_eq!(resp.body["user"], 42);
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
mod echo;
pub mod error;
pub mod fields;
pub mod ids;
pub mod logging;
pub mod manifest;
pub mod middleware;
pub mod router;
pub mod typed;

pub use app::App;
pub use config::AppConfig;
pub use dispatcher::{Dispatcher, Handler, HandlerRequest, HandlerResponse};
pub use echo::{echo_body, EchoHandler};
pub use error::{ConfigError, ConfigErrors};
pub use fields::{BindError, Binder, FieldKind, FieldLocation, FieldMeta, FieldSchema, SchemaBinder};
pub use ids::RequestId;
pub use logging::{build_sink, build_sink_with_writer, init_logging, LogConfig, LogFormat};
pub use manifest::Manifest;
pub use middleware::{Middleware, TracingMiddleware};
pub use router::{Resolution, ResponseDoc, Route, RouteId, RouteMatch, RouterId};
pub use typed::{typed, TypedHandlerRequest};
