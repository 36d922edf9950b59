//! # CLI Module
//!
//! Command-line access to a route manifest.
//!
//! ## Commands
//!
//! ```bash
//! # Draw the merged routing tree
//! segroute tree --manifest routes.yaml
//!
//! # List every served route (add --json for machine output)
//! segroute routes --manifest routes.yaml
//!
//! # Which route would serve this request?
//! segroute resolve --manifest routes.yaml GET /users/42
//!
//! # Dispatch through echo handlers and print the response
//! segroute request --manifest routes.yaml POST '/users?verbose=1' \
//!     -H 'content-type: application/json' --body '{"name":"x"}'
//! ```
//!
//! Every command accepts `--config <FILE>` to supply an app config instead of
//! the manifest's `app` section. `SEGROUTE_*` environment variables are
//! applied last.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, run_command, Cli, Commands, Source};
