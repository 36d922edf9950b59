//! Configuration-time errors.
//!
//! Everything in here indicates a programming mistake in how routes were
//! declared. None of these are ever produced while serving traffic: they are
//! returned by registration and mount calls, or collected by
//! [`App::freeze`](crate::app::App::freeze), and the application is expected
//! to abort on them.

use http::Method;
use std::fmt;

/// A single configuration mistake detected while building the routing tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The same method was registered twice at the same node.
    DuplicateMethod {
        /// Method that was registered twice
        method: Method,
        /// Local path of the rejected registration
        path: String,
        /// Full pattern of the node where the existing route lives
        existing: String,
    },
    /// A child segment would break sibling uniqueness: a second Param or
    /// Wildcard child, or a duplicate Static child.
    ConflictingSegment {
        /// Pattern of the node that would receive the child
        parent: String,
        /// The rejected segment, as written
        segment: String,
        /// The sibling already occupying that slot
        existing: String,
    },
    /// `{}` used as a path segment.
    EmptyParamName {
        /// Offending path
        path: String,
    },
    /// A wildcard segment followed by further segments, or a wildcard inside a
    /// mount prefix.
    WildcardNotTrailing {
        /// Offending path
        path: String,
    },
    /// Mount prefix empty or not starting with `/`.
    InvalidMountPrefix {
        /// The rejected prefix
        prefix: String,
    },
    /// A router was mounted onto itself.
    SelfMount {
        /// Router name
        router: String,
    },
    /// The router being mounted already has a parent.
    AlreadyMounted {
        /// Router being mounted
        router: String,
        /// Its current parent
        parent: String,
    },
    /// The router a table is frozen from was itself mounted elsewhere, so
    /// its routes' full paths would not match what dispatch walks.
    RootMounted {
        /// Root router
        router: String,
        /// Router it was mounted under
        parent: String,
    },
    /// Mounting would make a router its own ancestor.
    MountCycle {
        /// Router receiving the mount
        router: String,
        /// Router being mounted (an ancestor of `router`)
        sub: String,
    },
    /// A router handle that does not belong to this registry.
    UnknownRouter {
        /// Raw handle index
        index: usize,
    },
    /// A route handle that does not belong to this registry.
    UnknownRoute {
        /// Raw handle index
        index: usize,
    },
    /// The route's field schema declares a different number of path fields
    /// than its full path captures.
    PathFieldMismatch {
        /// `METHOD /full/path`
        route: String,
        /// Path fields in the schema
        declared: usize,
        /// Dynamic segments in the full path
        captured: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateMethod {
                method,
                path,
                existing,
            } => write!(
                f,
                "cannot define route '{path}' with method '{method}': \
                 a {method} route already exists at '{existing}'"
            ),
            ConfigError::ConflictingSegment {
                parent,
                segment,
                existing,
            } => write!(
                f,
                "segment '{segment}' conflicts with existing child '{existing}' under '{parent}'"
            ),
            ConfigError::EmptyParamName { path } => {
                write!(f, "path '{path}' contains a parameter with an empty name")
            }
            ConfigError::WildcardNotTrailing { path } => write!(
                f,
                "path '{path}' uses a wildcard that is not the final segment"
            ),
            ConfigError::InvalidMountPrefix { prefix } => write!(
                f,
                "mount prefix '{prefix}' is invalid: prefixes must be non-empty and begin with '/'"
            ),
            ConfigError::SelfMount { router } => {
                write!(f, "router '{router}' cannot be mounted onto itself")
            }
            ConfigError::AlreadyMounted { router, parent } => write!(
                f,
                "router '{router}' is already attached to '{parent}'; \
                 a router may only be attached to one parent"
            ),
            ConfigError::RootMounted { router, parent } => write!(
                f,
                "root router '{router}' is mounted under '{parent}'; the root must stay top-level"
            ),
            ConfigError::MountCycle { router, sub } => write!(
                f,
                "mounting '{sub}' under '{router}' would create a cycle: '{sub}' is an ancestor of '{router}'"
            ),
            ConfigError::UnknownRouter { index } => {
                write!(f, "router handle #{index} does not belong to this app")
            }
            ConfigError::UnknownRoute { index } => {
                write!(f, "route handle #{index} does not belong to this app")
            }
            ConfigError::PathFieldMismatch {
                route,
                declared,
                captured,
            } => write!(
                f,
                "route '{route}' declares {declared} path field(s) but its path captures {captured}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Every problem found while freezing an app.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl ConfigErrors {
    /// Errors in the order they were found
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn push(&mut self, err: ConfigError) {
        self.0.push(err);
    }
}

impl From<ConfigError> for ConfigErrors {
    fn from(err: ConfigError) -> Self {
        ConfigErrors(vec![err])
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}
