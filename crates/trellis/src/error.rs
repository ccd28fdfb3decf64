//! Error types for trellis registry operations.
//!
//! Errors fall into a few kinds that callers are expected to tell apart
//! (see [`ErrorKind`]): a name that doesn't exist is a different failure
//! from a name that exists but can't take the requested operation.

use std::fmt;
use std::io;
use thiserror::Error;

/// What a missing name referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A component in the dependency graph.
    Component,
    /// A tracked feature.
    Feature,
    /// A tracked milestone.
    Milestone,
    /// A dependency edge between two components.
    Dependency,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Component => "component",
            Self::Feature => "feature",
            Self::Milestone => "milestone",
            Self::Dependency => "dependency",
        };
        f.write_str(name)
    }
}

/// The error type for trellis operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Adding the dependency would close a cycle.
    #[error("Circular dependency: {from} -> {to} would create a cycle")]
    CircularDependency {
        /// The dependent side of the rejected edge.
        from: String,
        /// The dependency side of the rejected edge.
        to: String,
    },

    /// A name was declared as its own dependency.
    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(String),

    /// A feature or milestone with this name already exists.
    #[error("{kind} already registered: {name}")]
    AlreadyRegistered {
        /// What kind of object collided.
        kind: EntityKind,
        /// The duplicate name.
        name: String,
    },

    /// A declared version violates a declared constraint.
    #[error("Version {version} of {component} does not satisfy constraint '{constraint}'")]
    VersionCompatibility {
        /// The component whose version was checked.
        component: String,
        /// The constraint that was violated.
        constraint: String,
        /// The offending version.
        version: String,
    },

    /// A referenced name is unknown.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What kind of object was looked up.
        kind: EntityKind,
        /// The name that was looked up.
        name: String,
    },

    /// A version string could not be parsed.
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A constraint expression could not be parsed.
    #[error("Invalid version constraint '{input}': {reason}")]
    InvalidConstraint {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Manifest or configuration problem.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while reading a manifest.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Manifest YAML could not be parsed.
    #[error("Manifest parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Broad classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected graph or registry mutation (cycle, self edge, duplicate).
    Registration,
    /// Version constraint violation.
    VersionCompatibility,
    /// Unknown component, feature, milestone or edge.
    NotFound,
    /// Malformed version or constraint text.
    InvalidInput,
    /// Manifest loading failure.
    Config,
}

impl Error {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CircularDependency { .. }
            | Self::SelfDependency(_)
            | Self::AlreadyRegistered { .. } => ErrorKind::Registration,
            Self::VersionCompatibility { .. } => ErrorKind::VersionCompatibility,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidVersion { .. } | Self::InvalidConstraint { .. } => {
                ErrorKind::InvalidInput
            }
            Self::Config(_) | Self::Io(_) | Self::Yaml(_) => ErrorKind::Config,
        }
    }

    /// Returns true for rejected registrations.
    #[must_use]
    pub fn is_registration(&self) -> bool {
        self.kind() == ErrorKind::Registration
    }

    /// Returns true for unknown-name lookups.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn not_found(kind: EntityKind, name: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

impl<N: fmt::Display> From<trellis_dag::DagError<N>> for Error {
    fn from(err: trellis_dag::DagError<N>) -> Self {
        use trellis_dag::DagError;
        match err {
            DagError::Cycle { from, to } => Self::CircularDependency {
                from: from.to_string(),
                to: to.to_string(),
            },
            DagError::SelfLoop(id) => Self::SelfDependency(id.to_string()),
            DagError::NodeNotFound(id) => Self::not_found(EntityKind::Dependency, id),
        }
    }
}

/// A specialized Result type for trellis operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_dag::DagError;

    #[test]
    fn dag_errors_map_to_registration_kind() {
        let err: Error = DagError::Cycle { from: "a", to: "b" }.into();
        assert!(err.is_registration());
        assert_eq!(
            err.to_string(),
            "Circular dependency: a -> b would create a cycle"
        );

        let err: Error = DagError::SelfLoop("a").into();
        assert!(matches!(err, Error::SelfDependency(ref id) if id == "a"));
    }

    #[test]
    fn not_found_is_distinct_from_registration() {
        let err = Error::not_found(EntityKind::Feature, "login");
        assert!(err.is_not_found());
        assert!(!err.is_registration());
        assert_eq!(err.to_string(), "feature not found: login");
    }

    #[test]
    fn version_error_names_all_parts() {
        let err = Error::VersionCompatibility {
            component: "bar".into(),
            constraint: ">=1.0,<2.0".into(),
            version: "2.2.0".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bar"));
        assert!(msg.contains(">=1.0,<2.0"));
        assert!(msg.contains("2.2.0"));
        assert_eq!(err.kind(), ErrorKind::VersionCompatibility);
    }
}
