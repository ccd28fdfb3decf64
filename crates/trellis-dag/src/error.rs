//! Error types for trellis-dag operations.

use thiserror::Error;

/// The error type for graph mutations.
///
/// Generic over the node identifier so callers get their own ids back
/// without a lossy string conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DagError<N> {
    /// The edge `from -> to` would close a cycle.
    #[error("adding {from} -> {to} would create a cycle")]
    Cycle {
        /// The dependent end of the rejected edge.
        from: N,
        /// The dependency end of the rejected edge.
        to: N,
    },

    /// A node may not depend on itself.
    #[error("{0} cannot depend on itself")]
    SelfLoop(N),

    /// The referenced node is not part of the graph.
    #[error("node not found: {0}")]
    NodeNotFound(N),
}

/// A specialized Result type for trellis-dag operations.
pub type Result<T, N> = std::result::Result<T, DagError<N>>;
