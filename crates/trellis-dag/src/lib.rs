//! A small directed acyclic graph library for dependency tracking.
//!
//! [`Dag`] stores nodes keyed by any hashable, ordered identifier and keeps
//! the edge set acyclic: every insertion runs a reachability check first and
//! a rejected insertion changes nothing. On top of that it answers the
//! queries dependency registries keep reimplementing: direct neighbours in
//! both directions, transitive closure, reverse closure (impact set) and a
//! topological order.
//!
//! ```
//! use trellis_dag::{Dag, DagError};
//!
//! let mut dag = Dag::new();
//! dag.extend_edges(&"api", [&"database"]).unwrap();
//! dag.extend_edges(&"frontend", [&"api"]).unwrap();
//!
//! assert_eq!(dag.transitive_dependents(&"database"), vec!["api", "frontend"]);
//! assert_eq!(
//!     dag.extend_edges(&"database", [&"frontend"]),
//!     Err(DagError::Cycle { from: "database", to: "frontend" })
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dag;
pub mod error;

pub use dag::Dag;
pub use error::{DagError, Result};
