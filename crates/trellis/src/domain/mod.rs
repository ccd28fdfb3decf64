//! Domain types for the dependency registry.
//!
//! This module contains the identifiers, records and status types shared by
//! the component, feature and milestone registries.

use crate::version::{Version, VersionConstraint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique identifier of a component in the dependency graph
    ComponentId
);

string_id!(
    /// Unique name of a tracked feature
    FeatureName
);

string_id!(
    /// Unique name of a tracked milestone
    MilestoneName
);

/// Capability name to value mapping used for structural compatibility checks.
pub type Contract = BTreeMap<String, serde_json::Value>;

/// Operational state of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentState {
    /// Component is serving normally
    Up,

    /// Component is unavailable
    Down,

    /// Component is serving with reduced capability
    Degraded,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Degraded => "DEGRADED",
        };
        f.write_str(s)
    }
}

impl FromStr for ComponentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            "DEGRADED" => Ok(Self::Degraded),
            other => Err(format!("unknown component state '{other}'")),
        }
    }
}

/// A versioned component tracked in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Unique identifier
    pub id: ComponentId,

    /// Current version, if one has been declared
    pub version: Option<Version>,

    /// Capabilities this component exposes
    pub contract: Contract,

    /// Operational state, if known
    pub state: Option<ComponentState>,
}

impl Component {
    /// Create a component with no version, contract or state
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            version: None,
            contract: Contract::new(),
            state: None,
        }
    }
}

/// Data for registering (or re-registering) a component.
///
/// Built with the chaining helpers; only `id` is required.
///
/// `versions` follows the registry contract: an entry for `id` sets the
/// component's own version, entries for dependencies record the version this
/// component was built against (and seed the dependency's version if it has
/// none yet).
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistration {
    /// Component being registered
    pub id: ComponentId,

    /// Direct dependencies to add
    pub depends_on: BTreeSet<ComponentId>,

    /// Declared constraints on dependencies (dependency id -> constraint)
    pub constraints: BTreeMap<ComponentId, VersionConstraint>,

    /// Declared versions (see type-level docs)
    pub versions: BTreeMap<ComponentId, Version>,

    /// Replacement contract, if supplied
    pub contract: Option<Contract>,

    /// Operational state, if supplied
    pub state: Option<ComponentState>,
}

impl ComponentRegistration {
    /// Start a registration for `id`
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Add direct dependencies
    #[must_use]
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ComponentId>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Set this component's own version
    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.versions.insert(self.id.clone(), version);
        self
    }

    /// Record a declared version for any component
    #[must_use]
    pub fn observed(mut self, id: impl Into<ComponentId>, version: Version) -> Self {
        self.versions.insert(id.into(), version);
        self
    }

    /// Declare a constraint on a dependency
    #[must_use]
    pub fn constraint(mut self, id: impl Into<ComponentId>, constraint: VersionConstraint) -> Self {
        self.constraints.insert(id.into(), constraint);
        self
    }

    /// Set the component's contract
    #[must_use]
    pub fn contract(mut self, contract: Contract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Set the component's operational state
    #[must_use]
    pub fn state(mut self, state: ComponentState) -> Self {
        self.state = Some(state);
        self
    }
}

/// Metadata a dependent keeps about one of its dependencies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeMeta {
    /// Constraint the dependent declared on the dependency
    pub constraint: Option<VersionConstraint>,

    /// Dependency version the dependent last observed
    pub observed_version: Option<Version>,

    /// Dependency contract at the time the version was observed
    pub observed_contract: Option<Contract>,
}

/// Development status shared by features and milestones.
///
/// Transitions are unrestricted; policy belongs to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Not started
    #[default]
    Planned,

    /// Work underway
    InProgress,

    /// Done
    Completed,

    /// Cannot proceed
    Blocked,

    /// Paused deliberately
    OnHold,

    /// Abandoned
    Cancelled,
}

impl Status {
    /// All statuses in declaration order
    pub const ALL: [Status; 6] = [
        Status::Planned,
        Status::InProgress,
        Status::Completed,
        Status::Blocked,
        Status::OnHold,
        Status::Cancelled,
    ];

    /// The canonical upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Blocked => "BLOCKED",
            Self::OnHold => "ON_HOLD",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown status '{s}'"))
    }
}

/// One recorded feature status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Status before the update
    pub from: Status,

    /// Status after the update
    pub to: Status,

    /// When the update happened
    pub at: DateTime<Utc>,
}

/// One recorded milestone status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Status entered
    pub status: Status,

    /// When it was entered
    pub at: DateTime<Utc>,
}

/// A tracked feature owned by one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Unique name
    pub name: FeatureName,

    /// Owning component
    pub component: ComponentId,

    /// Current status
    pub status: Status,

    /// Feature-level dependencies
    pub dependencies: BTreeSet<FeatureName>,

    /// Status transitions, oldest first
    pub history: Vec<StatusChange>,
}

/// A tracked milestone spanning one or more components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique name
    pub name: MilestoneName,

    /// Components the milestone covers
    pub components: BTreeSet<ComponentId>,

    /// Current status
    pub status: Status,

    /// Milestone-level dependencies
    pub dependencies: BTreeSet<MilestoneName>,

    /// Progress in `[0.0, 1.0]`, as of the last recalculation
    pub progress: f64,

    /// Statuses entered, oldest first; the first entry is the registration status
    pub history: Vec<StatusRecord>,
}

/// Node and edge dump for presentation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    /// Node ids, sorted
    pub nodes: Vec<String>,

    /// `(dependent, dependency)` pairs, sorted
    pub edges: Vec<(String, String)>,
}
