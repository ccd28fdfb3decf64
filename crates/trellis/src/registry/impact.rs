//! Impact analysis over the reverse dependency graph.
//!
//! The impact set of a component is every component that transitively
//! depends on it. It is what has to be re-checked when the component goes
//! down, changes version or disappears.

use super::inner::RegistryInner;
use crate::domain::ComponentId;
use crate::error::Result;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A hypothetical change to one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    /// The component disappears.
    Remove(ComponentId),
    /// The component changes in an unspecified way.
    Modify(ComponentId),
    /// The component moves to a new version.
    Upgrade {
        /// Component being upgraded.
        id: ComponentId,
        /// Target version.
        version: Version,
    },
}

impl Change {
    /// The component the change applies to.
    #[must_use]
    pub fn target(&self) -> &ComponentId {
        match self {
            Self::Remove(id) | Self::Modify(id) | Self::Upgrade { id, .. } => id,
        }
    }
}

/// Result of [`super::ComponentRegistry::analyze_impact`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    /// The analysed change.
    pub change: Change,

    /// Every component that transitively depends on the target.
    pub affected: BTreeSet<ComponentId>,

    /// Direct dependents of the target.
    pub direct: BTreeSet<ComponentId>,

    /// Direct dependents known to break: all of them for a removal, those
    /// whose declared constraint rejects the new version for an upgrade,
    /// none for an unspecified modification.
    pub incompatible: BTreeSet<ComponentId>,
}

pub(super) fn dependency_impact_impl(
    inner: &RegistryInner,
    id: &ComponentId,
) -> Result<BTreeSet<ComponentId>> {
    inner.component(id)?;
    Ok(inner.graph.transitive_dependents(id).into_iter().collect())
}

pub(super) fn analyze_impact_impl(inner: &RegistryInner, change: &Change) -> Result<ImpactReport> {
    let id = change.target();
    let affected = dependency_impact_impl(inner, id)?;
    let direct: BTreeSet<ComponentId> = inner.graph.dependents(id).into_iter().collect();

    let incompatible = match change {
        Change::Remove(_) => direct.clone(),
        Change::Modify(_) => BTreeSet::new(),
        Change::Upgrade { version, .. } => direct
            .iter()
            .filter(|dependent| {
                inner
                    .edge(dependent, id)
                    .and_then(|meta| meta.constraint.as_ref())
                    .is_some_and(|constraint| !constraint.matches(version))
            })
            .cloned()
            .collect(),
    };

    tracing::trace!(
        target_component = %id,
        affected = affected.len(),
        incompatible = incompatible.len(),
        "impact analysis finished"
    );

    Ok(ImpactReport {
        change: change.clone(),
        affected,
        direct,
        incompatible,
    })
}
