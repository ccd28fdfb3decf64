//! Component registry: the dependency graph store and its analyzers.
//!
//! [`ComponentRegistry`] holds versioned components and the directed
//! dependency edges between them, and answers compatibility and impact
//! questions over that graph.
//!
//! # Architecture
//!
//! - `HashMap<ComponentId, Component>` for component lookups
//! - [`trellis_dag::Dag`] for the dependency graph with cycle detection
//! - `HashMap<(dependent, dependency), EdgeMeta>` for per-edge constraints
//!   and observed versions
//!
//! ## Edge Direction Convention
//!
//! Edges point from **dependent -> dependency**: if `api` needs `database`,
//! the edge is `api -> database`. Dependency queries follow edges forwards;
//! impact queries follow them backwards.
//!
//! # Thread Safety
//!
//! All state sits behind one `parking_lot::RwLock`. Mutations hold the write
//! lock for the whole call, from validation to commit, so concurrent callers
//! never observe a half-applied registration. Queries hold the read lock for
//! the whole traversal, so a traversal never sees a mutation mid-way.
//!
//! # Example
//!
//! ```
//! use trellis::domain::{ComponentId, ComponentRegistration};
//! use trellis::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::new();
//! registry.register(ComponentRegistration::new("api").depends_on(["database"]))?;
//! registry.register(ComponentRegistration::new("frontend").depends_on(["api"]))?;
//!
//! let impact = registry.analyze_dependency_impact(&ComponentId::from("database"))?;
//! assert_eq!(impact.len(), 2);
//! # Ok::<(), trellis::error::Error>(())
//! ```

mod compat;
mod impact;
mod inner;

use crate::domain::{
    Component, ComponentId, ComponentRegistration, ComponentState, EdgeMeta, GraphExport,
};
use crate::error::Result;
use crate::version::Version;
use inner::RegistryInner;
use parking_lot::RwLock;
use std::collections::BTreeSet;

pub use compat::{validate_versions, CompatibilityRisk, ConstraintViolation, RiskStatus};
pub use impact::{Change, ImpactReport};

/// Thread-safe registry of components and their dependency edges.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    inner: RwLock<RegistryInner>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Mutations ==========

    /// Creates or updates a component and adds its outgoing dependency edges.
    ///
    /// Dependencies that are not registered yet are created as placeholder
    /// components without a version. Edges are additive; use
    /// [`ComponentRegistry::unlink`] to drop one. Returns `true` if the
    /// component was newly created.
    ///
    /// The call is atomic: on error nothing has changed.
    ///
    /// # Errors
    ///
    /// - `Error::SelfDependency` if the component lists itself
    /// - `Error::CircularDependency` if any new edge would close a cycle
    /// - `Error::VersionCompatibility` if a declared constraint rejects the
    ///   dependency's declared (or current) version
    /// - `Error::NotFound` if a constraint names a component that is not a
    ///   dependency
    pub fn register(&self, registration: ComponentRegistration) -> Result<bool> {
        self.inner.write().register(registration)
    }

    /// Removes the edge `dependent -> dependency` and its metadata.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the edge does not exist.
    pub fn unlink(&self, dependent: &ComponentId, dependency: &ComponentId) -> Result<()> {
        self.inner.write().unlink(dependent, dependency)
    }

    /// Sets a component's current version and returns its impact set.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown component.
    pub fn update_version(&self, id: &ComponentId, version: Version) -> Result<BTreeSet<ComponentId>> {
        let mut inner = self.inner.write();
        inner.update_version(id, version)?;
        impact::dependency_impact_impl(&inner, id)
    }

    /// Sets a component's operational state and returns its impact set.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown component.
    pub fn set_state(&self, id: &ComponentId, state: ComponentState) -> Result<BTreeSet<ComponentId>> {
        let mut inner = self.inner.write();
        inner.set_state(id, state)?;
        impact::dependency_impact_impl(&inner, id)
    }

    /// Removes every component and edge.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    // ========== Lookups ==========

    /// Returns a copy of the component, or `None` if it is unknown.
    #[must_use]
    pub fn get_component(&self, id: &ComponentId) -> Option<Component> {
        self.inner.read().components.get(id).cloned()
    }

    /// Returns true if the component is registered.
    #[must_use]
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.inner.read().components.contains_key(id)
    }

    /// Number of registered components (placeholders included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().components.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().components.is_empty()
    }

    /// All components, sorted by id.
    #[must_use]
    pub fn components(&self) -> Vec<Component> {
        let inner = self.inner.read();
        let mut components: Vec<Component> = inner.components.values().cloned().collect();
        components.sort_by(|a, b| a.id.cmp(&b.id));
        components
    }

    /// Metadata the dependent keeps about one of its dependencies.
    #[must_use]
    pub fn edge_meta(&self, dependent: &ComponentId, dependency: &ComponentId) -> Option<EdgeMeta> {
        self.inner.read().edge(dependent, dependency).cloned()
    }

    // ========== Graph queries ==========

    /// Direct dependencies. Empty for an unknown component.
    #[must_use]
    pub fn get_dependencies(&self, id: &ComponentId) -> BTreeSet<ComponentId> {
        self.inner.read().graph.dependencies(id).into_iter().collect()
    }

    /// Direct dependents. Empty for an unknown component.
    #[must_use]
    pub fn get_dependents(&self, id: &ComponentId) -> BTreeSet<ComponentId> {
        self.inner.read().graph.dependents(id).into_iter().collect()
    }

    /// Full transitive closure of dependencies in BFS discovery order.
    ///
    /// Each dependency appears once; the component itself is excluded.
    /// Empty for an unknown component.
    #[must_use]
    pub fn get_all_dependencies(&self, id: &ComponentId) -> Vec<ComponentId> {
        self.inner.read().graph.transitive_dependencies(id)
    }

    /// All components with every dependency ahead of its dependents.
    ///
    /// # Errors
    ///
    /// Returns `Error::CircularDependency` only if the acyclicity invariant
    /// was somehow broken.
    pub fn topological_order(&self) -> Result<Vec<ComponentId>> {
        Ok(self.inner.read().graph.topological_order()?)
    }

    /// Full node and edge dump for presentation layers.
    #[must_use]
    pub fn export_for_visualization(&self) -> GraphExport {
        self.inner.read().export()
    }

    // ========== Compatibility ==========

    /// Scores how many dependents are affected by the component's current
    /// version and contract.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown component.
    pub fn calculate_compatibility_risk(&self, id: &ComponentId) -> Result<CompatibilityRisk> {
        compat::compatibility_risk_impl(&self.inner.read(), id)
    }

    /// Returns true if every dependent's declared constraint accepts the
    /// component's current version.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown component.
    pub fn check_version_compatibility(&self, id: &ComponentId) -> Result<bool> {
        compat::check_version_compatibility_impl(&self.inner.read(), id)
    }

    /// Every edge whose declared constraint rejects the dependency's
    /// current version, sorted by edge.
    #[must_use]
    pub fn find_violations(&self) -> Vec<ConstraintViolation> {
        compat::find_violations_impl(&self.inner.read())
    }

    // ========== Impact ==========

    /// Every component that transitively depends on `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown component.
    pub fn analyze_dependency_impact(&self, id: &ComponentId) -> Result<BTreeSet<ComponentId>> {
        impact::dependency_impact_impl(&self.inner.read(), id)
    }

    /// Impact of a hypothetical change.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the change targets an unknown component.
    pub fn analyze_impact(&self, change: &Change) -> Result<ImpactReport> {
        impact::analyze_impact_impl(&self.inner.read(), change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::version::VersionConstraint;

    fn id(s: &str) -> ComponentId {
        ComponentId::from(s)
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn c(s: &str) -> VersionConstraint {
        VersionConstraint::parse(s).unwrap()
    }

    #[test]
    fn register_reports_creation() {
        let registry = ComponentRegistry::new();
        assert!(registry.register(ComponentRegistration::new("a")).unwrap());
        assert!(!registry.register(ComponentRegistration::new("a")).unwrap());
    }

    #[test]
    fn dependencies_become_placeholders() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentRegistration::new("a").depends_on(["b"]))
            .unwrap();

        let placeholder = registry.get_component(&id("b")).unwrap();
        assert!(placeholder.version.is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn versions_map_seeds_and_observes() {
        let registry = ComponentRegistry::new();
        registry
            .register(
                ComponentRegistration::new("api")
                    .depends_on(["db"])
                    .version(v("1.0.0"))
                    .observed("db", v("3.1.0")),
            )
            .unwrap();

        assert_eq!(registry.get_component(&id("api")).unwrap().version, Some(v("1.0.0")));
        assert_eq!(registry.get_component(&id("db")).unwrap().version, Some(v("3.1.0")));
        let meta = registry.edge_meta(&id("api"), &id("db")).unwrap();
        assert_eq!(meta.observed_version, Some(v("3.1.0")));
    }

    #[test]
    fn constraint_on_non_dependency_rejected() {
        let registry = ComponentRegistry::new();
        let err = registry
            .register(ComponentRegistration::new("api").constraint("db", c(">=1.0")))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(registry.is_empty());
    }

    #[test]
    fn constraint_checked_against_current_version() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentRegistration::new("db").version(v("2.5.0")))
            .unwrap();

        let err = registry
            .register(
                ComponentRegistration::new("api")
                    .depends_on(["db"])
                    .constraint("db", c(">=1.0,<2.0")),
            )
            .unwrap_err();

        assert!(matches!(err, Error::VersionCompatibility { .. }));
        assert!(!registry.contains(&id("api")));
        assert!(registry.get_dependents(&id("db")).is_empty());
    }

    #[test]
    fn unlink_removes_edge_and_meta() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentRegistration::new("a").depends_on(["b"]))
            .unwrap();

        registry.unlink(&id("a"), &id("b")).unwrap();
        assert!(registry.get_dependencies(&id("a")).is_empty());
        assert!(registry.edge_meta(&id("a"), &id("b")).is_none());
        assert!(registry.unlink(&id("a"), &id("b")).unwrap_err().is_not_found());
    }

    #[test]
    fn state_change_returns_impact_set() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentRegistration::new("api").depends_on(["db"]))
            .unwrap();
        registry
            .register(ComponentRegistration::new("web").depends_on(["api"]))
            .unwrap();

        let impacted = registry.set_state(&id("db"), ComponentState::Down).unwrap();
        assert_eq!(impacted, BTreeSet::from([id("api"), id("web")]));
        assert_eq!(
            registry.get_component(&id("db")).unwrap().state,
            Some(ComponentState::Down)
        );
    }

    #[test]
    fn upgrade_impact_lists_constraint_breaks() {
        let registry = ComponentRegistry::new();
        registry
            .register(
                ComponentRegistration::new("api")
                    .depends_on(["db"])
                    .observed("db", v("1.2.0"))
                    .constraint("db", c(">=1.0,<2.0")),
            )
            .unwrap();
        registry
            .register(ComponentRegistration::new("reports").depends_on(["db"]))
            .unwrap();

        let report = registry
            .analyze_impact(&Change::Upgrade {
                id: id("db"),
                version: v("2.0.0"),
            })
            .unwrap();

        assert_eq!(report.direct, BTreeSet::from([id("api"), id("reports")]));
        assert_eq!(report.incompatible, BTreeSet::from([id("api")]));
    }

    #[test]
    fn clear_resets_everything() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentRegistration::new("a").depends_on(["b"]))
            .unwrap();
        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.export_for_visualization().edges.len(), 0);
    }
}
