//! Feature registry: features projected onto the component graph.
//!
//! Each feature is owned by one component and may depend on other features.
//! The feature-level dependency graph is a separate [`Dag`] with the same
//! cycle rule as the component graph. Compatibility and impact questions are
//! answered by delegating to a [`ComponentRegistry`] passed in by the caller.
//!
//! # Status Propagation
//!
//! Feature status only changes through [`FeatureRegistry::update_feature_status`].
//! Nothing is derived automatically from dependencies; callers that want a
//! derived view ask [`FeatureRegistry::blocking_dependencies`].
//!
//! # Lock Ordering
//!
//! Methods that consult the component registry never hold the feature lock
//! while doing so: they copy what they need, release, then call out.

use crate::domain::{ComponentId, Feature, FeatureName, GraphExport, Status, StatusChange};
use crate::error::{EntityKind, Error, Result};
use crate::registry::{ComponentRegistry, RiskStatus};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use trellis_dag::Dag;

#[derive(Debug, Default)]
struct FeatureInner {
    features: HashMap<FeatureName, Feature>,
    graph: Dag<FeatureName>,
}

impl FeatureInner {
    fn feature(&self, name: &FeatureName) -> Result<&Feature> {
        self.features
            .get(name)
            .ok_or_else(|| Error::not_found(EntityKind::Feature, name))
    }
}

/// Thread-safe registry of features.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    inner: RwLock<FeatureInner>,
}

impl FeatureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a feature owned by `component`.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRegistered` if the name is taken.
    pub fn register_feature(
        &self,
        name: impl Into<FeatureName>,
        component: impl Into<ComponentId>,
        status: Status,
    ) -> Result<()> {
        let name = name.into();
        let mut inner = self.inner.write();

        if inner.features.contains_key(&name) {
            return Err(Error::AlreadyRegistered {
                kind: EntityKind::Feature,
                name: name.to_string(),
            });
        }

        let feature = Feature {
            name: name.clone(),
            component: component.into(),
            status,
            dependencies: BTreeSet::new(),
            history: Vec::new(),
        };
        tracing::debug!(feature = %name, component = %feature.component, %status, "registered feature");
        inner.graph.add_node(name.clone());
        inner.features.insert(name, feature);
        Ok(())
    }

    /// Declares that `feature` depends on `dependency`.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if either feature is unknown
    /// - `Error::SelfDependency` if both names are the same
    /// - `Error::CircularDependency` if the edge would close a cycle
    pub fn link_feature_dependency(&self, feature: &FeatureName, dependency: &FeatureName) -> Result<()> {
        let mut inner = self.inner.write();
        inner.feature(feature)?;
        inner.feature(dependency)?;

        inner.graph.add_edge(feature, dependency)?;
        if let Some(entry) = inner.features.get_mut(feature) {
            entry.dependencies.insert(dependency.clone());
        }
        tracing::debug!(%feature, %dependency, "linked feature dependency");
        Ok(())
    }

    /// Moves a feature to `status` and records the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown feature.
    pub fn update_feature_status(&self, name: &FeatureName, status: Status) -> Result<StatusChange> {
        let mut inner = self.inner.write();
        let feature = inner
            .features
            .get_mut(name)
            .ok_or_else(|| Error::not_found(EntityKind::Feature, name))?;

        let change = StatusChange {
            from: feature.status,
            to: status,
            at: Utc::now(),
        };
        feature.status = status;
        feature.history.push(change.clone());

        tracing::debug!(feature = %name, from = %change.from, to = %change.to, "feature status updated");
        Ok(change)
    }

    /// Returns a copy of the feature, or `None` if it is unknown.
    #[must_use]
    pub fn get_feature(&self, name: &FeatureName) -> Option<Feature> {
        self.inner.read().features.get(name).cloned()
    }

    /// Status transitions of a feature, oldest first.
    #[must_use]
    pub fn history(&self, name: &FeatureName) -> Option<Vec<StatusChange>> {
        self.inner
            .read()
            .features
            .get(name)
            .map(|feature| feature.history.clone())
    }

    /// All features, sorted by name.
    #[must_use]
    pub fn features(&self) -> Vec<Feature> {
        let inner = self.inner.read();
        let mut features: Vec<Feature> = inner.features.values().cloned().collect();
        features.sort_by(|a, b| a.name.cmp(&b.name));
        features
    }

    /// Names of the features owned by `component`, sorted.
    #[must_use]
    pub fn features_for_component(&self, component: &ComponentId) -> Vec<FeatureName> {
        let inner = self.inner.read();
        let mut names: Vec<FeatureName> = inner
            .features
            .values()
            .filter(|feature| &feature.component == component)
            .map(|feature| feature.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Direct dependencies of a feature that are not yet COMPLETED.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown feature.
    pub fn blocking_dependencies(&self, name: &FeatureName) -> Result<Vec<FeatureName>> {
        let inner = self.inner.read();
        inner.feature(name)?;
        Ok(inner
            .graph
            .dependencies(name)
            .into_iter()
            .filter(|dep| {
                inner
                    .features
                    .get(dep)
                    .is_some_and(|feature| feature.status != Status::Completed)
            })
            .collect())
    }

    /// Features affected by a change to `component`.
    ///
    /// Takes `component` plus everything that transitively depends on it and
    /// returns every feature owned by one of those components.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the component registry doesn't know
    /// `component`.
    pub fn analyze_feature_impact_from_component_change(
        &self,
        component: &ComponentId,
        components: &ComponentRegistry,
    ) -> Result<BTreeSet<FeatureName>> {
        let mut changed = components.analyze_dependency_impact(component)?;
        changed.insert(component.clone());

        let inner = self.inner.read();
        Ok(inner
            .features
            .values()
            .filter(|feature| changed.contains(&feature.component))
            .map(|feature| feature.name.clone())
            .collect())
    }

    /// Returns false if the feature, or any feature it transitively depends
    /// on, is owned by a component whose dependents reject its current
    /// version.
    ///
    /// Owning components unknown to `components` are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown feature.
    pub fn check_feature_backward_compatibility(
        &self,
        feature: &FeatureName,
        components: &ComponentRegistry,
    ) -> Result<bool> {
        let owners: BTreeSet<ComponentId> = {
            let inner = self.inner.read();
            let root = inner.feature(feature)?;
            std::iter::once(root.component.clone())
                .chain(
                    inner
                        .graph
                        .transitive_dependencies(feature)
                        .iter()
                        .filter_map(|dep| inner.features.get(dep))
                        .map(|dep| dep.component.clone()),
                )
                .collect()
        };

        for owner in &owners {
            match components.check_version_compatibility(owner) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(err) if err.is_not_found() => {
                    tracing::debug!(component = %owner, "owning component not in registry, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(true)
    }

    /// Compatibility risk of the feature's owning component.
    ///
    /// Returns the component's score and a one-entry breakdown marking the
    /// feature as at risk when the score is positive.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the feature, or its owning component in
    /// `components`, is unknown.
    pub fn feature_compatibility_risk(
        &self,
        feature: &FeatureName,
        components: &ComponentRegistry,
    ) -> Result<(f64, BTreeMap<FeatureName, RiskStatus>)> {
        let owner = self.inner.read().feature(feature)?.component.clone();
        let risk = components.calculate_compatibility_risk(&owner)?;

        let breakdown = BTreeMap::from([(feature.clone(), RiskStatus::from_score(risk.score))]);
        Ok((risk.score, breakdown))
    }

    /// Feature-level node and edge dump.
    #[must_use]
    pub fn export_for_visualization(&self) -> GraphExport {
        let inner = self.inner.read();
        GraphExport {
            nodes: inner.graph.nodes().into_iter().map(|name| name.0).collect(),
            edges: inner
                .graph
                .edges()
                .into_iter()
                .map(|(from, to)| (from.0, to.0))
                .collect(),
        }
    }

    /// Number of registered features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().features.len()
    }

    /// Returns true if no feature is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().features.is_empty()
    }

    /// Removes every feature.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.features.clear();
        inner.graph.clear();
    }
}
