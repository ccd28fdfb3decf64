//! Core component registry data structures.
//!
//! This module contains the inner registry structure that holds all data
//! and is wrapped in a `RwLock` by [`super::ComponentRegistry`].

use super::compat::validate_versions;
use crate::domain::{
    Component, ComponentId, ComponentRegistration, ComponentState, EdgeMeta, GraphExport,
};
use crate::error::{EntityKind, Error, Result};
use crate::version::Version;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use trellis_dag::Dag;

/// Inner registry structure (not thread-safe).
///
/// # Graph Representation
///
/// The dependency graph stores edges directed from **dependent to
/// dependency**. Every node in `graph` has a matching entry in `components`
/// and every edge has a matching entry in `edges`.
#[derive(Debug, Default)]
pub(crate) struct RegistryInner {
    /// Components indexed by id
    pub(super) components: HashMap<ComponentId, Component>,

    /// Dependency graph
    pub(super) graph: Dag<ComponentId>,

    /// Per-edge metadata keyed by `(dependent, dependency)`
    pub(super) edges: HashMap<(ComponentId, ComponentId), EdgeMeta>,
}

impl RegistryInner {
    pub(super) fn component(&self, id: &ComponentId) -> Result<&Component> {
        self.components
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::Component, id))
    }

    pub(super) fn edge(&self, dependent: &ComponentId, dependency: &ComponentId) -> Option<&EdgeMeta> {
        self.edges.get(&(dependent.clone(), dependency.clone()))
    }

    /// Creates or updates a component and adds its outgoing edges.
    ///
    /// Runs in two phases: every check (self edge, constraint targets,
    /// constraint satisfaction, cycles) happens before the first mutation,
    /// so a failed call leaves the registry untouched.
    pub(super) fn register(&mut self, reg: ComponentRegistration) -> Result<bool> {
        let ComponentRegistration {
            id,
            depends_on,
            constraints,
            versions,
            contract,
            state,
        } = reg;

        // === Phase 1: validation (no mutations) ===
        if depends_on.contains(&id) {
            return Err(Error::SelfDependency(id.to_string()));
        }

        let existing: BTreeSet<ComponentId> = self.graph.dependencies(&id).into_iter().collect();
        for target in constraints.keys() {
            if !depends_on.contains(target) && !existing.contains(target) {
                return Err(Error::not_found(
                    EntityKind::Dependency,
                    format!("{id} -> {target}"),
                ));
            }
        }

        let effective: BTreeMap<ComponentId, Version> = constraints
            .keys()
            .filter_map(|target| {
                versions
                    .get(target)
                    .or_else(|| self.components.get(target)?.version.as_ref())
                    .map(|version| (target.clone(), version.clone()))
            })
            .collect();
        validate_versions(&constraints, &effective)?;

        // Cycle checks run inside `extend_edges`, which commits nothing on error.
        let added = self.graph.extend_edges(&id, &depends_on)?;

        // === Phase 2: commit ===
        let created = !self.components.contains_key(&id);
        for dep in &depends_on {
            self.components
                .entry(dep.clone())
                .or_insert_with(|| Component::new(dep.clone()));
        }

        let component = self
            .components
            .entry(id.clone())
            .or_insert_with(|| Component::new(id.clone()));
        if let Some(version) = versions.get(&id) {
            component.version = Some(version.clone());
        }
        if let Some(contract) = contract {
            component.contract = contract;
        }
        if state.is_some() {
            component.state = state;
        }

        let touched: BTreeSet<&ComponentId> = depends_on.iter().chain(constraints.keys()).collect();
        for &dep in &touched {
            let supplied = versions.get(dep);
            let dependency = self
                .components
                .get_mut(dep)
                .ok_or_else(|| Error::not_found(EntityKind::Component, dep))?;
            if dependency.version.is_none() {
                dependency.version = supplied.cloned();
            }

            let meta = self.edges.entry((id.clone(), dep.clone())).or_default();
            if let Some(constraint) = constraints.get(dep) {
                meta.constraint = Some(constraint.clone());
            }
            let observed = supplied.or(if meta.observed_version.is_none() {
                dependency.version.as_ref()
            } else {
                None
            });
            if let Some(version) = observed {
                meta.observed_version = Some(version.clone());
                meta.observed_contract = Some(dependency.contract.clone());
            }
        }

        // Dependents registered before this component (or its dependencies)
        // had a version still need a baseline.
        self.fill_observations(&id);
        for dep in touched {
            self.fill_observations(dep);
        }

        tracing::debug!(
            component = %id,
            created,
            new_edges = added.len(),
            "registered component"
        );
        Ok(created)
    }

    pub(super) fn unlink(&mut self, dependent: &ComponentId, dependency: &ComponentId) -> Result<()> {
        if !self.graph.remove_edge(dependent, dependency) {
            return Err(Error::not_found(
                EntityKind::Dependency,
                format!("{dependent} -> {dependency}"),
            ));
        }
        self.edges.remove(&(dependent.clone(), dependency.clone()));
        tracing::debug!(%dependent, %dependency, "removed dependency");
        Ok(())
    }

    pub(super) fn update_version(&mut self, id: &ComponentId, version: Version) -> Result<()> {
        let component = self
            .components
            .get_mut(id)
            .ok_or_else(|| Error::not_found(EntityKind::Component, id))?;
        tracing::debug!(component = %id, %version, "updated component version");
        component.version = Some(version);
        self.fill_observations(id);
        Ok(())
    }

    /// Records `id`'s current version and contract on every incoming edge
    /// that has not observed them yet.
    ///
    /// An edge keeps its first observed version. An empty observed contract
    /// carries no capabilities, so it is replaced by the current one.
    fn fill_observations(&mut self, id: &ComponentId) {
        let Some(component) = self.components.get(id) else {
            return;
        };
        for dependent in self.graph.dependents(id) {
            let Some(meta) = self.edges.get_mut(&(dependent, id.clone())) else {
                continue;
            };
            if meta.observed_version.is_none() {
                meta.observed_version.clone_from(&component.version);
            }
            if meta.observed_contract.as_ref().is_none_or(|c| c.is_empty()) {
                meta.observed_contract = Some(component.contract.clone());
            }
        }
    }

    pub(super) fn set_state(&mut self, id: &ComponentId, state: ComponentState) -> Result<()> {
        let component = self
            .components
            .get_mut(id)
            .ok_or_else(|| Error::not_found(EntityKind::Component, id))?;
        tracing::debug!(component = %id, %state, "updated component state");
        component.state = Some(state);
        Ok(())
    }

    pub(super) fn export(&self) -> GraphExport {
        GraphExport {
            nodes: self.graph.nodes().into_iter().map(|id| id.0).collect(),
            edges: self
                .graph
                .edges()
                .into_iter()
                .map(|(from, to)| (from.0, to.0))
                .collect(),
        }
    }

    pub(super) fn clear(&mut self) {
        self.components.clear();
        self.graph.clear();
        self.edges.clear();
    }
}
