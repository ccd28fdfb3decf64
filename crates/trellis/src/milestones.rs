//! Milestone registry: delivery milestones spanning several components.
//!
//! Milestones form their own dependency graph. Progress is pull-based: a
//! milestone with dependencies reports the mean of their stored progress,
//! computed whenever the milestone itself is touched. Nothing cascades to
//! dependents.

use crate::domain::{ComponentId, GraphExport, Milestone, MilestoneName, Status, StatusRecord};
use crate::error::{EntityKind, Error, Result};
use crate::registry::ComponentRegistry;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use trellis_dag::Dag;

/// Point-in-time risk view of a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// The milestone is BLOCKED.
    pub blocked: bool,

    /// The milestone is ON_HOLD.
    pub on_hold: bool,

    /// Dependency milestones that are not COMPLETED, sorted.
    pub unresolved_dependencies: Vec<MilestoneName>,

    /// Progress computed from current dependency state.
    pub completion: f64,
}

fn status_progress(status: Status) -> f64 {
    match status {
        Status::Completed => 1.0,
        Status::InProgress => 0.5,
        _ => 0.0,
    }
}

#[derive(Debug, Default)]
struct MilestoneInner {
    milestones: HashMap<MilestoneName, Milestone>,
    graph: Dag<MilestoneName>,
}

impl MilestoneInner {
    fn milestone(&self, name: &MilestoneName) -> Result<&Milestone> {
        self.milestones
            .get(name)
            .ok_or_else(|| Error::not_found(EntityKind::Milestone, name))
    }

    fn progress_of(&self, name: &MilestoneName) -> Result<f64> {
        let milestone = self.milestone(name)?;
        let deps = self.graph.dependencies(name);
        if deps.is_empty() {
            return Ok(status_progress(milestone.status));
        }

        #[allow(clippy::cast_precision_loss)]
        let count = deps.len() as f64;
        let total: f64 = deps
            .iter()
            .filter_map(|dep| self.milestones.get(dep))
            .map(|dep| dep.progress)
            .sum();
        Ok(total / count)
    }

    fn refresh(&mut self, name: &MilestoneName) -> Result<f64> {
        let progress = self.progress_of(name)?;
        if let Some(milestone) = self.milestones.get_mut(name) {
            milestone.progress = progress;
        }
        tracing::trace!(milestone = %name, progress, "recalculated progress");
        Ok(progress)
    }
}

/// Thread-safe registry of milestones.
#[derive(Debug, Default)]
pub struct MilestoneRegistry {
    inner: RwLock<MilestoneInner>,
}

impl MilestoneRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a milestone covering `components`.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRegistered` if the name is taken.
    pub fn register_milestone<I, C>(
        &self,
        name: impl Into<MilestoneName>,
        components: I,
        status: Status,
    ) -> Result<()>
    where
        I: IntoIterator<Item = C>,
        C: Into<ComponentId>,
    {
        let name = name.into();
        let mut inner = self.inner.write();

        if inner.milestones.contains_key(&name) {
            return Err(Error::AlreadyRegistered {
                kind: EntityKind::Milestone,
                name: name.to_string(),
            });
        }

        let milestone = Milestone {
            name: name.clone(),
            components: components.into_iter().map(Into::into).collect(),
            status,
            dependencies: BTreeSet::new(),
            progress: status_progress(status),
            history: vec![StatusRecord { status, at: Utc::now() }],
        };
        tracing::debug!(
            milestone = %name,
            components = milestone.components.len(),
            %status,
            "registered milestone"
        );
        inner.graph.add_node(name.clone());
        inner.milestones.insert(name, milestone);
        Ok(())
    }

    /// Declares that `milestone` depends on `dependency`.
    ///
    /// Returns false, leaving the registry unchanged, when either name is
    /// unknown, the names are equal, or the edge would close a cycle.
    pub fn declare_milestone_dependency(&self, milestone: &MilestoneName, dependency: &MilestoneName) -> bool {
        let mut inner = self.inner.write();
        if !inner.milestones.contains_key(milestone) || !inner.milestones.contains_key(dependency) {
            return false;
        }

        if let Err(err) = inner.graph.add_edge(milestone, dependency) {
            tracing::debug!(%milestone, %dependency, error = %err, "milestone dependency rejected");
            return false;
        }
        if let Some(entry) = inner.milestones.get_mut(milestone) {
            entry.dependencies.insert(dependency.clone());
        }
        tracing::debug!(%milestone, %dependency, "declared milestone dependency");

        inner.refresh(milestone).is_ok()
    }

    /// Moves a milestone to `status`, records it and recalculates progress.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown milestone.
    pub fn update_milestone_status(&self, name: &MilestoneName, status: Status) -> Result<()> {
        let mut inner = self.inner.write();
        let milestone = inner
            .milestones
            .get_mut(name)
            .ok_or_else(|| Error::not_found(EntityKind::Milestone, name))?;

        milestone.status = status;
        milestone.history.push(StatusRecord { status, at: Utc::now() });
        tracing::debug!(milestone = %name, %status, "milestone status updated");

        inner.refresh(name)?;
        Ok(())
    }

    /// Recomputes and stores a milestone's progress.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown milestone.
    pub fn recalculate_progress(&self, name: &MilestoneName) -> Result<f64> {
        self.inner.write().refresh(name)
    }

    /// Recomputes every milestone's progress, dependencies first.
    ///
    /// # Errors
    ///
    /// Propagates graph errors; none occur while the acyclic invariant holds.
    pub fn recalculate_all(&self) -> Result<()> {
        let mut inner = self.inner.write();
        let order = inner.graph.topological_order()?;
        for name in order {
            inner.refresh(&name)?;
        }
        Ok(())
    }

    /// Risk view of a milestone. Does not modify stored progress.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown milestone.
    pub fn assess_risk(&self, name: &MilestoneName) -> Result<RiskAssessment> {
        let inner = self.inner.read();
        let milestone = inner.milestone(name)?;

        let unresolved_dependencies = inner
            .graph
            .dependencies(name)
            .into_iter()
            .filter(|dep| {
                inner
                    .milestones
                    .get(dep)
                    .is_some_and(|m| m.status != Status::Completed)
            })
            .collect();

        Ok(RiskAssessment {
            blocked: milestone.status == Status::Blocked,
            on_hold: milestone.status == Status::OnHold,
            unresolved_dependencies,
            completion: inner.progress_of(name)?,
        })
    }

    /// Returns a copy of the milestone, or `None` if it is unknown.
    #[must_use]
    pub fn get_milestone(&self, name: &MilestoneName) -> Option<Milestone> {
        self.inner.read().milestones.get(name).cloned()
    }

    /// All milestones, sorted by name.
    #[must_use]
    pub fn milestones(&self) -> Vec<Milestone> {
        let inner = self.inner.read();
        let mut milestones: Vec<Milestone> = inner.milestones.values().cloned().collect();
        milestones.sort_by(|a, b| a.name.cmp(&b.name));
        milestones
    }

    /// Names of milestones covering `component`, sorted.
    #[must_use]
    pub fn milestones_for_component(&self, component: &ComponentId) -> Vec<MilestoneName> {
        let inner = self.inner.read();
        let mut names: Vec<MilestoneName> = inner
            .milestones
            .values()
            .filter(|m| m.components.contains(component))
            .map(|m| m.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Milestones covering `component` or anything that transitively
    /// depends on it.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the component registry doesn't know
    /// `component`.
    pub fn impacted_milestones(
        &self,
        component: &ComponentId,
        components: &ComponentRegistry,
    ) -> Result<BTreeSet<MilestoneName>> {
        let mut changed = components.analyze_dependency_impact(component)?;
        changed.insert(component.clone());

        let inner = self.inner.read();
        Ok(inner
            .milestones
            .values()
            .filter(|m| !m.components.is_disjoint(&changed))
            .map(|m| m.name.clone())
            .collect())
    }

    /// Milestone-level node and edge dump.
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

    /// Number of registered milestones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().milestones.len()
    }

    /// Returns true if no milestone is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().milestones.is_empty()
    }

    /// Removes every milestone.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.milestones.clear();
        inner.graph.clear();
    }
}
