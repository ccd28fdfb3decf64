//! YAML manifest describing a system to load into fresh registries.
//!
//! ```yaml
//! components:
//!   - id: database
//!     version: "1.4.0"
//!     state: UP
//!     contract:
//!       transactions: true
//!   - id: api
//!     version: "2.0.0"
//!     depends_on: [database]
//!     constraints:
//!       database: ">=1.0,<2.0"
//!     observed:
//!       database: "1.4.0"
//! features:
//!   - name: login
//!     component: api
//!     status: IN_PROGRESS
//! milestones:
//!   - name: beta
//!     components: [api, database]
//!     depends_on: []
//! ```
//!
//! The manifest is read once and never written back.

use crate::domain::{
    ComponentId, ComponentRegistration, ComponentState, Contract, FeatureName, MilestoneName,
    Status,
};
use crate::error::{Error, Result};
use crate::features::FeatureRegistry;
use crate::milestones::MilestoneRegistry;
use crate::registry::ComponentRegistry;
use crate::version::{Version, VersionConstraint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// File name searched for during discovery.
pub const MANIFEST_FILE_NAME: &str = "trellis.yaml";

/// Maximum directory depth to traverse when searching for a manifest
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Components and their dependency declarations.
    #[serde(default)]
    pub components: Vec<ComponentEntry>,

    /// Tracked features.
    #[serde(default)]
    pub features: Vec<FeatureEntry>,

    /// Tracked milestones.
    #[serde(default)]
    pub milestones: Vec<MilestoneEntry>,
}

/// One component declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentEntry {
    /// Component id.
    pub id: ComponentId,

    /// The component's own version.
    #[serde(default)]
    pub version: Option<Version>,

    /// Direct dependencies.
    #[serde(default)]
    pub depends_on: Vec<ComponentId>,

    /// Constraints on dependencies.
    #[serde(default)]
    pub constraints: BTreeMap<ComponentId, VersionConstraint>,

    /// Dependency versions this component was built against.
    #[serde(default)]
    pub observed: BTreeMap<ComponentId, Version>,

    /// Exposed capabilities.
    #[serde(default)]
    pub contract: Option<Contract>,

    /// Operational state.
    #[serde(default)]
    pub state: Option<ComponentState>,
}

/// One feature declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureEntry {
    /// Feature name.
    pub name: FeatureName,

    /// Owning component.
    pub component: ComponentId,

    /// Initial status.
    #[serde(default)]
    pub status: Status,

    /// Feature-level dependencies.
    #[serde(default)]
    pub depends_on: Vec<FeatureName>,
}

/// One milestone declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MilestoneEntry {
    /// Milestone name.
    pub name: MilestoneName,

    /// Covered components.
    #[serde(default)]
    pub components: Vec<ComponentId>,

    /// Initial status.
    #[serde(default)]
    pub status: Status,

    /// Milestone-level dependencies.
    #[serde(default)]
    pub depends_on: Vec<MilestoneName>,
}

impl ComponentEntry {
    fn registration(&self) -> ComponentRegistration {
        let mut registration = ComponentRegistration::new(self.id.clone())
            .depends_on(self.depends_on.iter().cloned());
        registration.constraints = self.constraints.clone();
        registration.versions = self.observed.clone();
        if let Some(version) = &self.version {
            registration = registration.version(version.clone());
        }
        registration.contract = self.contract.clone();
        registration.state = self.state;
        registration
    }
}

/// The three registries built from a manifest.
#[derive(Debug, Default)]
pub struct Registries {
    /// Component graph.
    pub components: ComponentRegistry,
    /// Feature projection.
    pub features: FeatureRegistry,
    /// Milestone projection.
    pub milestones: MilestoneRegistry,
}

impl Manifest {
    /// Parses a manifest from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Yaml` for malformed documents, including bad version
    /// or constraint strings.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file can't be read, `Error::Yaml` if it
    /// can't be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest = Self::parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            components = manifest.components.len(),
            features = manifest.features.len(),
            milestones = manifest.milestones.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Builds fresh registries from the manifest.
    ///
    /// Components are registered in file order, features and milestones are
    /// registered before their dependencies are linked, and milestone
    /// progress is settled dependencies first once every edge exists.
    ///
    /// # Errors
    ///
    /// Fails on the first registration error (cycle, constraint violation,
    /// duplicate feature or milestone, unknown feature dependency).
    pub fn build(&self) -> Result<Registries> {
        let registries = Registries::default();
        self.load_components(&registries.components)?;
        self.load_features(&registries.features, &registries.components)?;
        self.load_milestones(&registries.milestones, &registries.components)?;
        Ok(registries)
    }

    fn load_components(&self, registry: &ComponentRegistry) -> Result<()> {
        let mut seen = BTreeSet::new();
        for entry in &self.components {
            if !seen.insert(&entry.id) {
                tracing::warn!(component = %entry.id, "component declared more than once, merging");
            }
            registry.register(entry.registration())?;
        }
        Ok(())
    }

    fn load_features(&self, registry: &FeatureRegistry, components: &ComponentRegistry) -> Result<()> {
        for entry in &self.features {
            if !components.contains(&entry.component) {
                tracing::warn!(
                    feature = %entry.name,
                    component = %entry.component,
                    "feature owned by undeclared component"
                );
            }
            registry.register_feature(entry.name.clone(), entry.component.clone(), entry.status)?;
        }
        for entry in &self.features {
            for dependency in &entry.depends_on {
                registry.link_feature_dependency(&entry.name, dependency)?;
            }
        }
        Ok(())
    }

    fn load_milestones(&self, registry: &MilestoneRegistry, components: &ComponentRegistry) -> Result<()> {
        for entry in &self.milestones {
            for component in entry.components.iter().filter(|c| !components.contains(c)) {
                tracing::warn!(
                    milestone = %entry.name,
                    %component,
                    "milestone covers undeclared component"
                );
            }
            registry.register_milestone(entry.name.clone(), entry.components.iter().cloned(), entry.status)?;
        }
        for entry in &self.milestones {
            for dependency in &entry.depends_on {
                if !registry.declare_milestone_dependency(&entry.name, dependency) {
                    return Err(Error::Config(format!(
                        "milestone '{}' cannot depend on '{dependency}': unknown, self or cyclic",
                        entry.name
                    )));
                }
            }
        }
        registry.recalculate_all()
    }
}

/// Walks up from `start_dir` looking for [`MANIFEST_FILE_NAME`].
///
/// Returns the manifest path, or `None` once the filesystem root or the
/// traversal limit is reached.
pub fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        let candidate = current.join(MANIFEST_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

/// Picks the manifest to load: an explicit path wins, otherwise discovery
/// from `start_dir`.
///
/// # Errors
///
/// Returns `Error::Config` when no explicit path is given and discovery
/// finds nothing.
pub fn resolve_manifest(explicit: Option<&Path>, start_dir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    find_manifest(start_dir).ok_or_else(|| {
        Error::Config(format!(
            "no {MANIFEST_FILE_NAME} found in {} or its parents",
            start_dir.display()
        ))
    })
}
