//! Application context for CLI command execution.
//!
//! # Example
//!
//! ```no_run
//! use trellis::app::App;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new("."), None)?;
//!     println!("{} components", app.components().len());
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::features::FeatureRegistry;
use crate::manifest::{Manifest, Registries, resolve_manifest};
use crate::milestones::MilestoneRegistry;
use crate::registry::ComponentRegistry;
use std::path::{Path, PathBuf};

/// Registries loaded from a manifest, plus where the manifest came from.
#[derive(Debug)]
pub struct App {
    registries: Registries,
    manifest_path: PathBuf,
}

impl App {
    /// Loads the manifest for `working_dir`.
    ///
    /// `explicit` (from `--manifest` or `TRELLIS_MANIFEST`) takes precedence
    /// over walking up from `working_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if no manifest is found, it can't be parsed, or
    /// building the registries fails.
    pub fn from_directory(working_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let manifest_path = resolve_manifest(explicit, working_dir)?;
        let registries = Manifest::load(&manifest_path)?.build()?;

        tracing::debug!(path = %manifest_path.display(), "app ready");
        Ok(Self {
            registries,
            manifest_path,
        })
    }

    /// The component registry.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.registries.components
    }

    /// The feature registry.
    #[must_use]
    pub fn features(&self) -> &FeatureRegistry {
        &self.registries.features
    }

    /// The milestone registry.
    #[must_use]
    pub fn milestones(&self) -> &MilestoneRegistry {
        &self.registries.milestones
    }

    /// Path of the loaded manifest.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }
}
