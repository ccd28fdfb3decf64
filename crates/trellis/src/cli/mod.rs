//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `components`: List components with version and state
//! - `deps`: Show dependencies (or dependents) of a component
//! - `impact`: Show what a change to a component affects
//! - `risk`: Show the compatibility risk score of a component
//! - `check`: Fail if any declared version constraint is violated
//! - `export`: Dump nodes and edges of a graph
//! - `features` / `feature`: List features or inspect one
//! - `milestones` / `milestone`: List milestones or assess one
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//! - `--manifest <PATH>`: Manifest to load (also `TRELLIS_MANIFEST`)
//!
//! # Example
//!
//! ```bash
//! trellis deps api --transitive
//! trellis impact database --upgrade 2.0.0
//! trellis --json check
//! ```

mod args;
mod execute;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use args::{
    CheckArgs, ComponentsArgs, DepsArgs, ExportArgs, FeatureArgs, FeaturesArgs, GraphKind,
    ImpactArgs, MilestoneArgs, MilestonesArgs, RiskArgs,
};

/// Trellis - a dependency and compatibility registry
///
/// Loads a `trellis.yaml` manifest describing components, features and
/// milestones, then answers dependency, impact and compatibility questions.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Manifest to load instead of searching for trellis.yaml
    #[arg(long, global = true, env = "TRELLIS_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List components
    ///
    /// Shows every component with its current version and operational state.
    Components(ComponentsArgs),

    /// Show dependencies of a component
    ///
    /// Direct dependencies by default; `--transitive` follows the whole
    /// chain and `--reverse` lists dependents instead.
    Deps(DepsArgs),

    /// Show the impact of changing a component
    ///
    /// Lists every component that transitively depends on the target. With
    /// `--upgrade` or `--remove`, also flags direct dependents that break.
    Impact(ImpactArgs),

    /// Show the compatibility risk of a component's current version
    Risk(RiskArgs),

    /// Check declared version constraints
    ///
    /// Exits with an error if any constraint is violated, which makes it
    /// usable as a CI gate.
    Check(CheckArgs),

    /// Export a graph as nodes and edges
    Export(ExportArgs),

    /// List features
    Features(FeaturesArgs),

    /// Show a feature with its compatibility and risk
    Feature(FeatureArgs),

    /// List milestones with progress
    Milestones(MilestonesArgs),

    /// Show a milestone's risk assessment
    Milestone(MilestoneArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest can't be loaded, a registry query
    /// fails, or `check` finds a violation.
    pub fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("Trellis dependency registry");
            println!("Use --help for more information");
            return Ok(());
        };

        let app = App::from_directory(&std::env::current_dir()?, self.manifest.as_deref())?;
        match command {
            Commands::Components(args) => execute::execute_components(&app, args, output_mode),
            Commands::Deps(args) => execute::execute_deps(&app, args, output_mode),
            Commands::Impact(args) => execute::execute_impact(&app, args, output_mode),
            Commands::Risk(args) => execute::execute_risk(&app, args, output_mode),
            Commands::Check(args) => execute::execute_check(&app, args, output_mode),
            Commands::Export(args) => execute::execute_export(&app, args, output_mode),
            Commands::Features(args) => execute::execute_features(&app, args, output_mode),
            Commands::Feature(args) => execute::execute_feature(&app, args, output_mode),
            Commands::Milestones(args) => execute::execute_milestones(&app, args, output_mode),
            Commands::Milestone(args) => execute::execute_milestone(&app, args, output_mode),
        }
    }
}
