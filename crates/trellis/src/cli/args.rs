//! CLI argument structs for all commands.

use clap::{Parser, ValueEnum};

use crate::version::Version;

/// Arguments for the `components` command
#[derive(Parser, Debug, Clone, Default)]
pub struct ComponentsArgs {
    /// Only list components covered by this milestone
    #[arg(long)]
    pub milestone: Option<String>,
}

/// Arguments for the `deps` command
#[derive(Parser, Debug, Clone)]
pub struct DepsArgs {
    /// Component id
    pub id: String,

    /// Include indirect dependencies
    #[arg(short, long)]
    pub transitive: bool,

    /// List dependents instead of dependencies
    #[arg(short = 'r', long)]
    pub reverse: bool,
}

/// Arguments for the `impact` command
#[derive(Parser, Debug, Clone)]
pub struct ImpactArgs {
    /// Component id
    pub id: String,

    /// Analyse an upgrade to this version
    #[arg(long, value_parser = Version::parse, conflicts_with = "remove")]
    pub upgrade: Option<Version>,

    /// Analyse removing the component
    #[arg(long)]
    pub remove: bool,
}

/// Arguments for the `risk` command
#[derive(Parser, Debug, Clone)]
pub struct RiskArgs {
    /// Component id
    pub id: String,
}

/// Arguments for the `check` command
#[derive(Parser, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Check a single component; checks every edge when omitted
    pub id: Option<String>,
}

/// Which graph to export
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraphKind {
    /// Component dependency graph
    #[default]
    Components,
    /// Feature dependency graph
    Features,
    /// Milestone dependency graph
    Milestones,
}

/// Arguments for the `export` command
#[derive(Parser, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Graph to export
    #[arg(short, long, value_enum, default_value = "components")]
    pub graph: GraphKind,
}

/// Arguments for the `features` command
#[derive(Parser, Debug, Clone, Default)]
pub struct FeaturesArgs {
    /// Only features affected by a change to this component
    #[arg(long, conflicts_with = "component")]
    pub impacted_by: Option<String>,

    /// Only features owned by this component
    #[arg(short, long)]
    pub component: Option<String>,
}

/// Arguments for the `feature` command
#[derive(Parser, Debug, Clone)]
pub struct FeatureArgs {
    /// Feature name
    pub name: String,
}

/// Arguments for the `milestones` command
#[derive(Parser, Debug, Clone, Default)]
pub struct MilestonesArgs {
    /// Only milestones affected by a change to this component
    #[arg(long)]
    pub impacted_by: Option<String>,
}

/// Arguments for the `milestone` command
#[derive(Parser, Debug, Clone)]
pub struct MilestoneArgs {
    /// Milestone name
    pub name: String,
}
