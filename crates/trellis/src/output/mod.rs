//! Output formatting for CLI commands.
//!
//! Every command prints either human-readable text or pretty JSON. The text
//! printers take any [`Write`] so they can be exercised in tests.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers (semantic colors, icons)

pub mod color;

use crate::domain::{Component, ComponentId, Feature, FeatureName, GraphExport, Milestone};
use crate::milestones::RiskAssessment;
use crate::registry::{CompatibilityRisk, ConstraintViolation, ImpactReport, RiskStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, Write};

pub use color::{error, info, success, warning};

use color::{bold, colorize_risk, colorize_state, colorize_status, dimmed, status_icon};

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new `OutputConfig` with explicit values.
    pub fn new(use_ascii: bool, use_colors: bool) -> Self {
        Self {
            use_ascii,
            use_colors,
        }
    }

    /// Create an `OutputConfig` by reading from environment variables.
    ///
    /// Reads:
    /// - `TRELLIS_ASCII`: Set to "1" or "true" for ASCII-only icons (default: false)
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `TRELLIS_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        let use_ascii = match env::var("TRELLIS_ASCII") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Ok(v) => {
                tracing::warn!(
                    env_var = "TRELLIS_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            Err(_) => false,
        };

        // https://no-color.org/
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("TRELLIS_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Everything the `feature` command reports about one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReport {
    /// The feature itself.
    pub feature: Feature,
    /// Whether the owning components of the feature and its dependencies
    /// accept their current versions.
    pub backward_compatible: bool,
    /// Risk score of the owning component, if the component is known.
    pub risk_score: Option<f64>,
    /// Per-feature risk breakdown.
    pub risk: BTreeMap<FeatureName, RiskStatus>,
    /// Direct dependencies not yet completed.
    pub blocking: Vec<FeatureName>,
}

/// Everything the `milestone` command reports about one milestone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneReport {
    /// The milestone itself.
    pub milestone: Milestone,
    /// Its risk assessment.
    pub assessment: RiskAssessment,
}

/// Print any serializable value as pretty JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(handle, "{json}")
}

fn version_text(component: &Component, config: &OutputConfig) -> String {
    component
        .version
        .as_ref()
        .map_or_else(|| dimmed("-", config), ToString::to_string)
}

/// Print one line per component: id, version, state.
pub fn print_components<W: Write>(
    w: &mut W,
    components: &[Component],
    config: &OutputConfig,
) -> io::Result<()> {
    if components.is_empty() {
        return writeln!(w, "No components.");
    }
    let width = components.iter().map(|c| c.id.as_str().len()).max().unwrap_or(0);
    for component in components {
        let id = format!("{:<width$}", component.id.as_str());
        writeln!(
            w,
            "{}  {:<12}  {}",
            info(&id, config),
            version_text(component, config),
            colorize_state(component.state, config)
        )?;
    }
    Ok(())
}

/// Print components related to `id` under a heading such as "Dependents".
pub fn print_dependencies<W: Write>(
    w: &mut W,
    heading: &str,
    id: &ComponentId,
    related: &[ComponentId],
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(w, "{} of {}:", bold(heading, config), info(id.as_str(), config))?;
    if related.is_empty() {
        return writeln!(w, "  {}", dimmed("(none)", config));
    }
    for dep in related {
        writeln!(w, "  {}", info(dep.as_str(), config))?;
    }
    Ok(())
}

/// Print an impact report.
pub fn print_impact<W: Write>(w: &mut W, report: &ImpactReport, config: &OutputConfig) -> io::Result<()> {
    writeln!(
        w,
        "{} {}",
        bold("Impact of changing", config),
        info(report.change.target().as_str(), config)
    )?;
    if report.affected.is_empty() {
        return writeln!(w, "  {}", dimmed("no dependents", config));
    }
    for id in &report.affected {
        let mut line = info(id.as_str(), config);
        if report.direct.contains(id) {
            line.push_str(&dimmed(" (direct)", config));
        }
        if report.incompatible.contains(id) {
            line.push_str(&format!(" {}", error("incompatible", config)));
        }
        writeln!(w, "  {line}")?;
    }
    Ok(())
}

/// Print a compatibility risk score and breakdown.
pub fn print_risk<W: Write>(
    w: &mut W,
    id: &ComponentId,
    risk: &CompatibilityRisk,
    config: &OutputConfig,
) -> io::Result<()> {
    let score = format!("{:.1}", risk.score);
    let score = if risk.score > 0.0 {
        warning(&score, config)
    } else {
        success(&score, config)
    };
    writeln!(w, "{} {}: {score}", bold("Compatibility risk for", config), info(id.as_str(), config))?;
    for (dependent, status) in &risk.breakdown {
        writeln!(w, "  {}  {}", info(dependent.as_str(), config), colorize_risk(*status, config))?;
    }
    Ok(())
}

/// Print constraint violations, or a confirmation when there are none.
pub fn print_violations<W: Write>(
    w: &mut W,
    violations: &[ConstraintViolation],
    config: &OutputConfig,
) -> io::Result<()> {
    if violations.is_empty() {
        return writeln!(w, "{}", success("All declared constraints are satisfied.", config));
    }
    writeln!(w, "{}", error(&format!("{} constraint violation(s):", violations.len()), config))?;
    for violation in violations {
        writeln!(
            w,
            "  {} requires {} {}, found {}",
            info(violation.dependent.as_str(), config),
            info(violation.dependency.as_str(), config),
            violation.constraint,
            warning(&violation.version, config)
        )?;
    }
    Ok(())
}

/// Print a node and edge dump.
pub fn print_export<W: Write>(w: &mut W, export: &GraphExport, config: &OutputConfig) -> io::Result<()> {
    writeln!(w, "{} ({})", bold("Nodes", config), export.nodes.len())?;
    for node in &export.nodes {
        writeln!(w, "  {}", info(node, config))?;
    }
    writeln!(w, "{} ({})", bold("Edges", config), export.edges.len())?;
    for (from, to) in &export.edges {
        writeln!(w, "  {} -> {}", info(from, config), info(to, config))?;
    }
    Ok(())
}

/// Print one line per feature.
pub fn print_features<W: Write>(w: &mut W, features: &[Feature], config: &OutputConfig) -> io::Result<()> {
    if features.is_empty() {
        return writeln!(w, "No features.");
    }
    for feature in features {
        writeln!(
            w,
            "{} {} [{}] {}",
            status_icon(feature.status, config),
            info(feature.name.as_str(), config),
            colorize_status(feature.status, config),
            dimmed(&format!("({})", feature.component), config)
        )?;
    }
    Ok(())
}

/// Print a feature report.
pub fn print_feature_report<W: Write>(
    w: &mut W,
    report: &FeatureReport,
    config: &OutputConfig,
) -> io::Result<()> {
    let feature = &report.feature;
    writeln!(
        w,
        "{} {} [{}]",
        status_icon(feature.status, config),
        bold(feature.name.as_str(), config),
        colorize_status(feature.status, config)
    )?;
    writeln!(w, "  {} {}", dimmed("Component:", config), info(feature.component.as_str(), config))?;

    let compatible = if report.backward_compatible {
        success("yes", config)
    } else {
        error("no", config)
    };
    writeln!(w, "  {} {compatible}", dimmed("Backward compatible:", config))?;

    match report.risk_score {
        Some(score) => writeln!(w, "  {} {score:.1}", dimmed("Risk score:", config))?,
        None => writeln!(w, "  {} {}", dimmed("Risk score:", config), dimmed("unknown component", config))?,
    }

    if !feature.dependencies.is_empty() {
        let deps: Vec<&str> = feature.dependencies.iter().map(FeatureName::as_str).collect();
        writeln!(w, "  {} {}", dimmed("Depends on:", config), deps.join(", "))?;
    }
    if !report.blocking.is_empty() {
        let blocking: Vec<&str> = report.blocking.iter().map(FeatureName::as_str).collect();
        writeln!(w, "  {} {}", dimmed("Blocked by:", config), warning(&blocking.join(", "), config))?;
    }

    if !feature.history.is_empty() {
        writeln!(w, "  {}", dimmed("History:", config))?;
        for change in &feature.history {
            writeln!(
                w,
                "    {} {} -> {}",
                change.at.format("%Y-%m-%d %H:%M:%S"),
                colorize_status(change.from, config),
                colorize_status(change.to, config)
            )?;
        }
    }
    Ok(())
}

/// Print one line per milestone with its progress.
pub fn print_milestones<W: Write>(
    w: &mut W,
    milestones: &[Milestone],
    config: &OutputConfig,
) -> io::Result<()> {
    if milestones.is_empty() {
        return writeln!(w, "No milestones.");
    }
    for milestone in milestones {
        writeln!(
            w,
            "{} {} [{}] {:>3.0}%",
            status_icon(milestone.status, config),
            info(milestone.name.as_str(), config),
            colorize_status(milestone.status, config),
            milestone.progress * 100.0
        )?;
    }
    Ok(())
}

/// Print a milestone report.
pub fn print_milestone_report<W: Write>(
    w: &mut W,
    report: &MilestoneReport,
    config: &OutputConfig,
) -> io::Result<()> {
    let milestone = &report.milestone;
    let assessment = &report.assessment;
    writeln!(
        w,
        "{} {} [{}]",
        status_icon(milestone.status, config),
        bold(milestone.name.as_str(), config),
        colorize_status(milestone.status, config)
    )?;

    let components: Vec<&str> = milestone.components.iter().map(ComponentId::as_str).collect();
    writeln!(w, "  {} {}", dimmed("Components:", config), components.join(", "))?;
    writeln!(w, "  {} {:.0}%", dimmed("Completion:", config), assessment.completion * 100.0)?;

    if assessment.blocked {
        writeln!(w, "  {}", error("Milestone is blocked", config))?;
    }
    if assessment.on_hold {
        writeln!(w, "  {}", warning("Milestone is on hold", config))?;
    }
    if !assessment.unresolved_dependencies.is_empty() {
        let names: Vec<&str> = assessment
            .unresolved_dependencies
            .iter()
            .map(|name| name.as_str())
            .collect();
        writeln!(w, "  {} {}", dimmed("Unresolved:", config), warning(&names.join(", "), config))?;
    }
    Ok(())
}
