//! Command execution logic.
//!
//! Each function reads from the loaded [`App`] and prints in the requested
//! [`OutputMode`]. Registry errors are passed up unchanged for `main` to
//! report.

use anyhow::{Result, bail};
use std::io;

use super::args::{
    CheckArgs, ComponentsArgs, DepsArgs, ExportArgs, FeatureArgs, FeaturesArgs, GraphKind,
    ImpactArgs, MilestoneArgs, MilestonesArgs, RiskArgs,
};
use crate::app::App;
use crate::domain::{ComponentId, FeatureName, MilestoneName};
use crate::error::{EntityKind, Error};
use crate::output::{self, FeatureReport, MilestoneReport, OutputConfig, OutputMode};
use crate::registry::{Change, ConstraintViolation};

/// Execute the components command
pub fn execute_components(app: &App, args: &ComponentsArgs, output_mode: OutputMode) -> Result<()> {
    let mut components = app.components().components();
    if let Some(name) = &args.milestone {
        let milestone = app
            .milestones()
            .get_milestone(&MilestoneName::from(name.as_str()))
            .ok_or_else(|| Error::not_found(EntityKind::Milestone, name))?;
        components.retain(|c| milestone.components.contains(&c.id));
    }

    match output_mode {
        OutputMode::Json => output::print_json(&components)?,
        OutputMode::Text => {
            output::print_components(&mut io::stdout().lock(), &components, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the deps command
pub fn execute_deps(app: &App, args: &DepsArgs, output_mode: OutputMode) -> Result<()> {
    let id = ComponentId::from(args.id.as_str());
    let registry = app.components();
    if !registry.contains(&id) {
        return Err(Error::not_found(EntityKind::Component, &id).into());
    }

    let related: Vec<ComponentId> = match (args.reverse, args.transitive) {
        (false, false) => registry.get_dependencies(&id).into_iter().collect(),
        (false, true) => registry.get_all_dependencies(&id),
        (true, false) => registry.get_dependents(&id).into_iter().collect(),
        (true, true) => registry.analyze_dependency_impact(&id)?.into_iter().collect(),
    };

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "component": id,
            "direction": if args.reverse { "dependents" } else { "dependencies" },
            "transitive": args.transitive,
            "components": related,
        }))?,
        OutputMode::Text => {
            let heading = match (args.reverse, args.transitive) {
                (false, false) => "Dependencies",
                (false, true) => "All dependencies",
                (true, false) => "Dependents",
                (true, true) => "All dependents",
            };
            output::print_dependencies(
                &mut io::stdout().lock(),
                heading,
                &id,
                &related,
                &OutputConfig::from_env(),
            )?;
        }
    }
    Ok(())
}

/// Execute the impact command
pub fn execute_impact(app: &App, args: &ImpactArgs, output_mode: OutputMode) -> Result<()> {
    let id = ComponentId::from(args.id.as_str());
    let change = match (&args.upgrade, args.remove) {
        (Some(version), _) => Change::Upgrade {
            id,
            version: version.clone(),
        },
        (None, true) => Change::Remove(id),
        (None, false) => Change::Modify(id),
    };

    let report = app.components().analyze_impact(&change)?;
    match output_mode {
        OutputMode::Json => output::print_json(&report)?,
        OutputMode::Text => {
            output::print_impact(&mut io::stdout().lock(), &report, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the risk command
pub fn execute_risk(app: &App, args: &RiskArgs, output_mode: OutputMode) -> Result<()> {
    let id = ComponentId::from(args.id.as_str());
    let risk = app.components().calculate_compatibility_risk(&id)?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "component": id,
            "score": risk.score,
            "breakdown": risk.breakdown,
        }))?,
        OutputMode::Text => {
            output::print_risk(&mut io::stdout().lock(), &id, &risk, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the check command.
///
/// Fails (non-zero exit) when any checked constraint is violated.
pub fn execute_check(app: &App, args: &CheckArgs, output_mode: OutputMode) -> Result<()> {
    let registry = app.components();
    let mut violations = registry.find_violations();

    if let Some(name) = &args.id {
        let id = ComponentId::from(name.as_str());
        // Also validates that the component exists.
        registry.check_version_compatibility(&id)?;
        violations.retain(|v| v.dependency == id);
    }

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "compatible": violations.is_empty(),
            "violations": violations,
        }))?,
        OutputMode::Text => {
            output::print_violations(&mut io::stdout().lock(), &violations, &OutputConfig::from_env())?;
        }
    }

    gate(&violations)
}

fn gate(violations: &[ConstraintViolation]) -> Result<()> {
    if let Some(first) = violations.first() {
        bail!(Error::VersionCompatibility {
            component: first.dependency.to_string(),
            constraint: first.constraint.clone(),
            version: first.version.clone(),
        });
    }
    Ok(())
}

/// Execute the export command
pub fn execute_export(app: &App, args: &ExportArgs, output_mode: OutputMode) -> Result<()> {
    let export = match args.graph {
        GraphKind::Components => app.components().export_for_visualization(),
        GraphKind::Features => app.features().export_for_visualization(),
        GraphKind::Milestones => app.milestones().export_for_visualization(),
    };

    match output_mode {
        OutputMode::Json => output::print_json(&export)?,
        OutputMode::Text => {
            output::print_export(&mut io::stdout().lock(), &export, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the features command
pub fn execute_features(app: &App, args: &FeaturesArgs, output_mode: OutputMode) -> Result<()> {
    let registry = app.features();
    let mut features = registry.features();

    if let Some(component) = &args.impacted_by {
        let impacted = registry.analyze_feature_impact_from_component_change(
            &ComponentId::from(component.as_str()),
            app.components(),
        )?;
        features.retain(|f| impacted.contains(&f.name));
    }
    if let Some(component) = &args.component {
        features.retain(|f| f.component.as_str() == component);
    }

    match output_mode {
        OutputMode::Json => output::print_json(&features)?,
        OutputMode::Text => {
            output::print_features(&mut io::stdout().lock(), &features, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the feature command
pub fn execute_feature(app: &App, args: &FeatureArgs, output_mode: OutputMode) -> Result<()> {
    let registry = app.features();
    let name = FeatureName::from(args.name.as_str());
    let feature = registry
        .get_feature(&name)
        .ok_or_else(|| Error::not_found(EntityKind::Feature, &name))?;

    let backward_compatible = registry.check_feature_backward_compatibility(&name, app.components())?;
    let (risk_score, risk) = match registry.feature_compatibility_risk(&name, app.components()) {
        Ok((score, breakdown)) => (Some(score), breakdown),
        Err(err) if err.is_not_found() => (None, Default::default()),
        Err(err) => return Err(err.into()),
    };
    let report = FeatureReport {
        blocking: registry.blocking_dependencies(&name)?,
        feature,
        backward_compatible,
        risk_score,
        risk,
    };

    match output_mode {
        OutputMode::Json => output::print_json(&report)?,
        OutputMode::Text => {
            output::print_feature_report(&mut io::stdout().lock(), &report, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the milestones command
pub fn execute_milestones(app: &App, args: &MilestonesArgs, output_mode: OutputMode) -> Result<()> {
    let registry = app.milestones();
    let mut milestones = registry.milestones();

    if let Some(component) = &args.impacted_by {
        let impacted =
            registry.impacted_milestones(&ComponentId::from(component.as_str()), app.components())?;
        milestones.retain(|m| impacted.contains(&m.name));
    }

    match output_mode {
        OutputMode::Json => output::print_json(&milestones)?,
        OutputMode::Text => {
            output::print_milestones(&mut io::stdout().lock(), &milestones, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the milestone command
pub fn execute_milestone(app: &App, args: &MilestoneArgs, output_mode: OutputMode) -> Result<()> {
    let registry = app.milestones();
    let name = MilestoneName::from(args.name.as_str());
    let milestone = registry
        .get_milestone(&name)
        .ok_or_else(|| Error::not_found(EntityKind::Milestone, &name))?;
    let report = MilestoneReport {
        assessment: registry.assess_risk(&name)?,
        milestone,
    };

    match output_mode {
        OutputMode::Json => output::print_json(&report)?,
        OutputMode::Text => {
            output::print_milestone_report(&mut io::stdout().lock(), &report, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}
