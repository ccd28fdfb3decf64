//! Compatibility analysis: constraint validation and risk scoring.
//!
//! A dependent declares, per dependency edge, an optional constraint and
//! remembers the dependency version (and contract) it last observed. Two
//! questions are answered from that metadata:
//!
//! - **Is the current version acceptable?** Every dependent's declared
//!   constraint must accept the dependency's current version
//!   ([`check_version_compatibility_impl`]).
//! - **How risky is the current version?** Each dependent that observed a
//!   different version, or a contract whose capabilities have since changed,
//!   adds to the score ([`compatibility_risk_impl`]).

use super::inner::RegistryInner;
use crate::domain::{Component, ComponentId, EdgeMeta};
use crate::error::{Error, Result};
use crate::version::{Version, VersionConstraint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Penalty for a dependent whose observed version differs in its breaking part.
const BREAKING_VERSION_PENALTY: f64 = 1.0;

/// Penalty for a dependent whose observed version differs otherwise.
const VERSION_DRIFT_PENALTY: f64 = 0.5;

/// Penalty for a dependent whose observed capabilities were removed or changed.
const CONTRACT_PENALTY: f64 = 1.0;

/// Whether a dependent is affected by a component's current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskStatus {
    /// The dependent observed something that no longer holds.
    #[serde(rename = "at risk")]
    AtRisk,
    /// The dependent's expectations still hold.
    #[serde(rename = "ok")]
    Ok,
}

impl RiskStatus {
    pub(crate) fn from_score(score: f64) -> Self {
        if score > 0.0 { Self::AtRisk } else { Self::Ok }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AtRisk => "at risk",
            Self::Ok => "ok",
        })
    }
}

/// Risk score for one component plus a per-dependent breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRisk {
    /// Sum of per-dependent penalties. Zero iff no dependent is at risk.
    pub score: f64,

    /// Every direct dependent and whether it is at risk.
    pub breakdown: BTreeMap<ComponentId, RiskStatus>,
}

/// A declared constraint that a dependency's current version violates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// The component declaring the constraint.
    pub dependent: ComponentId,
    /// The component the constraint applies to.
    pub dependency: ComponentId,
    /// The constraint text.
    pub constraint: String,
    /// The dependency's current version.
    pub version: String,
}

/// Checks that every declared version satisfies its declared constraint.
///
/// Only ids present in both maps are checked; ids are visited in order so
/// the reported violation is deterministic.
///
/// # Errors
///
/// Returns [`Error::VersionCompatibility`] for the first violation.
pub fn validate_versions(
    constraints: &BTreeMap<ComponentId, VersionConstraint>,
    versions: &BTreeMap<ComponentId, Version>,
) -> Result<()> {
    for (id, constraint) in constraints {
        let Some(version) = versions.get(id) else {
            continue;
        };
        if !constraint.matches(version) {
            return Err(Error::VersionCompatibility {
                component: id.to_string(),
                constraint: constraint.to_string(),
                version: version.to_string(),
            });
        }
    }
    Ok(())
}

/// Penalty one dependent contributes to a component's risk score.
fn dependent_penalty(component: &Component, meta: &EdgeMeta) -> f64 {
    let mut penalty = 0.0;

    if let (Some(current), Some(observed)) = (&component.version, &meta.observed_version) {
        if current != observed {
            penalty += if current.is_breaking_change_from(observed) {
                BREAKING_VERSION_PENALTY
            } else {
                VERSION_DRIFT_PENALTY
            };
        }
    }

    if let Some(observed) = &meta.observed_contract {
        let changed = observed
            .iter()
            .any(|(capability, value)| component.contract.get(capability) != Some(value));
        if changed {
            penalty += CONTRACT_PENALTY;
        }
    }

    penalty
}

pub(super) fn compatibility_risk_impl(
    inner: &RegistryInner,
    id: &ComponentId,
) -> Result<CompatibilityRisk> {
    let component = inner.component(id)?;

    let mut score = 0.0;
    let mut breakdown = BTreeMap::new();
    for dependent in inner.graph.dependents(id) {
        let penalty = inner
            .edge(&dependent, id)
            .map_or(0.0, |meta| dependent_penalty(component, meta));
        score += penalty;
        breakdown.insert(dependent, RiskStatus::from_score(penalty));
    }

    Ok(CompatibilityRisk { score, breakdown })
}

pub(super) fn check_version_compatibility_impl(
    inner: &RegistryInner,
    id: &ComponentId,
) -> Result<bool> {
    let component = inner.component(id)?;
    let Some(version) = &component.version else {
        return Ok(true);
    };

    let compatible = inner.graph.dependents(id).iter().all(|dependent| {
        inner
            .edge(dependent, id)
            .and_then(|meta| meta.constraint.as_ref())
            .is_none_or(|constraint| constraint.matches(version))
    });
    Ok(compatible)
}

pub(super) fn find_violations_impl(inner: &RegistryInner) -> Vec<ConstraintViolation> {
    inner
        .graph
        .edges()
        .into_iter()
        .filter_map(|(dependent, dependency)| {
            let constraint = inner.edge(&dependent, &dependency)?.constraint.as_ref()?;
            let version = inner.components.get(&dependency)?.version.as_ref()?;
            if constraint.matches(version) {
                return None;
            }
            Some(ConstraintViolation {
                constraint: constraint.to_string(),
                version: version.to_string(),
                dependent,
                dependency,
            })
        })
        .collect()
}
