//! Integration tests for the component registry.
//!
//! Covers cycle-safe registration, constraint validation, risk scoring,
//! impact analysis and concurrent access.

use rstest::{fixture, rstest};
use std::collections::BTreeSet;
use trellis::domain::{ComponentId, ComponentRegistration, Contract};
use trellis::error::{Error, ErrorKind};
use trellis::registry::{Change, ComponentRegistry, RiskStatus};
use trellis::version::{Version, VersionConstraint};

fn id(s: &str) -> ComponentId {
    ComponentId::from(s)
}

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn c(s: &str) -> VersionConstraint {
    VersionConstraint::parse(s).unwrap()
}

fn ids(names: &[&str]) -> BTreeSet<ComponentId> {
    names.iter().map(|n| id(n)).collect()
}

/// `frontend -> api -> database`, all versioned.
#[fixture]
fn chain() -> ComponentRegistry {
    let registry = ComponentRegistry::new();
    registry
        .register(ComponentRegistration::new("database").version(v("1.0.0")))
        .unwrap();
    registry
        .register(
            ComponentRegistration::new("api")
                .version(v("2.0.0"))
                .depends_on(["database"])
                .observed("database", v("1.0.0")),
        )
        .unwrap();
    registry
        .register(
            ComponentRegistration::new("frontend")
                .version(v("3.0.0"))
                .depends_on(["api"]),
        )
        .unwrap();
    registry
}

// ============================================================================
// Graph Store
// ============================================================================

#[rstest]
fn test_impact_follows_reverse_edges(chain: ComponentRegistry) {
    let impact = chain.analyze_dependency_impact(&id("database")).unwrap();
    assert_eq!(impact, ids(&["api", "frontend"]));

    assert_eq!(chain.get_all_dependencies(&id("frontend")), vec![id("api"), id("database")]);
    assert_eq!(chain.get_dependents(&id("database")), ids(&["api"]));
}

#[rstest]
fn test_cycle_rejected_without_side_effects(chain: ComponentRegistry) {
    let before = chain.export_for_visualization();

    let err = chain
        .register(ComponentRegistration::new("database").depends_on(["cache", "frontend"]))
        .unwrap_err();

    assert!(matches!(err, Error::CircularDependency { .. }));
    assert_eq!(err.kind(), ErrorKind::Registration);
    assert_eq!(chain.export_for_visualization(), before);
    assert!(!chain.contains(&id("cache")));
}

#[test]
fn test_back_edge_rejected_after_dependency_registers() {
    let registry = ComponentRegistry::new();
    registry
        .register(ComponentRegistration::new("X").depends_on(["Y"]))
        .unwrap();
    registry.register(ComponentRegistration::new("Y")).unwrap();

    let err = registry
        .register(ComponentRegistration::new("Y").depends_on(["X"]))
        .unwrap_err();

    assert!(matches!(err, Error::CircularDependency { .. }));
    assert!(registry.get_dependencies(&id("Y")).is_empty());
    assert_eq!(registry.get_dependencies(&id("X")), ids(&["Y"]));
}

#[test]
fn test_self_dependency_rejected() {
    let registry = ComponentRegistry::new();
    let err = registry
        .register(ComponentRegistration::new("api").depends_on(["api"]))
        .unwrap_err();
    assert!(matches!(err, Error::SelfDependency(ref name) if name == "api"));
    assert!(registry.is_empty());
}

#[rstest]
fn test_topological_order_puts_dependencies_first(chain: ComponentRegistry) {
    let order = chain.topological_order().unwrap();
    let pos = |name: &str| order.iter().position(|c| c.as_str() == name).unwrap();
    assert!(pos("database") < pos("api"));
    assert!(pos("api") < pos("frontend"));
}

#[rstest]
fn test_unknown_component_queries(chain: ComponentRegistry) {
    assert!(chain.get_dependencies(&id("ghost")).is_empty());
    assert!(chain.get_all_dependencies(&id("ghost")).is_empty());

    let err = chain.analyze_dependency_impact(&id("ghost")).unwrap_err();
    assert!(err.is_not_found());
    let err = chain.calculate_compatibility_risk(&id("ghost")).unwrap_err();
    assert!(err.is_not_found());
}

#[rstest]
fn test_read_queries_are_idempotent(chain: ComponentRegistry) {
    let first = (
        chain.analyze_dependency_impact(&id("database")).unwrap(),
        chain.calculate_compatibility_risk(&id("database")).unwrap(),
        chain.export_for_visualization(),
    );
    let second = (
        chain.analyze_dependency_impact(&id("database")).unwrap(),
        chain.calculate_compatibility_risk(&id("database")).unwrap(),
        chain.export_for_visualization(),
    );
    assert_eq!(first, second);
}

// ============================================================================
// Version Constraints
// ============================================================================

#[test]
fn test_satisfied_constraints_register() {
    let registry = ComponentRegistry::new();
    registry
        .register(
            ComponentRegistration::new("app")
                .depends_on(["foo", "bar"])
                .constraint("foo", c(">=1.0"))
                .constraint("bar", c(">=1.0,<2.0"))
                .observed("foo", v("1.5.1"))
                .observed("bar", v("1.8.0")),
        )
        .unwrap();

    assert_eq!(registry.get_component(&id("bar")).unwrap().version, Some(v("1.8.0")));
    assert!(registry.check_version_compatibility(&id("bar")).unwrap());
}

#[test]
fn test_violated_constraint_names_offender() {
    let registry = ComponentRegistry::new();
    let err = registry
        .register(
            ComponentRegistration::new("app")
                .depends_on(["baz", "qux"])
                .constraint("baz", c(">=2.0"))
                .constraint("qux", c(">=1.0,<2.0"))
                .observed("baz", v("2.1.0"))
                .observed("qux", v("2.2.0")),
        )
        .unwrap_err();

    match err {
        Error::VersionCompatibility { component, .. } => assert_eq!(component, "qux"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(registry.is_empty());
}

#[rstest]
fn test_version_bump_breaks_constraint(chain: ComponentRegistry) {
    chain
        .register(
            ComponentRegistration::new("reports")
                .depends_on(["database"])
                .constraint("database", c(">=1.0,<2.0")),
        )
        .unwrap();
    assert!(chain.find_violations().is_empty());

    let impacted = chain.update_version(&id("database"), v("2.0.0")).unwrap();
    assert_eq!(impacted, ids(&["api", "frontend", "reports"]));

    assert!(!chain.check_version_compatibility(&id("database")).unwrap());
    let violations = chain.find_violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].dependent, id("reports"));
    assert_eq!(violations[0].version, "2.0.0");
}

#[test]
fn test_unversioned_component_is_compatible() {
    let registry = ComponentRegistry::new();
    registry
        .register(
            ComponentRegistration::new("api")
                .depends_on(["database"])
                .constraint("database", c(">=9.0")),
        )
        .unwrap();
    assert!(registry.check_version_compatibility(&id("database")).unwrap());
}

// ============================================================================
// Compatibility Risk
// ============================================================================

#[rstest]
fn test_no_drift_means_no_risk(chain: ComponentRegistry) {
    let risk = chain.calculate_compatibility_risk(&id("database")).unwrap();
    assert!(risk.score.abs() < f64::EPSILON);
    assert_eq!(risk.breakdown.get(&id("api")), Some(&RiskStatus::Ok));
}

#[rstest]
#[case("2.0.0", 1.0)]
#[case("1.1.0", 0.5)]
#[case("1.0.1", 0.5)]
fn test_version_drift_penalties(chain: ComponentRegistry, #[case] version: &str, #[case] expected: f64) {
    chain.update_version(&id("database"), v(version)).unwrap();

    let risk = chain.calculate_compatibility_risk(&id("database")).unwrap();
    assert!((risk.score - expected).abs() < f64::EPSILON);
    assert_eq!(risk.breakdown.get(&id("api")), Some(&RiskStatus::AtRisk));
}

#[test]
fn test_pre_1_0_minor_bump_is_breaking() {
    let registry = ComponentRegistry::new();
    registry
        .register(ComponentRegistration::new("lib").version(v("0.3.0")))
        .unwrap();
    registry
        .register(ComponentRegistration::new("app").depends_on(["lib"]))
        .unwrap();

    registry.update_version(&id("lib"), v("0.4.0")).unwrap();
    let risk = registry.calculate_compatibility_risk(&id("lib")).unwrap();
    assert!((risk.score - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_removed_capability_is_risky() {
    let mut contract = Contract::new();
    contract.insert("transactions".to_string(), serde_json::json!(true));

    let registry = ComponentRegistry::new();
    registry
        .register(
            ComponentRegistration::new("database")
                .version(v("1.0.0"))
                .contract(contract),
        )
        .unwrap();
    registry
        .register(ComponentRegistration::new("api").depends_on(["database"]))
        .unwrap();

    registry
        .register(ComponentRegistration::new("database").contract(Contract::new()))
        .unwrap();

    let risk = registry.calculate_compatibility_risk(&id("database")).unwrap();
    assert!((risk.score - 1.0).abs() < f64::EPSILON);
    assert_eq!(risk.breakdown.get(&id("api")), Some(&RiskStatus::AtRisk));
}

/// The order `API` and `Database` become known must not change the score.
#[rstest]
#[case::dependency_first("dependency_first")]
#[case::dependent_first("dependent_first")]
#[case::version_assigned_later("version_assigned_later")]
fn test_drift_scored_regardless_of_registration_order(#[case] order: &str) {
    let registry = ComponentRegistry::new();
    let api = || ComponentRegistration::new("API").depends_on(["Database"]);
    match order {
        "dependency_first" => {
            registry
                .register(ComponentRegistration::new("Database").version(v("1.0.0")))
                .unwrap();
            registry.register(api()).unwrap();
        }
        "dependent_first" => {
            registry.register(api()).unwrap();
            registry
                .register(ComponentRegistration::new("Database").version(v("1.0.0")))
                .unwrap();
        }
        _ => {
            registry.register(api()).unwrap();
            registry.update_version(&id("Database"), v("1.0.0")).unwrap();
        }
    }

    let baseline = registry.calculate_compatibility_risk(&id("Database")).unwrap();
    assert!(baseline.score.abs() < f64::EPSILON);

    registry.update_version(&id("Database"), v("2.0.0")).unwrap();
    let risk = registry.calculate_compatibility_risk(&id("Database")).unwrap();
    assert!((risk.score - 1.0).abs() < f64::EPSILON);
    assert_eq!(risk.breakdown.get(&id("API")), Some(&RiskStatus::AtRisk));
}

#[rstest]
#[case::dependency_first(true)]
#[case::dependent_first(false)]
fn test_removed_capability_scored_regardless_of_registration_order(#[case] dependency_first: bool) {
    let mut contract = Contract::new();
    contract.insert("tx".to_string(), serde_json::json!(true));
    let db = ComponentRegistration::new("db").contract(contract);
    let api = ComponentRegistration::new("api").depends_on(["db"]);

    let registry = ComponentRegistry::new();
    if dependency_first {
        registry.register(db).unwrap();
        registry.register(api).unwrap();
    } else {
        registry.register(api).unwrap();
        registry.register(db).unwrap();
    }

    registry
        .register(ComponentRegistration::new("db").contract(Contract::new()))
        .unwrap();

    let risk = registry.calculate_compatibility_risk(&id("db")).unwrap();
    assert!((risk.score - 1.0).abs() < f64::EPSILON);
    assert_eq!(risk.breakdown.get(&id("api")), Some(&RiskStatus::AtRisk));
}

#[test]
fn test_first_observation_is_kept() {
    let registry = ComponentRegistry::new();
    registry
        .register(ComponentRegistration::new("api").depends_on(["db"]))
        .unwrap();
    registry.update_version(&id("db"), v("1.0.0")).unwrap();
    registry.update_version(&id("db"), v("1.1.0")).unwrap();

    let meta = registry.edge_meta(&id("api"), &id("db")).unwrap();
    assert_eq!(meta.observed_version, Some(v("1.0.0")));
}

#[test]
fn test_risk_sums_over_dependents() {
    let registry = ComponentRegistry::new();
    registry
        .register(ComponentRegistration::new("database").version(v("1.0.0")))
        .unwrap();
    for dependent in ["api", "worker", "reports"] {
        registry
            .register(ComponentRegistration::new(dependent).depends_on(["database"]))
            .unwrap();
    }

    registry.update_version(&id("database"), v("2.0.0")).unwrap();
    let risk = registry.calculate_compatibility_risk(&id("database")).unwrap();
    assert!((risk.score - 3.0).abs() < f64::EPSILON);
    assert_eq!(risk.breakdown.len(), 3);
}

// ============================================================================
// Impact Analysis
// ============================================================================

#[rstest]
fn test_removal_breaks_direct_dependents(chain: ComponentRegistry) {
    let report = chain.analyze_impact(&Change::Remove(id("database"))).unwrap();
    assert_eq!(report.affected, ids(&["api", "frontend"]));
    assert_eq!(report.direct, ids(&["api"]));
    assert_eq!(report.incompatible, ids(&["api"]));
}

#[rstest]
fn test_modify_flags_nothing_incompatible(chain: ComponentRegistry) {
    let report = chain.analyze_impact(&Change::Modify(id("api"))).unwrap();
    assert_eq!(report.affected, ids(&["frontend"]));
    assert!(report.incompatible.is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_registration_keeps_graph_acyclic() {
    const NODES: usize = 16;
    let registry = ComponentRegistry::new();

    std::thread::scope(|s| {
        for t in 0..8 {
            let registry = &registry;
            s.spawn(move || {
                for i in 0..64 {
                    let from = format!("n{}", (t * 7 + i) % NODES);
                    let to = format!("n{}", (t * 3 + i * 5 + 1) % NODES);
                    let _ = registry.register(
                        ComponentRegistration::new(from.as_str()).depends_on([to.as_str()]),
                    );
                    let _ = registry.get_all_dependencies(&id(&from));
                    let _ = registry.analyze_dependency_impact(&id(&to));
                }
            });
        }
    });

    assert!(registry.topological_order().is_ok());
    for component in registry.components() {
        assert!(!registry.get_all_dependencies(&component.id).contains(&component.id));
    }
}
