//! Compliance risk evaluation for Supply Chain Trace.
//!
//! Every node of a lineage result is run through a set of predicates
//! (protected area, deforestation alerts, geolocation, certification,
//! monitoring level). Each failing predicate yields one [`RiskFactor`] whose
//! severity comes from the [`RiskPolicy`] table, and the factors are folded
//! into a [`RiskAssessment`].
//!
//! # Quick Start
//!
//! ```rust
//! use sct_risk::{RiskEvaluator, RiskPolicy};
//! use sct_types::{Entity, EntityType, Severity};
//!
//! let evaluator = RiskEvaluator::with_default_predicates(RiskPolicy::default());
//! let plot = Entity::new("P-1", EntityType::Plot, "Block A")
//!     .with_coordinates(-1.6, 103.6)
//!     .with_data("protected_area_overlap", true);
//! let assessment = evaluator.assess([evaluator.evaluate_entity(&plot)]);
//! assert!(assessment.overall_risk >= Severity::Medium);
//! assert!(!assessment.compliance.eudr_compliant);
//! ```
//!
//! [`RiskFactor`]: sct_types::RiskFactor

pub mod assessment;
pub mod error;
pub mod evaluator;
pub mod policy;
pub mod predicate;
pub mod predicates;

pub use assessment::{Compliance, RiskAssessment};
pub use error::RiskError;
pub use evaluator::{EntityEvaluation, RiskEvaluator};
pub use policy::{PredicateRule, RiskPolicy};
pub use predicate::{PredicateOutcome, RiskPredicate};
pub use predicates::{
    CertificationPredicate, DeforestationAlertPredicate, ElevatedRiskPredicate,
    GeolocationPredicate, ProtectedAreaPredicate,
};

#[cfg(test)]
mod tests {
    use super::*;
    use sct_types::{ComplianceFamily, Entity, EntityType, RiskFactor, Severity};

    fn compliant_plot() -> Entity {
        Entity::new("P-1", EntityType::Plot, "Block A").with_coordinates(-1.6, 103.6)
    }

    /// A predicate standing in for an external monitoring lookup that times out.
    struct TimingOut;

    impl RiskPredicate for TimingOut {
        fn risk_type(&self) -> &str {
            "satellite_alert"
        }
        fn family(&self) -> ComplianceFamily {
            ComplianceFamily::Eudr
        }
        fn default_severity(&self) -> Severity {
            Severity::High
        }
        fn evaluate(&self, _: &Entity, _: &RiskPolicy) -> Result<PredicateOutcome, RiskError> {
            Err(RiskError::Timeout {
                predicate: "satellite_alert".into(),
            })
        }
    }

    /// A custom predicate with no policy rule.
    struct AlwaysFlag;

    impl RiskPredicate for AlwaysFlag {
        fn risk_type(&self) -> &str {
            "labour_audit"
        }
        fn family(&self) -> ComplianceFamily {
            ComplianceFamily::Rspo
        }
        fn default_severity(&self) -> Severity {
            Severity::Low
        }
        fn evaluate(&self, e: &Entity, _: &RiskPolicy) -> Result<PredicateOutcome, RiskError> {
            Ok(PredicateOutcome::flagged(format!("{} failed labour audit", e.name)))
        }
    }

    // -----------------------------------------------------------------------
    // 1. Default evaluator passes a compliant plot
    // -----------------------------------------------------------------------
    #[test]
    fn compliant_plot_has_no_factors() {
        let evaluator = RiskEvaluator::default();
        assert_eq!(evaluator.predicate_count(), 5);
        let eval = evaluator.evaluate_entity(&compliant_plot());
        assert!(eval.factors.is_empty());
        assert!(eval.is_complete());
    }

    // -----------------------------------------------------------------------
    // 2. Protected area flag uses the table severity and EUDR family
    // -----------------------------------------------------------------------
    #[test]
    fn protected_area_plot_fails_eudr() {
        let evaluator = RiskEvaluator::default();
        let plot = compliant_plot().with_data("protected_area_overlap", true);
        let assessment = evaluator.assess([evaluator.evaluate_entity(&plot)]);
        assert_eq!(assessment.overall_risk, Severity::High);
        assert!(!assessment.compliance.eudr_compliant);
        assert!(assessment.compliance.rspo_compliant);
        assert_eq!(assessment.factors_for("P-1").count(), 1);
    }

    // -----------------------------------------------------------------------
    // 3. A failing predicate degrades to unknown without aborting others
    // -----------------------------------------------------------------------
    #[test]
    fn predicate_failure_is_contained() {
        let mut evaluator = RiskEvaluator::with_default_predicates(RiskPolicy::default());
        evaluator.add_predicate(Box::new(TimingOut));

        let plot = compliant_plot().with_data("deforestation_alerts", 4);
        let eval = evaluator.evaluate_entity(&plot);
        assert_eq!(eval.failures.len(), 1);
        assert_eq!(eval.factors.len(), 1);
        assert_eq!(eval.factors[0].severity, Severity::Critical);

        let assessment = evaluator.assess([eval]);
        assert_eq!(assessment.unevaluated, vec!["P-1".to_string()]);
        assert_eq!(assessment.overall_risk, Severity::Critical);
    }

    // -----------------------------------------------------------------------
    // 4. Custom predicates fall back to their own severity and family
    // -----------------------------------------------------------------------
    #[test]
    fn custom_predicate_without_rule_uses_own_defaults() {
        let mut evaluator = RiskEvaluator::new(RiskPolicy::default());
        evaluator.add_predicate(Box::new(AlwaysFlag));
        let eval = evaluator.evaluate_entity(&compliant_plot());
        assert_eq!(eval.factors[0].severity, Severity::Low);
        assert_eq!(evaluator.family_of("labour_audit"), ComplianceFamily::Rspo);

        let assessment = evaluator.assess([eval]);
        assert!(!assessment.compliance.rspo_compliant);
        assert!(assessment.compliance.eudr_compliant);
    }

    // -----------------------------------------------------------------------
    // 5. External factors are reclassified by the severity table
    // -----------------------------------------------------------------------
    #[test]
    fn classify_applies_policy_severity() {
        let evaluator = RiskEvaluator::default();
        let external = RiskFactor::new("deforestation_alert", Severity::Low, "GLAD alert", "P-9");
        assert_eq!(evaluator.classify(external).severity, Severity::Critical);

        let unknown = RiskFactor::new("flood_zone", Severity::Medium, "flood", "P-9");
        assert_eq!(evaluator.classify(unknown).severity, Severity::Medium);
    }

    // -----------------------------------------------------------------------
    // 6. Policy overrides change severities without code changes
    // -----------------------------------------------------------------------
    #[test]
    fn policy_override_changes_severity() {
        let mut policy = RiskPolicy::default();
        policy.set_rule(PredicateRule::new(
            policy::PROTECTED_AREA,
            ComplianceFamily::Eudr,
            Severity::Medium,
        ));
        let evaluator = RiskEvaluator::with_default_predicates(policy);
        let plot = compliant_plot().with_data("protected_area_overlap", true);
        let assessment = evaluator.assess([evaluator.evaluate_entity(&plot)]);
        assert_eq!(assessment.overall_risk, Severity::Medium);
    }

    // -----------------------------------------------------------------------
    // 7. Uncertified mill fails RSPO only
    // -----------------------------------------------------------------------
    #[test]
    fn uncertified_mill_fails_rspo() {
        let evaluator = RiskEvaluator::default();
        let mill = Entity::new("F-1", EntityType::Facility, "Mill");
        let assessment = evaluator.assess([evaluator.evaluate_entity(&mill)]);
        assert!(assessment.compliance.eudr_compliant);
        assert!(!assessment.compliance.rspo_compliant);
        assert_eq!(assessment.overall_risk, Severity::Medium);
    }
}
