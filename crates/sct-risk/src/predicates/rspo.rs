//! RSPO certification predicate.

use sct_types::{ComplianceFamily, Entity, Severity};

use crate::error::RiskError;
use crate::policy::{RiskPolicy, MISSING_CERTIFICATION};
use crate::predicate::{PredicateOutcome, RiskPredicate};

/// Flags entities missing any of the policy's required certifications.
pub struct CertificationPredicate;

impl RiskPredicate for CertificationPredicate {
    fn risk_type(&self) -> &str {
        MISSING_CERTIFICATION
    }

    fn family(&self) -> ComplianceFamily {
        ComplianceFamily::Rspo
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }

    fn evaluate(&self, entity: &Entity, policy: &RiskPolicy) -> Result<PredicateOutcome, RiskError> {
        if !policy.certified_entity_types.contains(&entity.entity_type) {
            return Ok(PredicateOutcome::NotApplicable);
        }

        let missing: Vec<&str> = policy
            .required_certifications
            .iter()
            .map(String::as_str)
            .filter(|cert| !entity.has_certification(cert))
            .collect();

        if missing.is_empty() {
            Ok(PredicateOutcome::Clear)
        } else {
            Ok(PredicateOutcome::flagged(format!(
                "{} is missing required certification: {}",
                entity.name,
                missing.join(", ")
            )))
        }
    }
}
