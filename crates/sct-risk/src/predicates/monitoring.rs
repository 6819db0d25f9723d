use sct_types::{ComplianceFamily, Entity, Severity};

use crate::error::RiskError;
use crate::policy::{RiskPolicy, ELEVATED_RISK_LEVEL};
use crate::predicate::{PredicateOutcome, RiskPredicate};

/// Flags entities whose externally monitored risk level is at or above the
/// policy threshold.
pub struct ElevatedRiskPredicate;

impl RiskPredicate for ElevatedRiskPredicate {
    fn risk_type(&self) -> &str {
        ELEVATED_RISK_LEVEL
    }

    fn family(&self) -> ComplianceFamily {
        ComplianceFamily::General
    }

    fn default_severity(&self) -> Severity {
        Severity::High
    }

    fn evaluate(&self, entity: &Entity, policy: &RiskPolicy) -> Result<PredicateOutcome, RiskError> {
        match entity.risk_level {
            Some(level) if level >= policy.elevated_risk_threshold => Ok(PredicateOutcome::flagged(
                format!("{} is rated {level} risk by monitoring", entity.name),
            )),
            _ => Ok(PredicateOutcome::Clear),
        }
    }
}
