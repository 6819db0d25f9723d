use sct_types::{ComplianceFamily, Entity, Severity};

use crate::error::RiskError;
use crate::policy::RiskPolicy;

// ---------------------------------------------------------------------------
// PredicateOutcome
// ---------------------------------------------------------------------------

/// The outcome of evaluating one predicate against one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PredicateOutcome {
    /// The entity passes the check.
    Clear,
    /// The entity fails the check; one risk factor is emitted.
    Flagged { description: String },
    /// The check does not apply to this kind of entity.
    NotApplicable,
}

impl PredicateOutcome {
    pub fn flagged(description: impl Into<String>) -> Self {
        Self::Flagged {
            description: description.into(),
        }
    }

    /// Returns `true` if the outcome is `Flagged`.
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged { .. })
    }
}

// ---------------------------------------------------------------------------
// RiskPredicate trait
// ---------------------------------------------------------------------------

/// A single compliance check evaluated per lineage node.
///
/// Predicates read well-known keys from the entity's opaque `data` map, its
/// certifications, and its coordinates. Severity and family are intrinsic to
/// the predicate but may be overridden by the active [`RiskPolicy`].
///
/// The trait is object-safe and `Send + Sync` so predicates can be stored in
/// a `Vec<Box<dyn RiskPredicate>>`.
pub trait RiskPredicate: Send + Sync {
    /// The risk type emitted on failure (e.g., "protected_area").
    fn risk_type(&self) -> &str;

    /// The compliance family this predicate belongs to.
    fn family(&self) -> ComplianceFamily;

    /// Severity used when the policy carries no rule for this risk type.
    fn default_severity(&self) -> Severity;

    /// Evaluate the entity.
    fn evaluate(&self, entity: &Entity, policy: &RiskPolicy) -> Result<PredicateOutcome, RiskError>;
}
