use tracing::{debug, warn};

use sct_types::{ComplianceFamily, Entity, RiskFactor};

use crate::assessment::RiskAssessment;
use crate::error::RiskError;
use crate::policy::RiskPolicy;
use crate::predicate::{PredicateOutcome, RiskPredicate};
use crate::predicates::{
    CertificationPredicate, DeforestationAlertPredicate, ElevatedRiskPredicate,
    GeolocationPredicate, ProtectedAreaPredicate,
};

// ---------------------------------------------------------------------------
// EntityEvaluation
// ---------------------------------------------------------------------------

/// Factors and failures collected for one entity.
#[derive(Clone, Debug, Default)]
pub struct EntityEvaluation {
    pub entity_id: String,
    pub factors: Vec<RiskFactor>,
    /// Predicates that could not be evaluated. A non-empty list marks the
    /// entity's risk as unknown.
    pub failures: Vec<RiskError>,
}

impl EntityEvaluation {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if every predicate produced an answer.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RiskEvaluator
// ---------------------------------------------------------------------------

/// Runs a set of predicates over entities and aggregates the result.
pub struct RiskEvaluator {
    predicates: Vec<Box<dyn RiskPredicate>>,
    policy: RiskPolicy,
}

impl RiskEvaluator {
    /// Create an evaluator with no predicates.
    pub fn new(policy: RiskPolicy) -> Self {
        Self {
            predicates: Vec::new(),
            policy,
        }
    }

    /// Create an evaluator with the built-in predicate set:
    /// protected area, deforestation, geolocation, certification, monitoring.
    pub fn with_default_predicates(policy: RiskPolicy) -> Self {
        let mut evaluator = Self::new(policy);
        evaluator.add_predicate(Box::new(ProtectedAreaPredicate));
        evaluator.add_predicate(Box::new(DeforestationAlertPredicate));
        evaluator.add_predicate(Box::new(GeolocationPredicate));
        evaluator.add_predicate(Box::new(CertificationPredicate));
        evaluator.add_predicate(Box::new(ElevatedRiskPredicate));
        evaluator
    }

    pub fn add_predicate(&mut self, predicate: Box<dyn RiskPredicate>) {
        self.predicates.push(predicate);
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Evaluate every predicate against one entity.
    ///
    /// A failing predicate is logged and recorded in `failures`; the
    /// remaining predicates still run.
    pub fn evaluate_entity(&self, entity: &Entity) -> EntityEvaluation {
        let mut evaluation = EntityEvaluation::new(entity.id.clone());

        for predicate in &self.predicates {
            match predicate.evaluate(entity, &self.policy) {
                Ok(PredicateOutcome::Flagged { description }) => {
                    let severity = self
                        .policy
                        .rule_for(predicate.risk_type())
                        .map(|r| r.severity)
                        .unwrap_or_else(|| predicate.default_severity());
                    debug!(
                        entity = %entity.reference(),
                        predicate = predicate.risk_type(),
                        %severity,
                        "risk predicate flagged entity"
                    );
                    evaluation.factors.push(RiskFactor::new(
                        predicate.risk_type(),
                        severity,
                        description,
                        entity.id.clone(),
                    ));
                }
                Ok(PredicateOutcome::Clear | PredicateOutcome::NotApplicable) => {}
                Err(e) => {
                    warn!(
                        entity = %entity.reference(),
                        predicate = predicate.risk_type(),
                        error = %e,
                        "risk predicate failed; treating as unknown"
                    );
                    evaluation.failures.push(e);
                }
            }
        }

        evaluation
    }

    /// Apply the policy's severity table to an externally produced factor.
    pub fn classify(&self, mut factor: RiskFactor) -> RiskFactor {
        if let Some(rule) = self.policy.rule_for(&factor.risk_type) {
            factor.severity = rule.severity;
        }
        factor
    }

    /// The compliance family of a risk type: policy rule first, then the
    /// registered predicate, then `General`.
    pub fn family_of(&self, risk_type: &str) -> ComplianceFamily {
        if let Some(rule) = self.policy.rule_for(risk_type) {
            return rule.family;
        }
        self.predicates
            .iter()
            .find(|p| p.risk_type() == risk_type)
            .map(|p| p.family())
            .unwrap_or(ComplianceFamily::General)
    }

    /// Aggregate per-entity evaluations into one assessment.
    pub fn assess<I>(&self, evaluations: I) -> RiskAssessment
    where
        I: IntoIterator<Item = EntityEvaluation>,
    {
        let mut factors = Vec::new();
        let mut unevaluated = Vec::new();
        for evaluation in evaluations {
            if !evaluation.is_complete() {
                unevaluated.push(evaluation.entity_id.clone());
            }
            factors.extend(evaluation.factors);
        }
        RiskAssessment::aggregate(factors, unevaluated, |t| self.family_of(t))
    }
}

impl Default for RiskEvaluator {
    fn default() -> Self {
        Self::with_default_predicates(RiskPolicy::default())
    }
}
