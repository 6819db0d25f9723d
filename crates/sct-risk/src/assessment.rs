use serde::{Deserialize, Serialize};
use sct_types::{ComplianceFamily, RiskFactor, Severity};

/// Compliance flags derived from a set of risk factors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compliance {
    pub eudr_compliant: bool,
    pub rspo_compliant: bool,
    /// Factor descriptions, deduplicated, in first-seen order.
    pub issues: Vec<String>,
}

/// Aggregated risk over every node of a lineage result.
///
/// Derived fresh on every query; never cached, because monitoring can
/// change an entity's risk between calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: Severity,
    pub risk_factors: Vec<RiskFactor>,
    pub compliance: Compliance,
    /// Entities whose evaluation failed and whose risk is therefore unknown.
    #[serde(default)]
    pub unevaluated: Vec<String>,
}

impl RiskAssessment {
    /// Aggregate factors into an assessment.
    ///
    /// `family_of` maps a factor's risk type to its compliance family.
    pub fn aggregate<F>(risk_factors: Vec<RiskFactor>, unevaluated: Vec<String>, family_of: F) -> Self
    where
        F: Fn(&str) -> ComplianceFamily,
    {
        let overall_risk = risk_factors
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Low);

        let mut eudr_compliant = true;
        let mut rspo_compliant = true;
        let mut issues: Vec<String> = Vec::new();

        for factor in &risk_factors {
            match family_of(&factor.risk_type) {
                ComplianceFamily::Eudr => eudr_compliant = false,
                ComplianceFamily::Rspo => rspo_compliant = false,
                ComplianceFamily::General => {}
            }
            if !issues.contains(&factor.description) {
                issues.push(factor.description.clone());
            }
        }

        Self {
            overall_risk,
            risk_factors,
            compliance: Compliance {
                eudr_compliant,
                rspo_compliant,
                issues,
            },
            unevaluated,
        }
    }

    /// An assessment with no factors: low risk, fully compliant.
    pub fn clear() -> Self {
        Self::aggregate(Vec::new(), Vec::new(), |_| ComplianceFamily::General)
    }

    /// Factors raised against one entity.
    pub fn factors_for<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a RiskFactor> + 'a {
        self.risk_factors
            .iter()
            .filter(move |f| f.entity_id == entity_id)
    }

    /// Returns `true` if any entity could not be evaluated.
    pub fn is_partial(&self) -> bool {
        !self.unevaluated.is_empty()
    }
}
