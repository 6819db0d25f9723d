use serde::{Deserialize, Serialize};
use sct_types::{ComplianceFamily, EntityType, Severity};

/// Risk type emitted when a plot overlaps a protected area.
pub const PROTECTED_AREA: &str = "protected_area";
/// Risk type emitted when deforestation alerts are recorded after the cutoff.
pub const DEFORESTATION_ALERT: &str = "deforestation_alert";
/// Risk type emitted when an entity that must be geolocated is not.
pub const MISSING_GEOLOCATION: &str = "missing_geolocation";
/// Risk type emitted when a required certification is missing.
pub const MISSING_CERTIFICATION: &str = "missing_certification";
/// Risk type emitted when external monitoring rates the entity high or critical.
pub const ELEVATED_RISK_LEVEL: &str = "elevated_risk_level";

/// Maps one risk type to its compliance family and severity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateRule {
    pub risk_type: String,
    pub family: ComplianceFamily,
    pub severity: Severity,
}

impl PredicateRule {
    pub fn new(risk_type: impl Into<String>, family: ComplianceFamily, severity: Severity) -> Self {
        Self {
            risk_type: risk_type.into(),
            family,
            severity,
        }
    }
}

/// The predicate→severity table and predicate parameters.
///
/// The defaults encode the commonly used EUDR/RSPO reading but are policy,
/// not law: confirm thresholds against the regulation before relying on them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    /// Severity/family table. Later rules for the same type win.
    pub rules: Vec<PredicateRule>,
    /// Certifications every entity of `certified_entity_types` must hold.
    pub required_certifications: Vec<String>,
    /// Entity types the certification predicate applies to.
    pub certified_entity_types: Vec<EntityType>,
    /// Entity types that must carry coordinates.
    pub geolocated_entity_types: Vec<EntityType>,
    /// Deforestation alerts above this count flag the entity.
    pub max_deforestation_alerts: u32,
    /// Externally assigned risk levels at or above this flag the entity.
    pub elevated_risk_threshold: Severity,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                PredicateRule::new(PROTECTED_AREA, ComplianceFamily::Eudr, Severity::High),
                PredicateRule::new(DEFORESTATION_ALERT, ComplianceFamily::Eudr, Severity::Critical),
                PredicateRule::new(MISSING_GEOLOCATION, ComplianceFamily::Eudr, Severity::Medium),
                PredicateRule::new(MISSING_CERTIFICATION, ComplianceFamily::Rspo, Severity::Medium),
                PredicateRule::new(ELEVATED_RISK_LEVEL, ComplianceFamily::General, Severity::High),
            ],
            required_certifications: vec!["RSPO".into()],
            certified_entity_types: vec![EntityType::Facility],
            geolocated_entity_types: vec![EntityType::Plot],
            max_deforestation_alerts: 0,
            elevated_risk_threshold: Severity::High,
        }
    }
}

impl RiskPolicy {
    /// Look up the rule for a risk type.
    pub fn rule_for(&self, risk_type: &str) -> Option<&PredicateRule> {
        self.rules.iter().rev().find(|r| r.risk_type == risk_type)
    }

    /// The family a risk type belongs to; unknown types are `General`.
    pub fn family_of(&self, risk_type: &str) -> ComplianceFamily {
        self.rule_for(risk_type)
            .map(|r| r.family)
            .unwrap_or(ComplianceFamily::General)
    }

    /// Insert or replace the rule for a risk type.
    pub fn set_rule(&mut self, rule: PredicateRule) {
        self.rules.retain(|r| r.risk_type != rule.risk_type);
        self.rules.push(rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_builtin_predicates() {
        let policy = RiskPolicy::default();
        for risk_type in [
            PROTECTED_AREA,
            DEFORESTATION_ALERT,
            MISSING_GEOLOCATION,
            MISSING_CERTIFICATION,
            ELEVATED_RISK_LEVEL,
        ] {
            assert!(policy.rule_for(risk_type).is_some(), "{risk_type} missing");
        }
        assert_eq!(policy.family_of(PROTECTED_AREA), ComplianceFamily::Eudr);
        assert_eq!(policy.family_of(MISSING_CERTIFICATION), ComplianceFamily::Rspo);
    }

    #[test]
    fn unknown_type_is_general() {
        assert_eq!(
            RiskPolicy::default().family_of("labour_audit"),
            ComplianceFamily::General
        );
    }

    #[test]
    fn set_rule_replaces_existing() {
        let mut policy = RiskPolicy::default();
        policy.set_rule(PredicateRule::new(
            PROTECTED_AREA,
            ComplianceFamily::Eudr,
            Severity::Critical,
        ));
        assert_eq!(
            policy.rule_for(PROTECTED_AREA).map(|r| r.severity),
            Some(Severity::Critical)
        );
        assert_eq!(
            policy.rules.iter().filter(|r| r.risk_type == PROTECTED_AREA).count(),
            1
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let policy: RiskPolicy = toml::from_str(
            r#"
            required_certifications = ["RSPO", "ISCC"]
            "#,
        )
        .unwrap();
        assert_eq!(policy.required_certifications.len(), 2);
        assert_eq!(policy.geolocated_entity_types, vec![EntityType::Plot]);
        assert_eq!(policy.rules.len(), 5);
    }

    #[test]
    fn toml_rule_override() {
        let policy: RiskPolicy = toml::from_str(
            r#"
            [[rules]]
            risk_type = "protected_area"
            family = "eudr"
            severity = "critical"
            "#,
        )
        .unwrap();
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(
            policy.rule_for(PROTECTED_AREA).map(|r| r.severity),
            Some(Severity::Critical)
        );
    }
}
