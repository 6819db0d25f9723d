//! EUDR predicates: protected areas, deforestation alerts, geolocation.

use serde_json::Value;
use sct_types::{ComplianceFamily, Entity, Severity};

use crate::error::RiskError;
use crate::policy::{RiskPolicy, DEFORESTATION_ALERT, MISSING_GEOLOCATION, PROTECTED_AREA};
use crate::predicate::{PredicateOutcome, RiskPredicate};

/// Data key: `true` if the entity's boundary intersects a protected area.
pub const KEY_PROTECTED_AREA_OVERLAP: &str = "protected_area_overlap";
/// Data key: name of the intersected protected area, used in the description.
pub const KEY_PROTECTED_AREA_NAME: &str = "protected_area_name";
/// Data key: number of deforestation alerts after the regulation cutoff date.
pub const KEY_DEFORESTATION_ALERTS: &str = "deforestation_alerts";
/// Data key: explicit deforestation-free attestation.
pub const KEY_DEFORESTATION_FREE: &str = "deforestation_free";

// ---------------------------------------------------------------------------
// ProtectedAreaPredicate
// ---------------------------------------------------------------------------

/// Flags entities whose geometry intersects a protected area.
pub struct ProtectedAreaPredicate;

impl RiskPredicate for ProtectedAreaPredicate {
    fn risk_type(&self) -> &str {
        PROTECTED_AREA
    }

    fn family(&self) -> ComplianceFamily {
        ComplianceFamily::Eudr
    }

    fn default_severity(&self) -> Severity {
        Severity::High
    }

    fn evaluate(&self, entity: &Entity, _policy: &RiskPolicy) -> Result<PredicateOutcome, RiskError> {
        let overlap = match entity.data.get(KEY_PROTECTED_AREA_OVERLAP) {
            None | Some(Value::Null) => return Ok(PredicateOutcome::Clear),
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(RiskError::invalid_data(
                    PROTECTED_AREA,
                    KEY_PROTECTED_AREA_OVERLAP,
                    "expected a boolean",
                ))
            }
        };

        if !overlap {
            return Ok(PredicateOutcome::Clear);
        }

        let description = match entity.data_str(KEY_PROTECTED_AREA_NAME) {
            Some(area) => format!("{} intersects protected area '{area}'", entity.name),
            None => format!("{} intersects a protected area", entity.name),
        };
        Ok(PredicateOutcome::flagged(description))
    }
}

// ---------------------------------------------------------------------------
// DeforestationAlertPredicate
// ---------------------------------------------------------------------------

/// Flags entities with deforestation alerts or a negative attestation.
pub struct DeforestationAlertPredicate;

impl RiskPredicate for DeforestationAlertPredicate {
    fn risk_type(&self) -> &str {
        DEFORESTATION_ALERT
    }

    fn family(&self) -> ComplianceFamily {
        ComplianceFamily::Eudr
    }

    fn default_severity(&self) -> Severity {
        Severity::Critical
    }

    fn evaluate(&self, entity: &Entity, policy: &RiskPolicy) -> Result<PredicateOutcome, RiskError> {
        if entity.data_bool(KEY_DEFORESTATION_FREE) == Some(false) {
            return Ok(PredicateOutcome::flagged(format!(
                "{} is not attested deforestation-free",
                entity.name
            )));
        }

        let alerts = match entity.data.get(KEY_DEFORESTATION_ALERTS) {
            None | Some(Value::Null) => return Ok(PredicateOutcome::Clear),
            Some(v) => v.as_u64().ok_or_else(|| {
                RiskError::invalid_data(
                    DEFORESTATION_ALERT,
                    KEY_DEFORESTATION_ALERTS,
                    "expected a non-negative integer",
                )
            })?,
        };

        if alerts > u64::from(policy.max_deforestation_alerts) {
            Ok(PredicateOutcome::flagged(format!(
                "{} has {alerts} deforestation alert(s) after the cutoff date",
                entity.name
            )))
        } else {
            Ok(PredicateOutcome::Clear)
        }
    }
}

// ---------------------------------------------------------------------------
// GeolocationPredicate
// ---------------------------------------------------------------------------

/// Flags entities that must be geolocated but carry no valid coordinates.
pub struct GeolocationPredicate;

impl RiskPredicate for GeolocationPredicate {
    fn risk_type(&self) -> &str {
        MISSING_GEOLOCATION
    }

    fn family(&self) -> ComplianceFamily {
        ComplianceFamily::Eudr
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }

    fn evaluate(&self, entity: &Entity, policy: &RiskPolicy) -> Result<PredicateOutcome, RiskError> {
        if !policy.geolocated_entity_types.contains(&entity.entity_type) {
            return Ok(PredicateOutcome::NotApplicable);
        }

        match &entity.coordinates {
            None => Ok(PredicateOutcome::flagged(format!(
                "{} has no geolocation",
                entity.name
            ))),
            Some(coords) if coords.validate().is_err() => Ok(PredicateOutcome::flagged(format!(
                "{} has invalid geolocation ({}, {})",
                entity.name, coords.latitude, coords.longitude
            ))),
            Some(_) => Ok(PredicateOutcome::Clear),
        }
    }
}
