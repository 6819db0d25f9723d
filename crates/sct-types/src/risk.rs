//! Risk severities, compliance families, and risk factors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Ordered risk severity.
///
/// Ordering: `Low < Medium < High < Critical`, so the overall risk of a set of
/// factors is simply the maximum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(TypeError::UnknownSeverity(other.to_string())),
        }
    }
}

/// Regulatory or certification family a risk type belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceFamily {
    /// EU Deforestation Regulation checks (geolocation, deforestation, protected areas).
    Eudr,
    /// Roundtable on Sustainable Palm Oil certification checks.
    Rspo,
    /// Checks that affect overall risk but no compliance flag.
    #[default]
    General,
}

impl fmt::Display for ComplianceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eudr => write!(f, "EUDR"),
            Self::Rspo => write!(f, "RSPO"),
            Self::General => write!(f, "general"),
        }
    }
}

impl FromStr for ComplianceFamily {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eudr" => Ok(Self::Eudr),
            "rspo" => Ok(Self::Rspo),
            "general" => Ok(Self::General),
            other => Err(TypeError::UnknownFamily(other.to_string())),
        }
    }
}

/// One failed compliance check against one entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// The risk type, e.g. `protected_area` or `missing_certification`.
    #[serde(rename = "type")]
    pub risk_type: String,
    pub severity: Severity,
    pub description: String,
    pub entity_id: String,
}

impl RiskFactor {
    pub fn new(
        risk_type: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            risk_type: risk_type.into(),
            severity,
            description: description.into(),
            entity_id: entity_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        let max = [Severity::Medium, Severity::Critical, Severity::Low]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(max, Severity::Critical);
    }

    #[test]
    fn severity_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        let parsed: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(parsed, Severity::Critical);
    }

    #[test]
    fn severity_from_str_rejects_unknown() {
        assert_eq!("Medium".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn family_parse_and_display() {
        assert_eq!("EUDR".parse::<ComplianceFamily>().unwrap(), ComplianceFamily::Eudr);
        assert_eq!(ComplianceFamily::Rspo.to_string(), "RSPO");
    }

    #[test]
    fn risk_factor_uses_type_key() {
        let f = RiskFactor::new("protected_area", Severity::High, "inside reserve", "P-1");
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["type"], "protected_area");
        assert_eq!(json["entity_id"], "P-1");
    }
}
