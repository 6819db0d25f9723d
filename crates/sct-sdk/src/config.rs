use std::path::Path;

use serde::{Deserialize, Serialize};

use sct_ledger::LedgerConfig;
use sct_lineage::LineageConfig;
use sct_risk::RiskPolicy;

use crate::error::{SdkError, SdkResult};

/// Top-level configuration, one section per subsystem.
///
/// Every section falls back to its defaults, so a file only needs the keys
/// it changes:
///
/// ```toml
/// [lineage]
/// max_nodes = 200
///
/// [ledger]
/// tolerance = 0.01
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SctConfig {
    pub lineage: LineageConfig,
    pub risk: RiskPolicy,
    pub ledger: LedgerConfig,
}

impl SctConfig {
    pub fn from_toml_str(input: &str) -> SdkResult<Self> {
        toml::from_str(input).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sct_types::Severity;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = SctConfig::from_toml_str("").unwrap();
        assert_eq!(config, SctConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = SctConfig::from_toml_str(
            r#"
            [lineage]
            max_nodes = 200

            [risk]
            elevated_risk_threshold = "critical"
            "#,
        )
        .unwrap();
        assert_eq!(config.lineage.max_nodes, 200);
        assert_eq!(config.lineage.default_max_depth, 10);
        assert_eq!(config.risk.elevated_risk_threshold, Severity::Critical);
        assert_eq!(config.risk.rules, RiskPolicy::default().rules);
        assert_eq!(config.ledger, LedgerConfig::default());
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = SctConfig::from_toml_str("[lineage\nmax_nodes = ").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn printed_config_parses_back() {
        let mut config = SctConfig::default();
        config.ledger.tolerance = 0.02;
        let text = config.to_toml_string().unwrap();
        assert_eq!(SctConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sct.toml");
        std::fs::write(&path, "[ledger]\ntolerance = 0.01\n").unwrap();
        let config = SctConfig::load(&path).unwrap();
        assert_eq!(config.ledger.tolerance, 0.01);

        let missing = SctConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, SdkError::Io(_)));
    }
}
