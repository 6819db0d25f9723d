use serde::{Deserialize, Serialize};

/// Bounds and switches for lineage traversal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    /// Hop bound used when a caller does not pass one.
    pub default_max_depth: u32,
    /// Requested depths above this are clamped.
    pub max_depth_limit: u32,
    /// Hard node ceiling; exceeding it fails with `LineageTooLarge`.
    pub max_nodes: usize,
    /// Whether to attach a risk assessment to every result.
    pub assess_risk: bool,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            default_max_depth: 10,
            max_depth_limit: 50,
            max_nodes: 5000,
            assess_risk: true,
        }
    }
}

impl LineageConfig {
    /// The hop bound for a request: the caller's value (or the default),
    /// clamped to `max_depth_limit`.
    pub fn effective_depth(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_max_depth)
            .min(self.max_depth_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = LineageConfig::default();
        assert_eq!(c.default_max_depth, 10);
        assert_eq!(c.max_nodes, 5000);
        assert!(c.assess_risk);
    }

    #[test]
    fn effective_depth_clamps() {
        let c = LineageConfig::default();
        assert_eq!(c.effective_depth(None), 10);
        assert_eq!(c.effective_depth(Some(3)), 3);
        assert_eq!(c.effective_depth(Some(0)), 0);
        assert_eq!(c.effective_depth(Some(1000)), 50);
    }
}
