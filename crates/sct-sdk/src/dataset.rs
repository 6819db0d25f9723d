//! JSON datasets that seed the in-memory graph and custody store.

use std::path::Path;

use serde::{Deserialize, Serialize};

use sct_ledger::{MergeRequest, NewCustodyChain, NewCustodyEvent, NewMassBalanceEvent, SplitRequest};
use sct_lineage::LineageEdge;
use sct_types::{Entity, EntityRef, Severity};

use crate::error::{SdkError, SdkResult};

/// An external monitoring signal attached to one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskSignal {
    pub entity: EntityRef,
    #[serde(rename = "type")]
    pub risk_type: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

/// One ledger call, applied in dataset order after all chains exist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerOperation {
    Event {
        chain_id: String,
        event: NewCustodyEvent,
    },
    Split(SplitRequest),
    Merge(MergeRequest),
    MassBalance(NewMassBalanceEvent),
}

impl LedgerOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Event { .. } => "event",
            Self::Split(_) => "split",
            Self::Merge(_) => "merge",
            Self::MassBalance(_) => "mass_balance",
        }
    }
}

/// Everything a [`SupplyChain`](crate::SupplyChain) can be seeded with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub entities: Vec<Entity>,
    pub edges: Vec<LineageEdge>,
    pub risk_signals: Vec<RiskSignal>,
    pub chains: Vec<NewCustodyChain>,
    pub operations: Vec<LedgerOperation>,
}

impl Dataset {
    pub fn from_json_str(input: &str) -> SdkResult<Self> {
        let dataset: Self =
            serde_json::from_str(input).map_err(|e| SdkError::Dataset(e.to_string()))?;
        dataset.check_references()?;
        Ok(dataset)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Edges and signals must name entities the dataset defines.
    fn check_references(&self) -> SdkResult<()> {
        let known: std::collections::HashSet<EntityRef> =
            self.entities.iter().map(Entity::reference).collect();

        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                if !known.contains(end) {
                    return Err(SdkError::Dataset(format!(
                        "edge {} -> {} references unknown entity {}",
                        edge.source, edge.target, end
                    )));
                }
            }
        }
        for signal in &self.risk_signals {
            if !known.contains(&signal.entity) {
                return Err(SdkError::Dataset(format!(
                    "risk signal '{}' references unknown entity {}",
                    signal.risk_type, signal.entity
                )));
            }
        }
        Ok(())
    }
}
