use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use sct_ledger::{
    CustodyChain, CustodyEvent, CustodyLedger, InMemoryCustodyStore, MassBalanceEvent,
    MassBalanceValidation, MergeOutcome, MergeRequest, NewCustodyChain, NewCustodyEvent,
    NewMassBalanceEvent, ReplayReport, SplitOutcome, SplitRequest,
};
use sct_lineage::{Direction, InMemoryGraph, LineageEngine, LineageResult};
use sct_risk::RiskEvaluator;
use sct_types::{EntityType, RiskFactor};

use crate::config::SctConfig;
use crate::dataset::{Dataset, LedgerOperation};
use crate::error::{SdkError, SdkResult};

/// Everything known about one custody chain, for reporting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub chain: CustodyChain,
    pub events: Vec<CustodyEvent>,
    pub validation: MassBalanceValidation,
    pub replay: ReplayReport,
}

/// Lineage engine and custody ledger over in-memory collaborators.
pub struct SupplyChain {
    engine: LineageEngine<InMemoryGraph>,
    ledger: CustodyLedger<InMemoryCustodyStore>,
    config: SctConfig,
}

impl SupplyChain {
    /// An empty supply chain.
    pub fn new(config: SctConfig) -> Self {
        let evaluator = RiskEvaluator::with_default_predicates(config.risk.clone());
        let engine = LineageEngine::new(InMemoryGraph::new(), evaluator, config.lineage.clone());
        let ledger = CustodyLedger::new(InMemoryCustodyStore::new(), config.ledger.clone());
        Self {
            engine,
            ledger,
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SctConfig::default())
    }

    /// Build a supply chain and replay a dataset into it.
    ///
    /// Entities, edges and risk signals go to the graph; chains are created
    /// next, then `operations` run through the ledger in order. The first
    /// failing chain or operation aborts the load.
    pub fn from_dataset(config: SctConfig, dataset: Dataset) -> SdkResult<Self> {
        let supply_chain = Self::new(config);
        let graph = supply_chain.graph();

        for entity in dataset.entities {
            graph.upsert_entity(entity)?;
        }
        for edge in dataset.edges {
            graph.add_edge(edge)?;
        }
        for signal in dataset.risk_signals {
            let factor = RiskFactor::new(
                signal.risk_type,
                signal.severity,
                signal.description,
                signal.entity.id.clone(),
            );
            graph.add_risk_signal(&signal.entity, factor)?;
        }

        for chain in dataset.chains {
            let chain_id = chain.chain_id.clone();
            supply_chain
                .create_custody_chain(chain)
                .map_err(|e| SdkError::Dataset(format!("chain '{chain_id}': {e}")))?;
        }
        for (index, operation) in dataset.operations.into_iter().enumerate() {
            let name = operation.name();
            supply_chain
                .apply(operation)
                .map_err(|e| SdkError::Dataset(format!("operation #{index} ({name}): {e}")))?;
        }

        info!(
            entities = graph.entity_count()?,
            edges = graph.edge_count()?,
            chains = supply_chain.ledger.store().chain_count()?,
            "dataset loaded"
        );
        Ok(supply_chain)
    }

    /// Read a JSON dataset from disk and build a supply chain from it.
    pub fn load_dataset(config: SctConfig, path: impl AsRef<Path>) -> SdkResult<Self> {
        let dataset = Dataset::load(path)?;
        Self::from_dataset(config, dataset)
    }

    fn apply(&self, operation: LedgerOperation) -> SdkResult<()> {
        match operation {
            LedgerOperation::Event { chain_id, event } => {
                self.record_custody_event(&chain_id, event)?;
            }
            LedgerOperation::Split(request) => {
                self.split_custody_chain(request)?;
            }
            LedgerOperation::Merge(request) => {
                self.merge_custody_chains(request)?;
            }
            LedgerOperation::MassBalance(event) => {
                self.record_mass_balance_event(event)?;
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &SctConfig {
        &self.config
    }

    /// The graph the engine reads from.
    pub fn graph(&self) -> &InMemoryGraph {
        self.engine.source()
    }

    pub fn engine(&self) -> &LineageEngine<InMemoryGraph> {
        &self.engine
    }

    pub fn ledger(&self) -> &CustodyLedger<InMemoryCustodyStore> {
        &self.ledger
    }

    // ---- Lineage ----

    pub fn trace_forward(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        max_depth: Option<u32>,
    ) -> SdkResult<LineageResult> {
        Ok(self.engine.trace_forward(entity_id, entity_type, max_depth)?)
    }

    pub fn trace_backward(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        max_depth: Option<u32>,
    ) -> SdkResult<LineageResult> {
        Ok(self.engine.trace_backward(entity_id, entity_type, max_depth)?)
    }

    pub fn full_lineage(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        max_depth: Option<u32>,
    ) -> SdkResult<LineageResult> {
        Ok(self.engine.full_lineage(entity_id, entity_type, max_depth)?)
    }

    pub fn trace(
        &self,
        direction: Direction,
        entity_id: &str,
        entity_type: EntityType,
        max_depth: Option<u32>,
    ) -> SdkResult<LineageResult> {
        Ok(self.engine.trace(direction, entity_id, entity_type, max_depth)?)
    }

    // ---- Custody ----

    pub fn create_custody_chain(&self, input: NewCustodyChain) -> SdkResult<CustodyChain> {
        Ok(self.ledger.create_custody_chain(input)?)
    }

    pub fn record_custody_event(
        &self,
        chain_id: &str,
        input: NewCustodyEvent,
    ) -> SdkResult<CustodyEvent> {
        Ok(self.ledger.record_custody_event(chain_id, input)?)
    }

    pub fn split_custody_chain(&self, request: SplitRequest) -> SdkResult<SplitOutcome> {
        Ok(self.ledger.split_custody_chain(request)?)
    }

    pub fn merge_custody_chains(&self, request: MergeRequest) -> SdkResult<MergeOutcome> {
        Ok(self.ledger.merge_custody_chains(request)?)
    }

    pub fn record_mass_balance_event(
        &self,
        input: NewMassBalanceEvent,
    ) -> SdkResult<MassBalanceEvent> {
        Ok(self.ledger.record_mass_balance_event(input)?)
    }

    pub fn validate_mass_balance(&self, chain_id: &str) -> SdkResult<MassBalanceValidation> {
        Ok(self.ledger.validate_mass_balance(chain_id)?)
    }

    pub fn custody_chain(&self, chain_id: &str) -> SdkResult<CustodyChain> {
        Ok(self.ledger.chain(chain_id)?)
    }

    pub fn replay_chain(&self, chain_id: &str) -> SdkResult<ReplayReport> {
        Ok(self.ledger.replay(chain_id)?)
    }

    /// Chain state, history, mass-balance validation and replay in one call.
    pub fn balance_report(&self, chain_id: &str) -> SdkResult<BalanceReport> {
        Ok(BalanceReport {
            chain: self.ledger.chain(chain_id)?,
            events: self.ledger.events(chain_id)?,
            validation: self.ledger.validate_mass_balance(chain_id)?,
            replay: self.ledger.replay(chain_id)?,
        })
    }
}

impl Default for SupplyChain {
    fn default() -> Self {
        Self::with_defaults()
    }
}
