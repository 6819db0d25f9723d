use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::records::{CustodyChain, CustodyEvent, MassBalanceEvent};

/// Consistent read view handed to a write planner.
pub trait ChainLookup {
    fn chain(&self, chain_id: &str) -> Option<&CustodyChain>;

    fn contains(&self, chain_id: &str) -> bool {
        self.chain(chain_id).is_some()
    }
}

/// A set of mutations the store applies atomically.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    /// New chains; each chain id must be unused.
    pub inserts: Vec<CustodyChain>,
    /// Replacement state for existing chains.
    pub updates: Vec<CustodyChain>,
    pub custody_events: Vec<CustodyEvent>,
    pub mass_balance_events: Vec<MassBalanceEvent>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
            && self.updates.is_empty()
            && self.custody_events.is_empty()
            && self.mass_balance_events.is_empty()
    }
}

/// Result of [`CustodyStore::create_if_absent`].
#[derive(Clone, Debug, PartialEq)]
pub struct IdempotentWrite {
    /// The committed batch: freshly written, or the one stored under the key.
    pub batch: WriteBatch,
    pub replayed: bool,
}

/// Planner run inside a store transaction.
pub type BatchPlanner<'a> = dyn FnMut(&dyn ChainLookup) -> Result<WriteBatch, LedgerError> + 'a;

/// Persistence boundary for custody chains and their event logs.
///
/// Events are append-only. The two write methods run a planner against a
/// consistent view and apply the batch it returns in full or not at all.
pub trait CustodyStore: Send + Sync {
    fn get_chain(&self, chain_id: &str) -> Result<Option<CustodyChain>, LedgerError>;

    fn chain_ids(&self) -> Result<Vec<String>, LedgerError>;

    /// Custody events of one chain, in append order.
    fn custody_events(&self, chain_id: &str) -> Result<Vec<CustodyEvent>, LedgerError>;

    /// Mass-balance events naming the chain as parent or child, in append order.
    fn mass_balance_events(&self, chain_id: &str) -> Result<Vec<MassBalanceEvent>, LedgerError>;

    /// Plan and apply one batch atomically, returning what was written.
    fn transact(&self, planner: &mut BatchPlanner<'_>) -> Result<WriteBatch, LedgerError>;

    /// Like [`transact`](Self::transact), but at most once per key.
    ///
    /// If `key` was already committed with the same `fingerprint`, the stored
    /// batch is returned without running `factory`. A different fingerprint
    /// fails with [`LedgerError::IdempotencyConflict`]. Without a key the
    /// batch is applied as by `transact` and nothing is remembered.
    fn create_if_absent(
        &self,
        key: Option<&str>,
        fingerprint: &str,
        factory: &mut BatchPlanner<'_>,
    ) -> Result<IdempotentWrite, LedgerError>;
}
