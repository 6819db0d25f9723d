use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::LedgerError;
use crate::records::{CustodyChain, CustodyEvent, MassBalanceEvent};
use crate::store::{BatchPlanner, ChainLookup, CustodyStore, IdempotentWrite, WriteBatch};

/// In-memory custody store for tests, local analysis, and embedding.
#[derive(Default)]
pub struct InMemoryCustodyStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    chains: BTreeMap<String, CustodyChain>,
    custody_events: HashMap<String, Vec<CustodyEvent>>,
    mass_balance_events: Vec<MassBalanceEvent>,
    /// Chain id → positions in `mass_balance_events`.
    mass_balance_index: HashMap<String, Vec<usize>>,
    /// Idempotency key → (request fingerprint, committed batch).
    committed: HashMap<String, (String, WriteBatch)>,
}

impl ChainLookup for StoreState {
    fn chain(&self, chain_id: &str) -> Option<&CustodyChain> {
        self.chains.get(chain_id)
    }
}

impl InMemoryCustodyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, LedgerError> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Store("custody store read lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, LedgerError> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Store("custody store write lock poisoned".into()))
    }

    pub fn chain_count(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.chains.len())
    }

    pub fn mass_balance_event_count(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.mass_balance_events.len())
    }

    /// Number of idempotency keys with a remembered batch.
    pub fn idempotency_key_count(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.committed.len())
    }
}

impl StoreState {
    /// Reject a batch that would break store integrity. Nothing is written.
    fn check(&self, batch: &WriteBatch) -> Result<(), LedgerError> {
        let mut inserted: HashSet<&str> = HashSet::new();
        for chain in &batch.inserts {
            if self.chains.contains_key(&chain.chain_id) || !inserted.insert(&chain.chain_id) {
                return Err(LedgerError::DuplicateChainId(chain.chain_id.clone()));
            }
        }
        for chain in &batch.updates {
            if !self.chains.contains_key(&chain.chain_id) {
                return Err(LedgerError::ChainNotFound(chain.chain_id.clone()));
            }
        }
        for chain in batch.inserts.iter().chain(&batch.updates) {
            let within = chain.remaining_quantity >= 0.0
                && chain.remaining_quantity <= chain.total_quantity;
            if !within {
                return Err(LedgerError::InvalidQuantity {
                    field: "remaining_quantity",
                    value: chain.remaining_quantity,
                });
            }
        }
        for event in &batch.custody_events {
            if !self.chains.contains_key(&event.chain_id) && !inserted.contains(event.chain_id.as_str()) {
                return Err(LedgerError::ChainNotFound(event.chain_id.clone()));
            }
        }
        Ok(())
    }

    fn apply(&mut self, batch: &WriteBatch) {
        for chain in batch.inserts.iter().chain(&batch.updates) {
            self.chains.insert(chain.chain_id.clone(), chain.clone());
        }
        for event in &batch.custody_events {
            self.custody_events
                .entry(event.chain_id.clone())
                .or_default()
                .push(event.clone());
        }
        for event in &batch.mass_balance_events {
            let position = self.mass_balance_events.len();
            let mut indexed: HashSet<&String> = HashSet::new();
            for chain_id in event.chain_ids() {
                if indexed.insert(chain_id) {
                    self.mass_balance_index
                        .entry(chain_id.clone())
                        .or_default()
                        .push(position);
                }
            }
            self.mass_balance_events.push(event.clone());
        }
    }

    fn plan_and_apply(&mut self, planner: &mut BatchPlanner<'_>) -> Result<WriteBatch, LedgerError> {
        let view: &dyn ChainLookup = &*self;
        let batch = planner(view)?;
        self.check(&batch)?;
        self.apply(&batch);
        Ok(batch)
    }
}

impl CustodyStore for InMemoryCustodyStore {
    fn get_chain(&self, chain_id: &str) -> Result<Option<CustodyChain>, LedgerError> {
        Ok(self.read()?.chains.get(chain_id).cloned())
    }

    fn chain_ids(&self) -> Result<Vec<String>, LedgerError> {
        Ok(self.read()?.chains.keys().cloned().collect())
    }

    fn custody_events(&self, chain_id: &str) -> Result<Vec<CustodyEvent>, LedgerError> {
        Ok(self
            .read()?
            .custody_events
            .get(chain_id)
            .cloned()
            .unwrap_or_default())
    }

    fn mass_balance_events(&self, chain_id: &str) -> Result<Vec<MassBalanceEvent>, LedgerError> {
        let state = self.read()?;
        Ok(state
            .mass_balance_index
            .get(chain_id)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&i| state.mass_balance_events[i].clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn transact(&self, planner: &mut BatchPlanner<'_>) -> Result<WriteBatch, LedgerError> {
        self.write()?.plan_and_apply(planner)
    }

    fn create_if_absent(
        &self,
        key: Option<&str>,
        fingerprint: &str,
        factory: &mut BatchPlanner<'_>,
    ) -> Result<IdempotentWrite, LedgerError> {
        let mut state = self.write()?;
        let Some(key) = key else {
            return Ok(IdempotentWrite {
                batch: state.plan_and_apply(factory)?,
                replayed: false,
            });
        };
        if let Some((stored_fingerprint, batch)) = state.committed.get(key) {
            if stored_fingerprint != fingerprint {
                return Err(LedgerError::IdempotencyConflict(key.to_string()));
            }
            return Ok(IdempotentWrite {
                batch: batch.clone(),
                replayed: true,
            });
        }

        let batch = state.plan_and_apply(factory)?;
        state
            .committed
            .insert(key.to_string(), (fingerprint.to_string(), batch.clone()));
        Ok(IdempotentWrite {
            batch,
            replayed: false,
        })
    }
}
