//! The custody ledger: chain creation, custody events, split/merge, and
//! mass-balance accounting over a [`CustodyStore`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use sct_types::{EntityRef, RecordId};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::memory::InMemoryCustodyStore;
use crate::records::{
    ChainStatus, CustodyChain, CustodyEvent, CustodyEventType, MassBalanceEvent,
    MassBalanceKind, MergeOutcome, MergeRequest, NewCustodyChain, NewCustodyEvent,
    NewMassBalanceEvent, SplitOutcome, SplitRequest,
};
use crate::replay::{self, ChainReplay, ReplayReport};
use crate::store::{BatchPlanner, ChainLookup, CustodyStore, IdempotentWrite, WriteBatch};
use crate::validation::{MassBalanceValidation, MassBalanceValidator};

/// Custody chains and their mass-conserving transformations.
///
/// Every mutating call plans one [`WriteBatch`] against a consistent view
/// of the store and commits it atomically, so a failed call leaves no trace.
pub struct CustodyLedger<S: CustodyStore> {
    store: S,
    config: LedgerConfig,
}

impl CustodyLedger<InMemoryCustodyStore> {
    /// A ledger over a fresh in-memory store with default tolerances.
    pub fn in_memory() -> Self {
        Self::new(InMemoryCustodyStore::new(), LedgerConfig::default())
    }
}

impl<S: CustodyStore> CustodyLedger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn chain(&self, chain_id: &str) -> LedgerResult<CustodyChain> {
        self.store
            .get_chain(chain_id)?
            .ok_or_else(|| LedgerError::ChainNotFound(chain_id.to_string()))
    }

    /// Custody events of a chain, oldest first.
    pub fn events(&self, chain_id: &str) -> LedgerResult<Vec<CustodyEvent>> {
        self.chain(chain_id)?;
        self.store.custody_events(chain_id)
    }

    /// Mass-balance events naming the chain as parent or child.
    pub fn mass_balance_events(&self, chain_id: &str) -> LedgerResult<Vec<MassBalanceEvent>> {
        self.chain(chain_id)?;
        self.store.mass_balance_events(chain_id)
    }

    // -----------------------------------------------------------------------
    // Chains and custody events
    // -----------------------------------------------------------------------

    /// Start tracking a new lot. Records a genesis `receive` event.
    pub fn create_custody_chain(&self, input: NewCustodyChain) -> LedgerResult<CustodyChain> {
        require_positive("total_quantity", input.total_quantity)?;
        if input.chain_id.trim().is_empty() {
            return Err(LedgerError::InvalidRequest("chain_id must not be empty".into()));
        }
        if input.product_type.trim().is_empty() {
            return Err(LedgerError::InvalidRequest("product_type must not be empty".into()));
        }

        let now = Utc::now();
        let genesis = custody_event(
            CustodyEventType::Receive,
            &input.chain_id,
            input.total_quantity,
            input.source_facility.clone(),
            &input.recorded_by,
            now,
        );
        let chain = CustodyChain {
            id: RecordId::new(),
            chain_id: input.chain_id,
            source_plot: input.source_plot,
            source_facility: input.source_facility,
            destination_facility: input.destination_facility,
            product_type: input.product_type,
            total_quantity: input.total_quantity,
            remaining_quantity: input.total_quantity,
            status: ChainStatus::Active,
            quality_grade: input.quality_grade,
            batch_number: input.batch_number,
            harvest_date: input.harvest_date,
            expiry_date: input.expiry_date,
            parent_chain_ids: Vec::new(),
            created_at: now,
        };

        self.store.transact(&mut |view: &dyn ChainLookup| {
            if view.contains(&chain.chain_id) {
                return Err(LedgerError::DuplicateChainId(chain.chain_id.clone()));
            }
            Ok(WriteBatch {
                inserts: vec![chain.clone()],
                custody_events: vec![genesis.clone()],
                ..WriteBatch::default()
            })
        })?;

        info!(
            chain = %chain.chain_id,
            product = %chain.product_type,
            quantity = chain.total_quantity,
            "custody chain created"
        );
        Ok(chain)
    }

    /// Append a custody event. `process` and `ship` events with a quantity
    /// draw the chain down; emptying it marks it consumed or shipped.
    pub fn record_custody_event(
        &self,
        chain_id: &str,
        input: NewCustodyEvent,
    ) -> LedgerResult<CustodyEvent> {
        if matches!(input.event_type, CustodyEventType::Split | CustodyEventType::Merge) {
            return Err(LedgerError::UnsupportedEventType(input.event_type.to_string()));
        }
        if let Some(quantity) = input.quantity {
            require_positive("quantity", quantity)?;
        }

        let event = input.into_event(chain_id);
        let config = &self.config;
        self.store.transact(&mut |view: &dyn ChainLookup| {
            let chain = view
                .chain(chain_id)
                .ok_or_else(|| LedgerError::ChainNotFound(chain_id.to_string()))?;
            let mut batch = WriteBatch {
                custody_events: vec![event.clone()],
                ..WriteBatch::default()
            };

            if let Some(quantity) = event.quantity.filter(|_| event.event_type.consumes_quantity()) {
                if quantity > chain.remaining_quantity + config.quantity_epsilon {
                    return Err(LedgerError::InsufficientQuantity {
                        chain_id: chain_id.to_string(),
                        requested: quantity,
                        available: chain.remaining_quantity,
                    });
                }
                let mut updated = chain.clone();
                (updated.remaining_quantity, updated.status) =
                    replay::apply(chain.remaining_quantity, chain.status, &event, config);
                batch.updates.push(updated);
            }
            Ok(batch)
        })?;

        debug!(
            chain = chain_id,
            event_type = %event.event_type,
            quantity = ?event.quantity,
            "custody event recorded"
        );
        Ok(event)
    }

    // -----------------------------------------------------------------------
    // Split / merge
    // -----------------------------------------------------------------------

    /// Carve child chains out of a parent. Mass is conserved exactly.
    pub fn split_custody_chain(&self, request: SplitRequest) -> LedgerResult<SplitOutcome> {
        if request.splits.is_empty() {
            return Err(LedgerError::InvalidRequest(
                "a split needs at least one portion".into(),
            ));
        }
        for portion in &request.splits {
            require_positive("split quantity", portion.quantity)?;
        }
        let requested: f64 = request.splits.iter().map(|s| s.quantity).sum();

        let config = &self.config;
        let write = self.commit_once(
            request.idempotency_key.as_deref(),
            &request,
            &mut |view: &dyn ChainLookup| plan_split(view, &request, requested, config),
        )?;
        let outcome = split_outcome(write)?;

        info!(
            parent = %outcome.parent_chain.chain_id,
            children = outcome.child_chains.len(),
            quantity = requested,
            replayed = outcome.replayed,
            "custody chain split"
        );
        Ok(outcome)
    }

    /// Combine two or more chains of one product into a new chain.
    pub fn merge_custody_chains(&self, request: MergeRequest) -> LedgerResult<MergeOutcome> {
        let mut distinct = HashSet::new();
        for chain_id in &request.parent_chain_ids {
            if !distinct.insert(chain_id) {
                return Err(LedgerError::InvalidRequest(format!(
                    "chain '{chain_id}' listed twice in merge"
                )));
            }
        }
        if distinct.len() < 2 {
            return Err(LedgerError::InvalidRequest(
                "a merge needs at least two parent chains".into(),
            ));
        }

        let config = &self.config;
        let write = self.commit_once(
            request.idempotency_key.as_deref(),
            &request,
            &mut |view: &dyn ChainLookup| plan_merge(view, &request, config),
        )?;
        let outcome = merge_outcome(write)?;

        info!(
            merged = %outcome.merged_chain.chain_id,
            parents = outcome.parent_chains.len(),
            quantity = outcome.merged_chain.total_quantity,
            replayed = outcome.replayed,
            "custody chains merged"
        );
        Ok(outcome)
    }

    /// Commit a planned batch at most once per idempotency key.
    ///
    /// Without a key the batch is committed plainly and the call is not
    /// retry-safe.
    fn commit_once<R: Serialize>(
        &self,
        key: Option<&str>,
        request: &R,
        planner: &mut BatchPlanner<'_>,
    ) -> LedgerResult<IdempotentWrite> {
        let fingerprint = match key {
            Some(_) => fingerprint(request)?,
            None => String::new(),
        };
        self.store.create_if_absent(key, &fingerprint, planner)
    }

    // -----------------------------------------------------------------------
    // Mass balance
    // -----------------------------------------------------------------------

    /// Record a processing transformation. Waste defaults to
    /// `input - output`. Chain quantities are not touched.
    pub fn record_mass_balance_event(
        &self,
        input: NewMassBalanceEvent,
    ) -> LedgerResult<MassBalanceEvent> {
        require_positive("input_quantity", input.input_quantity)?;
        if !input.output_quantity.is_finite() || input.output_quantity < 0.0 {
            return Err(LedgerError::InvalidQuantity {
                field: "output_quantity",
                value: input.output_quantity,
            });
        }
        if input.parent_chain_ids.is_empty() && input.child_chain_ids.is_empty() {
            return Err(LedgerError::InvalidRequest(
                "a mass balance event must name at least one chain".into(),
            ));
        }

        let waste = match input.waste_quantity {
            Some(w) if !w.is_finite() => {
                return Err(LedgerError::InvalidQuantity {
                    field: "waste_quantity",
                    value: w,
                })
            }
            Some(w) => w,
            None => input.input_quantity - input.output_quantity,
        };
        if waste < -self.config.allowed_variance(input.input_quantity) {
            return Err(LedgerError::NegativeWaste { waste });
        }
        let waste = waste.max(0.0);

        let event = MassBalanceEvent {
            id: RecordId::new(),
            kind: input.kind,
            parent_chain_ids: input.parent_chain_ids,
            child_chain_ids: input.child_chain_ids,
            input_quantity: input.input_quantity,
            output_quantity: input.output_quantity,
            conversion_rate: input
                .conversion_rate
                .or(Some(input.output_quantity / input.input_quantity)),
            waste_quantity: Some(waste),
            process_location: input.process_location,
            process_date: input.process_date.unwrap_or_else(Utc::now),
            processed_by: input.processed_by,
            notes: input.notes,
        };

        self.store.transact(&mut |view: &dyn ChainLookup| {
            if let Some(missing) = event.chain_ids().find(|c| !view.contains(c)) {
                return Err(LedgerError::ChainNotFound(missing.clone()));
            }
            Ok(WriteBatch {
                mass_balance_events: vec![event.clone()],
                ..WriteBatch::default()
            })
        })?;

        if !self.config.balances(event.input_quantity, event.output_quantity, waste) {
            warn!(
                event = %event.id,
                input = event.input_quantity,
                output = event.output_quantity,
                waste,
                "mass balance event recorded out of balance"
            );
        }
        info!(
            event = %event.id,
            kind = %event.kind,
            input = event.input_quantity,
            output = event.output_quantity,
            waste,
            "mass balance event recorded"
        );
        Ok(event)
    }

    /// Check input ≈ output + waste across every event connected to the chain.
    pub fn validate_mass_balance(&self, chain_id: &str) -> LedgerResult<MassBalanceValidation> {
        MassBalanceValidator::validate(&self.store, chain_id, &self.config)
    }

    /// Fold the chain's custody events and compare with its stored state.
    pub fn replay(&self, chain_id: &str) -> LedgerResult<ReplayReport> {
        ChainReplay::replay(&self.store, chain_id, &self.config)
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

fn plan_split(
    view: &dyn ChainLookup,
    request: &SplitRequest,
    requested: f64,
    config: &LedgerConfig,
) -> LedgerResult<WriteBatch> {
    let parent = view
        .chain(&request.parent_chain_id)
        .ok_or_else(|| LedgerError::ChainNotFound(request.parent_chain_id.clone()))?;
    if requested > parent.remaining_quantity + config.quantity_epsilon {
        return Err(LedgerError::SplitExceedsAvailable {
            chain_id: parent.chain_id.clone(),
            requested,
            available: parent.remaining_quantity,
        });
    }

    let now = Utc::now();
    let location = parent.current_location().cloned();
    let prefix = format!("{}-", parent.chain_id);
    let mut taken = HashSet::new();
    let mut counter = 0;

    let mut batch = WriteBatch::default();
    for portion in &request.splits {
        let chain_id = unique_chain_id(view, &mut taken, &prefix, &mut counter);
        batch.custody_events.push(custody_event(
            CustodyEventType::Receive,
            &chain_id,
            portion.quantity,
            location.clone(),
            &request.processed_by,
            now,
        ));
        batch.inserts.push(CustodyChain {
            id: RecordId::new(),
            chain_id,
            source_plot: parent.source_plot.clone(),
            source_facility: location.clone(),
            destination_facility: portion.destination_facility.clone(),
            product_type: parent.product_type.clone(),
            total_quantity: portion.quantity,
            remaining_quantity: portion.quantity,
            status: ChainStatus::Active,
            quality_grade: portion
                .quality_grade
                .clone()
                .or_else(|| parent.quality_grade.clone()),
            batch_number: parent.batch_number.clone(),
            harvest_date: parent.harvest_date,
            expiry_date: parent.expiry_date,
            parent_chain_ids: vec![parent.chain_id.clone()],
            created_at: now,
        });
    }

    let split_event = custody_event(
        CustodyEventType::Split,
        &parent.chain_id,
        requested,
        location,
        &request.processed_by,
        now,
    );
    let mut updated = parent.clone();
    (updated.remaining_quantity, updated.status) =
        replay::apply(parent.remaining_quantity, parent.status, &split_event, config);
    batch.custody_events.insert(0, split_event);
    batch.updates.push(updated);

    batch.mass_balance_events.push(MassBalanceEvent {
        id: RecordId::new(),
        kind: MassBalanceKind::Split,
        parent_chain_ids: vec![parent.chain_id.clone()],
        child_chain_ids: batch.inserts.iter().map(|c| c.chain_id.clone()).collect(),
        input_quantity: requested,
        output_quantity: requested,
        conversion_rate: Some(1.0),
        waste_quantity: Some(0.0),
        process_location: Some(request.process_location.clone()),
        process_date: now,
        processed_by: request.processed_by.clone(),
        notes: request.notes.clone(),
    });
    Ok(batch)
}

fn plan_merge(
    view: &dyn ChainLookup,
    request: &MergeRequest,
    config: &LedgerConfig,
) -> LedgerResult<WriteBatch> {
    let mut parents = Vec::with_capacity(request.parent_chain_ids.len());
    for chain_id in &request.parent_chain_ids {
        let chain = view
            .chain(chain_id)
            .ok_or_else(|| LedgerError::ChainNotFound(chain_id.clone()))?;
        if chain.product_type != request.product_type {
            return Err(LedgerError::ProductTypeMismatch {
                chain_id: chain_id.clone(),
                expected: request.product_type.clone(),
                found: chain.product_type.clone(),
            });
        }
        if config.is_exhausted(chain.remaining_quantity) {
            return Err(LedgerError::EmptyChainMerge(chain_id.clone()));
        }
        parents.push(chain);
    }

    let merged_id = match &request.merged_chain_id {
        Some(id) if view.contains(id) => return Err(LedgerError::DuplicateChainId(id.clone())),
        Some(id) => id.clone(),
        None => {
            let prefix = format!("{}-M", request.parent_chain_ids[0]);
            unique_chain_id(view, &mut HashSet::new(), &prefix, &mut 0)
        }
    };

    let now = Utc::now();
    let destination = Some(request.destination_facility.clone());
    let total: f64 = parents.iter().map(|c| c.remaining_quantity).sum();
    let mut batch = WriteBatch::default();

    for parent in &parents {
        let merge_event = custody_event(
            CustodyEventType::Merge,
            &parent.chain_id,
            parent.remaining_quantity,
            destination.clone(),
            &request.processed_by,
            now,
        );
        let mut updated = (*parent).clone();
        (updated.remaining_quantity, updated.status) =
            replay::apply(parent.remaining_quantity, parent.status, &merge_event, config);
        batch.custody_events.push(merge_event);
        batch.updates.push(updated);
    }

    batch.custody_events.push(custody_event(
        CustodyEventType::Receive,
        &merged_id,
        total,
        destination.clone(),
        &request.processed_by,
        now,
    ));
    batch.inserts.push(CustodyChain {
        id: RecordId::new(),
        chain_id: merged_id.clone(),
        source_plot: None,
        source_facility: None,
        destination_facility: destination,
        product_type: request.product_type.clone(),
        total_quantity: total,
        remaining_quantity: total,
        status: ChainStatus::Active,
        quality_grade: request.quality_grade.clone(),
        batch_number: None,
        harvest_date: parents.iter().filter_map(|c| c.harvest_date).min(),
        expiry_date: parents.iter().filter_map(|c| c.expiry_date).min(),
        parent_chain_ids: request.parent_chain_ids.clone(),
        created_at: now,
    });

    batch.mass_balance_events.push(MassBalanceEvent {
        id: RecordId::new(),
        kind: MassBalanceKind::Merge,
        parent_chain_ids: request.parent_chain_ids.clone(),
        child_chain_ids: vec![merged_id],
        input_quantity: total,
        output_quantity: total,
        conversion_rate: Some(1.0),
        waste_quantity: Some(0.0),
        process_location: Some(request.process_location.clone()),
        process_date: now,
        processed_by: request.processed_by.clone(),
        notes: request.notes.clone(),
    });
    Ok(batch)
}

fn split_outcome(write: IdempotentWrite) -> LedgerResult<SplitOutcome> {
    let IdempotentWrite { batch, replayed } = write;
    let parent_chain = batch
        .updates
        .into_iter()
        .next()
        .ok_or_else(|| LedgerError::Store("split record has no parent chain".into()))?;
    let mass_balance_event = batch
        .mass_balance_events
        .into_iter()
        .next()
        .ok_or_else(|| LedgerError::Store("split record has no mass balance event".into()))?;
    Ok(SplitOutcome {
        parent_chain,
        child_chains: batch.inserts,
        mass_balance_event,
        replayed,
    })
}

fn merge_outcome(write: IdempotentWrite) -> LedgerResult<MergeOutcome> {
    let IdempotentWrite { batch, replayed } = write;
    let merged_chain = batch
        .inserts
        .into_iter()
        .next()
        .ok_or_else(|| LedgerError::Store("merge record has no merged chain".into()))?;
    let mass_balance_event = batch
        .mass_balance_events
        .into_iter()
        .next()
        .ok_or_else(|| LedgerError::Store("merge record has no mass balance event".into()))?;
    Ok(MergeOutcome {
        parent_chains: batch.updates,
        merged_chain,
        mass_balance_event,
        replayed,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_positive(field: &'static str, value: f64) -> LedgerResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidQuantity { field, value })
    }
}

/// Next `{prefix}{nn}` not used by the store or earlier in this batch.
fn unique_chain_id(
    view: &dyn ChainLookup,
    taken: &mut HashSet<String>,
    prefix: &str,
    counter: &mut u32,
) -> String {
    loop {
        *counter += 1;
        let candidate = format!("{prefix}{:02}", *counter);
        if !view.contains(&candidate) && taken.insert(candidate.clone()) {
            return candidate;
        }
    }
}

fn custody_event(
    event_type: CustodyEventType,
    chain_id: &str,
    quantity: f64,
    facility: Option<EntityRef>,
    recorded_by: &str,
    at: DateTime<Utc>,
) -> CustodyEvent {
    let mut input = NewCustodyEvent::new(event_type)
        .with_quantity(quantity)
        .recorded_by(recorded_by);
    input.facility = facility;
    input.event_time = Some(at);
    input.into_event(chain_id)
}

/// BLAKE3 over the canonical JSON of a request.
fn fingerprint<R: Serialize>(request: &R) -> LedgerResult<String> {
    let encoded =
        serde_json::to_vec(request).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    Ok(hex::encode(blake3::hash(&encoded).as_bytes()))
}
