//! Custody chains, custody events, mass-balance events, and the request and
//! outcome shapes of the ledger operations.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use sct_types::{Coordinates, EntityData, EntityRef, RecordId};

/// Unit of measure used when a request does not name one.
pub const DEFAULT_UOM: &str = "kg";

// ---------------------------------------------------------------------------
// CustodyChain
// ---------------------------------------------------------------------------

/// Lifecycle of a custody chain. Everything except `Active` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Active,
    Split,
    Merged,
    Consumed,
    Shipped,
}

impl ChainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Split => "split",
            Self::Merged => "merged",
            Self::Consumed => "consumed",
            Self::Shipped => "shipped",
        }
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One continuously tracked lot of material.
///
/// # Invariants
///
/// - `0 <= remaining_quantity <= total_quantity`.
/// - Only changed through custody or mass-balance operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustodyChain {
    pub id: RecordId,
    /// Human-readable identifier, unique within a ledger.
    pub chain_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_plot: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_facility: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_facility: Option<EntityRef>,
    pub product_type: String,
    pub total_quantity: f64,
    pub remaining_quantity: f64,
    pub status: ChainStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    /// Chains this one was split or merged from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_chain_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CustodyChain {
    pub fn is_active(&self) -> bool {
        self.status == ChainStatus::Active
    }

    /// Where the material currently sits: the destination if known,
    /// otherwise where it came from.
    pub fn current_location(&self) -> Option<&EntityRef> {
        self.destination_facility
            .as_ref()
            .or(self.source_facility.as_ref())
    }
}

/// Input for `CustodyLedger::create_custody_chain`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCustodyChain {
    pub chain_id: String,
    pub product_type: String,
    pub total_quantity: f64,
    #[serde(default)]
    pub source_plot: Option<EntityRef>,
    #[serde(default)]
    pub source_facility: Option<EntityRef>,
    #[serde(default)]
    pub destination_facility: Option<EntityRef>,
    #[serde(default)]
    pub quality_grade: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub harvest_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub recorded_by: String,
}

impl NewCustodyChain {
    pub fn new(
        chain_id: impl Into<String>,
        product_type: impl Into<String>,
        total_quantity: f64,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            product_type: product_type.into(),
            total_quantity,
            source_plot: None,
            source_facility: None,
            destination_facility: None,
            quality_grade: None,
            batch_number: None,
            harvest_date: None,
            expiry_date: None,
            recorded_by: String::new(),
        }
    }

    pub fn from_plot(mut self, plot: EntityRef) -> Self {
        self.source_plot = Some(plot);
        self
    }

    pub fn at_facility(mut self, facility: EntityRef) -> Self {
        self.source_facility = Some(facility);
        self
    }

    pub fn destined_for(mut self, facility: EntityRef) -> Self {
        self.destination_facility = Some(facility);
        self
    }

    pub fn with_batch_number(mut self, batch: impl Into<String>) -> Self {
        self.batch_number = Some(batch.into());
        self
    }

    pub fn recorded_by(mut self, user: impl Into<String>) -> Self {
        self.recorded_by = user.into();
        self
    }
}

// ---------------------------------------------------------------------------
// CustodyEvent
// ---------------------------------------------------------------------------

/// What happened to a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustodyEventType {
    Receive,
    Process,
    Ship,
    Split,
    Merge,
}

impl CustodyEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receive => "receive",
            Self::Process => "process",
            Self::Ship => "ship",
            Self::Split => "split",
            Self::Merge => "merge",
        }
    }

    /// Whether an event of this type with a quantity draws down the chain.
    pub fn consumes_quantity(&self) -> bool {
        !matches!(self, Self::Receive)
    }

    /// Status a chain takes when an event of this type empties it.
    pub fn exhausted_status(&self) -> Option<ChainStatus> {
        match self {
            Self::Receive => None,
            Self::Process => Some(ChainStatus::Consumed),
            Self::Ship => Some(ChainStatus::Shipped),
            Self::Split => Some(ChainStatus::Split),
            Self::Merge => Some(ChainStatus::Merged),
        }
    }

    /// EPCIS-style business step and disposition defaults.
    fn default_step(&self) -> (&'static str, &'static str) {
        match self {
            Self::Receive => ("receiving", "in_progress"),
            Self::Process => ("transforming", "in_progress"),
            Self::Ship => ("shipping", "in_transit"),
            Self::Split | Self::Merge => ("transforming", "active"),
        }
    }
}

impl fmt::Display for CustodyEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, append-only record of one custody step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustodyEvent {
    pub id: RecordId,
    pub chain_id: String,
    pub event_type: CustodyEventType,
    pub event_time: DateTime<Utc>,
    pub business_step: String,
    pub disposition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    pub uom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<EntityRef>,
    pub recorded_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<EntityData>,
}

/// Input for `CustodyLedger::record_custody_event`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCustodyEvent {
    pub event_type: CustodyEventType,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub business_step: Option<String>,
    #[serde(default)]
    pub disposition: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(default)]
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub facility: Option<EntityRef>,
    #[serde(default)]
    pub recorded_by: String,
    #[serde(default)]
    pub user_data: Option<EntityData>,
}

impl NewCustodyEvent {
    pub fn new(event_type: CustodyEventType) -> Self {
        Self {
            event_type,
            event_time: None,
            business_step: None,
            disposition: None,
            quantity: None,
            uom: None,
            location: None,
            facility: None,
            recorded_by: String::new(),
            user_data: None,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn at_facility(mut self, facility: EntityRef) -> Self {
        self.facility = Some(facility);
        self
    }

    pub fn recorded_by(mut self, user: impl Into<String>) -> Self {
        self.recorded_by = user.into();
        self
    }

    /// Materialize the event for a chain, filling defaults.
    pub fn into_event(self, chain_id: impl Into<String>) -> CustodyEvent {
        let (step, disposition) = self.event_type.default_step();
        CustodyEvent {
            id: RecordId::new(),
            chain_id: chain_id.into(),
            event_type: self.event_type,
            event_time: self.event_time.unwrap_or_else(Utc::now),
            business_step: self.business_step.unwrap_or_else(|| step.to_string()),
            disposition: self.disposition.unwrap_or_else(|| disposition.to_string()),
            quantity: self.quantity,
            uom: self.uom.unwrap_or_else(|| DEFAULT_UOM.to_string()),
            location: self.location,
            facility: self.facility,
            recorded_by: self.recorded_by,
            user_data: self.user_data,
        }
    }
}

// ---------------------------------------------------------------------------
// MassBalanceEvent
// ---------------------------------------------------------------------------

/// The transformation a mass-balance event describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassBalanceKind {
    Split,
    Merge,
    /// Processing that may lose mass, e.g. milling.
    #[default]
    Process,
}

impl MassBalanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Merge => "merge",
            Self::Process => "process",
        }
    }
}

impl fmt::Display for MassBalanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a transformation: `input ≈ output + waste`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassBalanceEvent {
    pub id: RecordId,
    #[serde(rename = "event_type")]
    pub kind: MassBalanceKind,
    pub parent_chain_ids: Vec<String>,
    pub child_chain_ids: Vec<String>,
    pub input_quantity: f64,
    pub output_quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_location: Option<String>,
    pub process_date: DateTime<Utc>,
    pub processed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MassBalanceEvent {
    /// Waste, treating an unrecorded value as zero.
    pub fn waste(&self) -> f64 {
        self.waste_quantity.unwrap_or(0.0)
    }

    /// `input - (output + waste)`.
    pub fn imbalance(&self) -> f64 {
        self.input_quantity - (self.output_quantity + self.waste())
    }

    /// Chains on either side of the transformation.
    pub fn chain_ids(&self) -> impl Iterator<Item = &String> {
        self.parent_chain_ids.iter().chain(&self.child_chain_ids)
    }

    pub fn touches(&self, chain_id: &str) -> bool {
        self.chain_ids().any(|c| c == chain_id)
    }
}

/// Input for `CustodyLedger::record_mass_balance_event`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMassBalanceEvent {
    #[serde(default, rename = "event_type")]
    pub kind: MassBalanceKind,
    #[serde(default)]
    pub parent_chain_ids: Vec<String>,
    #[serde(default)]
    pub child_chain_ids: Vec<String>,
    pub input_quantity: f64,
    pub output_quantity: f64,
    #[serde(default)]
    pub conversion_rate: Option<f64>,
    /// Computed as `input - output` when absent.
    #[serde(default)]
    pub waste_quantity: Option<f64>,
    #[serde(default)]
    pub process_location: Option<String>,
    #[serde(default)]
    pub process_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_by: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewMassBalanceEvent {
    /// A processing event consuming from `parent_chain_id`.
    pub fn process(parent_chain_id: impl Into<String>, input: f64, output: f64) -> Self {
        Self {
            parent_chain_ids: vec![parent_chain_id.into()],
            input_quantity: input,
            output_quantity: output,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Split / merge
// ---------------------------------------------------------------------------

/// One portion carved out of a parent chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitDefinition {
    pub quantity: f64,
    #[serde(default)]
    pub destination_facility: Option<EntityRef>,
    #[serde(default)]
    pub quality_grade: Option<String>,
}

impl SplitDefinition {
    pub fn new(quantity: f64) -> Self {
        Self {
            quantity,
            destination_facility: None,
            quality_grade: None,
        }
    }
}

/// Input for `CustodyLedger::split_custody_chain`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRequest {
    pub parent_chain_id: String,
    pub splits: Vec<SplitDefinition>,
    pub process_location: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub processed_by: String,
    /// Retrying with the same key returns the first outcome.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl SplitRequest {
    pub fn new(
        parent_chain_id: impl Into<String>,
        quantities: &[f64],
        process_location: impl Into<String>,
    ) -> Self {
        Self {
            parent_chain_id: parent_chain_id.into(),
            splits: quantities.iter().copied().map(SplitDefinition::new).collect(),
            process_location: process_location.into(),
            notes: None,
            processed_by: String::new(),
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Input for `CustodyLedger::merge_custody_chains`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub parent_chain_ids: Vec<String>,
    pub destination_facility: EntityRef,
    pub product_type: String,
    #[serde(default)]
    pub quality_grade: Option<String>,
    pub process_location: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub processed_by: String,
    /// Chain id for the merged chain; derived from the first parent if absent.
    #[serde(default)]
    pub merged_chain_id: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl MergeRequest {
    pub fn new(
        parent_chain_ids: Vec<String>,
        destination_facility: EntityRef,
        product_type: impl Into<String>,
        process_location: impl Into<String>,
    ) -> Self {
        Self {
            parent_chain_ids,
            destination_facility,
            product_type: product_type.into(),
            quality_grade: None,
            process_location: process_location.into(),
            notes: None,
            processed_by: String::new(),
            merged_chain_id: None,
            idempotency_key: None,
        }
    }

    pub fn with_merged_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.merged_chain_id = Some(chain_id.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Result of a split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub parent_chain: CustodyChain,
    pub child_chains: Vec<CustodyChain>,
    pub mass_balance_event: MassBalanceEvent,
    /// `true` when this is the stored outcome of an earlier call with the
    /// same idempotency key.
    pub replayed: bool,
}

/// Result of a merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub parent_chains: Vec<CustodyChain>,
    pub merged_chain: CustodyChain,
    pub mass_balance_event: MassBalanceEvent,
    pub replayed: bool,
}
