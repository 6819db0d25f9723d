//! Foundation types for Supply Chain Trace (SCT).
//!
//! This crate provides the entity, risk, and identifier types shared by the
//! lineage engine and the custody ledger. Every other SCT crate depends on
//! `sct-types`.
//!
//! # Key Types
//!
//! - [`Entity`]: A plot, facility, delivery, or shipment in the supply graph
//! - [`EntityRef`]: The `(id, type)` identity of an entity
//! - [`Coordinates`]: WGS84 position with great-circle distance
//! - [`Severity`]: Ordered risk severity (`low` → `critical`)
//! - [`RiskFactor`]: One failed compliance check against one entity
//! - [`RecordId`]: UUID v7 identifier for ledger records

pub mod entity;
pub mod error;
pub mod id;
pub mod risk;

pub use entity::{Coordinates, Entity, EntityData, EntityRef, EntityType};
pub use error::TypeError;
pub use id::RecordId;
pub use risk::{ComplianceFamily, RiskFactor, Severity};
