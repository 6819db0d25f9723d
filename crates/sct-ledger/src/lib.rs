//! Custody ledger for Supply Chain Trace (SCT).
//!
//! This crate tracks lots of material as custody chains and keeps their
//! transformations honest. It provides:
//! - `CustodyChain`, append-only `CustodyEvent` and `MassBalanceEvent` records
//! - `CustodyStore` persistence boundary with atomic and idempotent writes
//! - `InMemoryCustodyStore` implementation for tests and embedding
//! - `CustodyLedger`: create, record, split, merge, and mass-balance operations
//! - Mass-balance validation across connected chains
//! - Chain replay (left fold of custody events)
//!
//! # Quick Start
//!
//! ```rust
//! use sct_ledger::{CustodyLedger, NewCustodyChain, SplitRequest};
//!
//! let ledger = CustodyLedger::in_memory();
//! ledger.create_custody_chain(NewCustodyChain::new("CPO-001", "CPO", 100.0))?;
//! let outcome = ledger.split_custody_chain(SplitRequest::new("CPO-001", &[60.0, 40.0], "Mill A"))?;
//! assert_eq!(outcome.child_chains.len(), 2);
//! assert!(ledger.validate_mass_balance("CPO-001")?.is_valid);
//! # Ok::<(), sct_ledger::LedgerError>(())
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod records;
pub mod replay;
pub mod store;
pub mod validation;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::CustodyLedger;
pub use memory::InMemoryCustodyStore;
pub use records::{
    ChainStatus, CustodyChain, CustodyEvent, CustodyEventType, MassBalanceEvent,
    MassBalanceKind, MergeOutcome, MergeRequest, NewCustodyChain, NewCustodyEvent,
    NewMassBalanceEvent, SplitDefinition, SplitOutcome, SplitRequest,
};
pub use replay::{ChainReplay, ReplayReport};
pub use store::{BatchPlanner, ChainLookup, CustodyStore, IdempotentWrite, WriteBatch};
pub use validation::{Discrepancy, MassBalanceValidation, MassBalanceValidator};
