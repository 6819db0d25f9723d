//! High-level SDK for Supply Chain Trace.
//!
//! [`SupplyChain`] wires the lineage engine and the custody ledger over
//! in-memory collaborators, configured from one [`SctConfig`] and optionally
//! seeded from a JSON [`Dataset`]. This is the main entry point for
//! applications embedding SCT.
//!
//! # Quick Start
//!
//! ```rust
//! use sct_sdk::{NewCustodyChain, SplitRequest, SupplyChain};
//!
//! let sc = SupplyChain::with_defaults();
//! sc.create_custody_chain(NewCustodyChain::new("LOT-1", "FFB", 100.0))?;
//! let outcome = sc.split_custody_chain(SplitRequest::new("LOT-1", &[60.0, 40.0], "mill-1"))?;
//! assert_eq!(outcome.child_chains.len(), 2);
//!
//! let validation = sc.validate_mass_balance("LOT-1")?;
//! assert!(validation.is_valid);
//! # Ok::<(), sct_sdk::SdkError>(())
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod supply_chain;

pub use config::SctConfig;
pub use dataset::{Dataset, LedgerOperation, RiskSignal};
pub use error::{SdkError, SdkResult};
pub use supply_chain::{BalanceReport, SupplyChain};

// Re-export key types
pub use sct_ledger::{
    ChainStatus, CustodyChain, CustodyEvent, CustodyEventType, MassBalanceEvent,
    MassBalanceValidation, MergeOutcome, MergeRequest, NewCustodyChain, NewCustodyEvent,
    NewMassBalanceEvent, ReplayReport, SplitOutcome, SplitRequest,
};
pub use sct_lineage::{Direction, LineageEdge, LineageNode, LineageResult};
pub use sct_risk::RiskAssessment;
pub use sct_types::{Entity, EntityRef, EntityType, RiskFactor, Severity};
