use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::records::{ChainStatus, CustodyEvent};
use crate::store::CustodyStore;

/// Result of folding a chain's custody events from its genesis quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub chain_id: String,
    pub applied_events: usize,
    pub remaining_quantity: f64,
    pub status: ChainStatus,
    /// Whether the folded state agrees with the stored chain.
    pub matches_stored: bool,
}

/// Deterministic replay of custody event logs.
pub struct ChainReplay;

impl ChainReplay {
    /// Rebuild a chain's quantity and status from its events and compare
    /// against what the store holds.
    pub fn replay<S: CustodyStore + ?Sized>(
        store: &S,
        chain_id: &str,
        config: &LedgerConfig,
    ) -> Result<ReplayReport, LedgerError> {
        let chain = store
            .get_chain(chain_id)?
            .ok_or_else(|| LedgerError::ChainNotFound(chain_id.to_string()))?;
        let events = store.custody_events(chain_id)?;
        let (remaining_quantity, status) = fold(chain.total_quantity, &events, config);

        let matches_stored = status == chain.status
            && (remaining_quantity - chain.remaining_quantity).abs() <= config.quantity_epsilon;

        Ok(ReplayReport {
            chain_id: chain_id.to_string(),
            applied_events: events.len(),
            remaining_quantity,
            status,
            matches_stored,
        })
    }
}

/// Left fold of custody events: every quantity-bearing event other than a
/// receipt draws the chain down, and the event that empties it decides the
/// terminal status.
pub(crate) fn fold(
    genesis: f64,
    events: &[CustodyEvent],
    config: &LedgerConfig,
) -> (f64, ChainStatus) {
    events
        .iter()
        .fold((genesis, ChainStatus::Active), |(remaining, status), event| {
            apply(remaining, status, event, config)
        })
}

pub(crate) fn apply(
    remaining: f64,
    status: ChainStatus,
    event: &CustodyEvent,
    config: &LedgerConfig,
) -> (f64, ChainStatus) {
    let Some(quantity) = event.quantity else {
        return (remaining, status);
    };
    if !event.event_type.consumes_quantity() {
        return (remaining, status);
    }

    let after = remaining - quantity;
    if config.is_exhausted(after) {
        let status = event.event_type.exhausted_status().unwrap_or(status);
        (0.0, status)
    } else {
        (after, status)
    }
}
