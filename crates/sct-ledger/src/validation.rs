use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;

use sct_types::RecordId;

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::records::{MassBalanceEvent, MassBalanceKind};
use crate::store::CustodyStore;

/// Result of a mass-balance check over a chain's connected events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassBalanceValidation {
    pub chain_id: String,
    /// Every chain reached through parent/child links, start first.
    pub chains_visited: Vec<String>,
    pub event_count: usize,
    pub total_input: f64,
    pub total_output: f64,
    pub total_waste: f64,
    /// `total_output / total_input`, or 0 when nothing was input.
    pub efficiency: f64,
    pub is_valid: bool,
    pub discrepancies: Vec<Discrepancy>,
}

/// One event whose own books do not balance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    #[serde(rename = "type")]
    pub kind: MassBalanceKind,
    pub event_id: RecordId,
    /// The event's input quantity.
    pub expected: f64,
    /// Output plus waste.
    pub actual: f64,
    /// `actual - expected`.
    pub variance: f64,
    pub description: String,
}

/// Read-only mass-balance checker.
pub struct MassBalanceValidator;

impl MassBalanceValidator {
    /// Walk every mass-balance event connected to `chain_id` and check that
    /// input ≈ output + waste overall and per event.
    pub fn validate<S: CustodyStore + ?Sized>(
        store: &S,
        chain_id: &str,
        config: &LedgerConfig,
    ) -> Result<MassBalanceValidation, LedgerError> {
        if store.get_chain(chain_id)?.is_none() {
            return Err(LedgerError::ChainNotFound(chain_id.to_string()));
        }

        let (chains_visited, events) = connected_events(store, chain_id)?;

        let mut total_input = 0.0;
        let mut total_output = 0.0;
        let mut total_waste = 0.0;
        let mut discrepancies = Vec::new();

        for event in &events {
            total_input += event.input_quantity;
            total_output += event.output_quantity;
            total_waste += event.waste();

            if !config.balances(event.input_quantity, event.output_quantity, event.waste()) {
                let actual = event.output_quantity + event.waste();
                discrepancies.push(Discrepancy {
                    kind: event.kind,
                    event_id: event.id,
                    expected: event.input_quantity,
                    actual,
                    variance: actual - event.input_quantity,
                    description: format!(
                        "{} event {} on [{}] -> [{}]: input {} but output + waste is {}",
                        event.kind,
                        event.id.short_id(),
                        event.parent_chain_ids.join(", "),
                        event.child_chain_ids.join(", "),
                        event.input_quantity,
                        actual
                    ),
                });
            }
        }

        let efficiency = if total_input > 0.0 {
            total_output / total_input
        } else {
            0.0
        };
        let is_valid = config.balances(total_input, total_output, total_waste);

        if !is_valid || !discrepancies.is_empty() {
            warn!(
                chain = chain_id,
                total_input,
                total_output,
                total_waste,
                discrepancies = discrepancies.len(),
                "mass balance drift detected"
            );
        }

        Ok(MassBalanceValidation {
            chain_id: chain_id.to_string(),
            chains_visited,
            event_count: events.len(),
            total_input,
            total_output,
            total_waste,
            efficiency,
            is_valid,
            discrepancies,
        })
    }
}

/// Breadth-first over parent/child links, each chain and event once.
fn connected_events<S: CustodyStore + ?Sized>(
    store: &S,
    chain_id: &str,
) -> Result<(Vec<String>, Vec<MassBalanceEvent>), LedgerError> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut seen_events: HashSet<RecordId> = HashSet::new();
    let mut order = Vec::new();
    let mut events = Vec::new();
    let mut queue = VecDeque::new();

    visited.insert(chain_id.to_string());
    queue.push_back(chain_id.to_string());

    while let Some(current) = queue.pop_front() {
        for event in store.mass_balance_events(&current)? {
            if !seen_events.insert(event.id) {
                continue;
            }
            for linked in event.chain_ids() {
                if visited.insert(linked.clone()) {
                    queue.push_back(linked.clone());
                }
            }
            events.push(event);
        }
        order.push(current);
    }

    events.sort_by(|a, b| a.process_date.cmp(&b.process_date).then(a.id.cmp(&b.id)));
    Ok((order, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCustodyStore;
    use crate::records::{ChainStatus, CustodyChain};
    use crate::store::{ChainLookup, WriteBatch};
    use chrono::Utc;

    fn chain(id: &str) -> CustodyChain {
        CustodyChain {
            id: RecordId::new(),
            chain_id: id.to_string(),
            source_plot: None,
            source_facility: None,
            destination_facility: None,
            product_type: "CPO".into(),
            total_quantity: 100.0,
            remaining_quantity: 100.0,
            status: ChainStatus::Active,
            quality_grade: None,
            batch_number: None,
            harvest_date: None,
            expiry_date: None,
            parent_chain_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn event(parents: &[&str], children: &[&str], input: f64, output: f64, waste: f64) -> MassBalanceEvent {
        MassBalanceEvent {
            id: RecordId::new(),
            kind: MassBalanceKind::Process,
            parent_chain_ids: parents.iter().map(|s| s.to_string()).collect(),
            child_chain_ids: children.iter().map(|s| s.to_string()).collect(),
            input_quantity: input,
            output_quantity: output,
            conversion_rate: None,
            waste_quantity: Some(waste),
            process_location: None,
            process_date: Utc::now(),
            processed_by: "test".into(),
            notes: None,
        }
    }

    fn store_with(chains: &[&str], events: Vec<MassBalanceEvent>) -> InMemoryCustodyStore {
        let store = InMemoryCustodyStore::new();
        let inserts: Vec<CustodyChain> = chains.iter().map(|c| chain(c)).collect();
        store
            .transact(&mut |_view: &dyn ChainLookup| {
                Ok(WriteBatch {
                    inserts: inserts.clone(),
                    mass_balance_events: events.clone(),
                    ..WriteBatch::default()
                })
            })
            .unwrap();
        store
    }

    #[test]
    fn no_events_is_valid_with_zero_efficiency() {
        let store = store_with(&["A"], vec![]);
        let v = MassBalanceValidator::validate(&store, "A", &LedgerConfig::default()).unwrap();
        assert!(v.is_valid);
        assert_eq!(v.efficiency, 0.0);
        assert_eq!(v.event_count, 0);
        assert_eq!(v.chains_visited, vec!["A".to_string()]);
    }

    #[test]
    fn walks_links_in_both_directions() {
        // A -> B -> C, and D -> C. Starting from B reaches all four.
        let store = store_with(
            &["A", "B", "C", "D"],
            vec![
                event(&["A"], &["B"], 100.0, 100.0, 0.0),
                event(&["B", "D"], &["C"], 150.0, 150.0, 0.0),
            ],
        );
        let v = MassBalanceValidator::validate(&store, "B", &LedgerConfig::default()).unwrap();
        assert_eq!(v.event_count, 2);
        assert_eq!(v.chains_visited.len(), 4);
        assert_eq!(v.total_input, 250.0);
        assert!(v.is_valid);
        assert_eq!(v.efficiency, 1.0);
    }

    #[test]
    fn unbalanced_event_is_reported() {
        let store = store_with(
            &["A", "B"],
            vec![
                event(&["A"], &["B"], 100.0, 90.0, 0.0),
                event(&["B"], &[], 90.0, 85.0, 5.0),
            ],
        );
        let v = MassBalanceValidator::validate(&store, "A", &LedgerConfig::default()).unwrap();
        assert!(!v.is_valid);
        assert_eq!(v.discrepancies.len(), 1);
        let d = &v.discrepancies[0];
        assert_eq!(d.expected, 100.0);
        assert_eq!(d.actual, 90.0);
        assert_eq!(d.variance, -10.0);
    }

    #[test]
    fn drift_within_tolerance_passes() {
        let store = store_with(&["A"], vec![event(&["A"], &[], 1000.0, 996.0, 0.0)]);
        let v = MassBalanceValidator::validate(&store, "A", &LedgerConfig::default()).unwrap();
        assert!(v.is_valid);
        assert!(v.discrepancies.is_empty());
    }

    #[test]
    fn cyclic_links_terminate() {
        let store = store_with(
            &["A", "B"],
            vec![
                event(&["A"], &["B"], 10.0, 10.0, 0.0),
                event(&["B"], &["A"], 10.0, 10.0, 0.0),
            ],
        );
        let v = MassBalanceValidator::validate(&store, "A", &LedgerConfig::default()).unwrap();
        assert_eq!(v.event_count, 2);
        assert_eq!(v.chains_visited.len(), 2);
    }

    #[test]
    fn unknown_chain_is_an_error() {
        let store = InMemoryCustodyStore::new();
        let err = MassBalanceValidator::validate(&store, "nope", &LedgerConfig::default()).unwrap_err();
        assert_eq!(err, LedgerError::ChainNotFound("nope".into()));
    }
}
