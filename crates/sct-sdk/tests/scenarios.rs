//! End-to-end scenarios through the `SupplyChain` facade.

use sct_ledger::LedgerError;
use sct_sdk::{
    ChainStatus, CustodyEventType, Dataset, Direction, Entity, EntityRef, EntityType,
    LineageEdge, MergeRequest, NewCustodyChain, NewCustodyEvent, NewMassBalanceEvent, SctConfig,
    SdkError, Severity, SplitRequest, SupplyChain,
};

const DATASET: &str = r#"{
    "entities": [
        {"id": "P1", "type": "plot", "name": "Block 7",
         "coordinates": {"latitude": 1.50, "longitude": 101.40},
         "data": {"protected_area_overlap": true, "protected_area_name": "Tesso Nilo"}},
        {"id": "P2", "type": "plot", "name": "Block 9",
         "coordinates": {"latitude": 1.52, "longitude": 101.42}},
        {"id": "CP1", "type": "facility", "name": "Collection point",
         "certifications": ["RSPO"]},
        {"id": "M1", "type": "facility", "name": "Mill",
         "certifications": ["RSPO"], "coordinates": {"latitude": 1.60, "longitude": 101.50}},
        {"id": "S1", "type": "shipment", "name": "Vessel 12"}
    ],
    "edges": [
        {"source": {"id": "P1", "type": "plot"}, "target": {"id": "CP1", "type": "facility"},
         "type": "supplies", "quantity": 60.0},
        {"source": {"id": "P2", "type": "plot"}, "target": {"id": "CP1", "type": "facility"},
         "type": "supplies", "quantity": 40.0},
        {"source": {"id": "CP1", "type": "facility"}, "target": {"id": "M1", "type": "facility"},
         "type": "delivers_to", "quantity": 100.0},
        {"source": {"id": "M1", "type": "facility"}, "target": {"id": "S1", "type": "shipment"},
         "type": "processed_into", "quantity": 21.0}
    ],
    "chains": [
        {"chain_id": "LOT-1", "product_type": "FFB", "total_quantity": 100.0,
         "source_plot": {"id": "P1", "type": "plot"},
         "source_facility": {"id": "CP1", "type": "facility"}}
    ],
    "operations": [
        {"op": "event", "chain_id": "LOT-1",
         "event": {"event_type": "ship", "quantity": 10.0,
                   "facility": {"id": "CP1", "type": "facility"}}},
        {"op": "split", "parent_chain_id": "LOT-1", "process_location": "CP1",
         "splits": [{"quantity": 50.0}, {"quantity": 40.0}]},
        {"op": "merge", "parent_chain_ids": ["LOT-1-01", "LOT-1-02"],
         "destination_facility": {"id": "M1", "type": "facility"},
         "product_type": "FFB", "process_location": "M1",
         "merged_chain_id": "MILL-IN-1"},
        {"op": "mass_balance", "parent_chain_ids": ["MILL-IN-1"],
         "input_quantity": 90.0, "output_quantity": 19.8, "waste_quantity": 70.2,
         "notes": "milling"}
    ]
}"#;

fn loaded() -> SupplyChain {
    let dataset = Dataset::from_json_str(DATASET).unwrap();
    SupplyChain::from_dataset(SctConfig::default(), dataset).unwrap()
}

// ---- Lineage ----

#[test]
fn entity_without_outgoing_edges_traces_to_itself() {
    let sc = loaded();
    let result = sc.trace_forward("S1", EntityType::Shipment, None).unwrap();
    assert_eq!(result.total_nodes, 1);
    assert!(result.edges.is_empty());
    assert_eq!(result.nodes[0].id, "S1");
    assert_eq!(result.nodes[0].level, 0);
}

#[test]
fn protected_area_plot_is_flagged_downstream() {
    let sc = loaded();
    let result = sc.trace_forward("P1", EntityType::Plot, None).unwrap();
    assert_eq!(result.total_nodes, 4);

    let risk = result.risk_assessment.as_ref().unwrap();
    assert!(risk.overall_risk >= Severity::Medium);
    assert!(!risk.compliance.eudr_compliant);
    assert!(risk.factors_for("P1").any(|f| f.risk_type == "protected_area"));
}

#[test]
fn backward_trace_from_mill_reaches_both_plots() {
    let sc = loaded();
    let result = sc.trace_backward("M1", EntityType::Facility, None).unwrap();
    let plots: Vec<_> = result.nodes_at_level(-2).iter().map(|n| n.id.clone()).collect();
    assert_eq!(plots.len(), 2);
    assert!(plots.contains(&"P1".to_string()));
    assert!(plots.contains(&"P2".to_string()));
    assert!(result.is_consistent());

    let p2 = result.node("P2").unwrap();
    assert!(p2.distance.unwrap() > 0.0);
}

#[test]
fn full_lineage_is_union_of_both_directions() {
    let sc = loaded();
    let forward = sc.trace_forward("CP1", EntityType::Facility, None).unwrap();
    let backward = sc.trace_backward("CP1", EntityType::Facility, None).unwrap();
    let full = sc.trace(Direction::Full, "CP1", EntityType::Facility, None).unwrap();

    let mut union = forward.node_ids();
    union.extend(backward.node_ids());
    assert_eq!(full.node_ids(), union);
    assert_eq!(full.total_nodes, 5);
}

#[test]
fn depth_limit_bounds_the_walk() {
    let sc = loaded();
    let result = sc.trace_forward("P1", EntityType::Plot, Some(1)).unwrap();
    assert_eq!(result.total_nodes, 2);
    assert_eq!(result.depth, 1);
}

#[test]
fn risk_signals_from_dataset_reach_the_assessment() {
    let mut dataset = Dataset::from_json_str(DATASET).unwrap();
    dataset.risk_signals.push(sct_sdk::RiskSignal {
        entity: EntityRef::new("S1", EntityType::Shipment),
        risk_type: "deforestation_alert".into(),
        severity: Severity::Critical,
        description: "GLAD alert on supplying area".into(),
    });
    let sc = SupplyChain::from_dataset(SctConfig::default(), dataset).unwrap();

    let result = sc.trace_backward("S1", EntityType::Shipment, None).unwrap();
    let risk = result.risk_assessment.unwrap();
    assert_eq!(risk.overall_risk, Severity::Critical);
    assert!(risk.factors_for("S1").any(|f| f.risk_type == "deforestation_alert"));
}

// ---- Custody ----

#[test]
fn dataset_operations_build_the_chain_history() {
    let sc = loaded();

    let lot = sc.custody_chain("LOT-1").unwrap();
    assert_eq!(lot.status, ChainStatus::Split);
    assert_eq!(lot.remaining_quantity, 0.0);

    let merged = sc.custody_chain("MILL-IN-1").unwrap();
    assert_eq!(merged.total_quantity, 90.0);
    assert_eq!(merged.parent_chain_ids, vec!["LOT-1-01".to_string(), "LOT-1-02".to_string()]);

    let report = sc.balance_report("LOT-1").unwrap();
    assert_eq!(report.events.len(), 3);
    assert_eq!(report.events[0].event_type, CustodyEventType::Receive);
    assert_eq!(report.events[1].event_type, CustodyEventType::Ship);
    assert_eq!(report.events[2].event_type, CustodyEventType::Split);
    assert!(report.replay.matches_stored);
    assert!(report.validation.is_valid);
    assert_eq!(report.validation.event_count, 3);
    assert_eq!(report.validation.chains_visited.len(), 4);
}

#[test]
fn split_sixty_forty() {
    let sc = SupplyChain::with_defaults();
    sc.create_custody_chain(NewCustodyChain::new("C", "FFB", 100.0)).unwrap();

    let outcome = sc
        .split_custody_chain(SplitRequest::new("C", &[60.0, 40.0], "mill"))
        .unwrap();
    let quantities: Vec<f64> = outcome.child_chains.iter().map(|c| c.total_quantity).collect();
    assert_eq!(quantities, vec![60.0, 40.0]);
    assert_eq!(outcome.parent_chain.remaining_quantity, 0.0);
    assert_eq!(outcome.parent_chain.status, ChainStatus::Split);

    let events = sc.ledger().mass_balance_events("C").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].input_quantity, 100.0);
    assert_eq!(events[0].output_quantity, 100.0);
    assert_eq!(events[0].waste_quantity, Some(0.0));
}

#[test]
fn milling_waste_is_implied() {
    let sc = SupplyChain::with_defaults();
    sc.create_custody_chain(NewCustodyChain::new("C", "FFB", 100.0)).unwrap();

    let event = sc
        .record_mass_balance_event(NewMassBalanceEvent::process("C", 100.0, 92.0))
        .unwrap();
    assert_eq!(event.waste_quantity, Some(8.0));

    let validation = sc.validate_mass_balance("C").unwrap();
    assert!(validation.is_valid);
    assert_eq!(validation.efficiency, 0.92);
}

#[test]
fn oversized_split_leaves_chain_untouched() {
    let sc = SupplyChain::with_defaults();
    sc.create_custody_chain(NewCustodyChain::new("C", "FFB", 100.0)).unwrap();
    let before = sc.custody_chain("C").unwrap();

    let err = sc
        .split_custody_chain(SplitRequest::new("C", &[70.0, 40.0], "mill"))
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::Ledger(LedgerError::SplitExceedsAvailable { .. })
    ));
    assert_eq!(sc.custody_chain("C").unwrap(), before);
    assert_eq!(sc.ledger().events("C").unwrap().len(), 1);
}

#[test]
fn split_then_merge_conserves_mass() {
    let sc = SupplyChain::with_defaults();
    sc.create_custody_chain(NewCustodyChain::new("C", "CPO", 80.0)).unwrap();
    sc.record_custody_event("C", NewCustodyEvent::new(CustodyEventType::Process).with_quantity(12.5))
        .unwrap();
    let available = sc.custody_chain("C").unwrap().remaining_quantity;

    let split = sc
        .split_custody_chain(SplitRequest::new("C", &[30.0, 20.0, 17.5], "refinery"))
        .unwrap();
    let children: Vec<String> = split.child_chains.iter().map(|c| c.chain_id.clone()).collect();

    let merged = sc
        .merge_custody_chains(MergeRequest::new(
            children,
            EntityRef::facility("R1"),
            "CPO",
            "refinery",
        ))
        .unwrap();
    let tolerance = sc.ledger().config().allowed_variance(available);
    assert!((merged.merged_chain.total_quantity - available).abs() <= tolerance);
    assert!(sc.validate_mass_balance("C").unwrap().is_valid);
}

#[test]
fn retried_split_returns_first_outcome() {
    let sc = SupplyChain::with_defaults();
    sc.create_custody_chain(NewCustodyChain::new("C", "FFB", 10.0)).unwrap();
    let request = SplitRequest::new("C", &[4.0, 6.0], "cp").with_idempotency_key("req-1");

    let first = sc.split_custody_chain(request.clone()).unwrap();
    let second = sc.split_custody_chain(request).unwrap();
    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.child_chains, second.child_chains);
    assert_eq!(sc.ledger().store().chain_count().unwrap(), 3);
}

// ---- Config and files ----

#[test]
fn config_and_dataset_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sct.toml");
    let dataset_path = dir.path().join("dataset.json");
    std::fs::write(&config_path, "[lineage]\ndefault_max_depth = 1\n").unwrap();
    std::fs::write(&dataset_path, DATASET).unwrap();

    let config = SctConfig::load(&config_path).unwrap();
    let sc = SupplyChain::load_dataset(config, &dataset_path).unwrap();
    let result = sc.trace_forward("P1", EntityType::Plot, None).unwrap();
    assert_eq!(result.total_nodes, 2);
}

#[test]
fn risk_assessment_can_be_disabled() {
    let mut config = SctConfig::default();
    config.lineage.assess_risk = false;
    let sc = SupplyChain::new(config);
    sc.graph()
        .upsert_entity(Entity::new("P", EntityType::Plot, "plot"))
        .unwrap();
    sc.graph()
        .add_edge(LineageEdge::new(EntityRef::plot("P"), EntityRef::plot("P"), "self"))
        .unwrap();

    let result = sc.trace_forward("P", EntityType::Plot, None).unwrap();
    assert!(result.risk_assessment.is_none());
    assert_eq!(result.total_nodes, 1);
    assert_eq!(result.edges.len(), 1);
}
