//! Lineage traversal for Supply Chain Trace.
//!
//! The [`LineageEngine`] walks a [`GraphSource`] from a start entity, forward
//! (downstream), backward (upstream) or both, and returns a leveled
//! [`LineageResult`] with the risk of every visited entity folded into one
//! [`RiskAssessment`](sct_risk::RiskAssessment).
//!
//! Traversal is breadth-first with a visited set keyed by `(id, type)`, so
//! cyclic graphs terminate and no entity appears twice. Every walk is bounded
//! by a hop limit and a hard node ceiling.
//!
//! # Quick Start
//!
//! ```rust
//! use sct_lineage::{InMemoryGraph, LineageEdge, LineageEngine};
//! use sct_types::{Entity, EntityRef, EntityType};
//!
//! let graph = InMemoryGraph::new();
//! graph.upsert_entity(Entity::new("P-1", EntityType::Plot, "Block A").with_coordinates(-1.6, 103.6))?;
//! graph.upsert_entity(Entity::new("M-1", EntityType::Facility, "Mill").with_certification("RSPO"))?;
//! graph.add_edge(LineageEdge::new(EntityRef::plot("P-1"), EntityRef::facility("M-1"), "supplies"))?;
//!
//! let engine = LineageEngine::with_defaults(graph);
//! let result = engine.trace_backward("M-1", EntityType::Facility, None)?;
//! assert_eq!(result.total_nodes, 2);
//! assert_eq!(result.node("P-1").map(|n| n.level), Some(-1));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod source;

pub use config::LineageConfig;
pub use engine::LineageEngine;
pub use error::{LineageError, SourceError, TraceResult};
pub use memory::InMemoryGraph;
pub use model::{Direction, LineageEdge, LineageNode, LineageResult};
pub use source::GraphSource;
