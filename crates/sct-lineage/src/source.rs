//! The [`GraphSource`] trait: the entity/relationship store the engine reads.

use sct_types::{Entity, EntityRef, RiskFactor};

use crate::error::SourceError;
use crate::model::LineageEdge;

/// Read access to the supply-chain graph.
///
/// Implementations must be thread-safe (`Send + Sync`); the engine only
/// reads, so any number of traversals may share one source. Timeouts are
/// reported as [`SourceError::Timeout`] and are not retried by the engine.
pub trait GraphSource: Send + Sync {
    /// Resolve an entity by identity.
    ///
    /// Returns `Ok(None)` if the entity does not exist.
    fn get_entity(&self, entity: &EntityRef) -> Result<Option<Entity>, SourceError>;

    /// Edges whose `source` is the given entity.
    fn outgoing_edges(&self, entity: &EntityRef) -> Result<Vec<LineageEdge>, SourceError>;

    /// Edges whose `target` is the given entity.
    fn incoming_edges(&self, entity: &EntityRef) -> Result<Vec<LineageEdge>, SourceError>;

    /// Risk signals from external monitoring (forest alerts, protected-area
    /// overlays) for one entity.
    ///
    /// The default implementation reports no signals.
    fn evaluate_risk_predicates(&self, _entity: &Entity) -> Result<Vec<RiskFactor>, SourceError> {
        Ok(Vec::new())
    }
}
