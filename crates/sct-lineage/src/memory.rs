use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use sct_types::{Entity, EntityRef, RiskFactor, Severity};

use crate::error::SourceError;
use crate::model::LineageEdge;
use crate::source::GraphSource;

/// In-memory graph source for tests, local analysis, and embedding.
///
/// Also supports fault injection (timeouts, monitoring outages) so callers
/// can exercise the engine's failure paths.
#[derive(Default)]
pub struct InMemoryGraph {
    inner: RwLock<GraphState>,
}

#[derive(Default)]
struct GraphState {
    entities: HashMap<EntityRef, Entity>,
    outgoing: HashMap<EntityRef, Vec<LineageEdge>>,
    incoming: HashMap<EntityRef, Vec<LineageEdge>>,
    signals: HashMap<EntityRef, Vec<RiskFactor>>,
    signal_outages: HashSet<EntityRef>,
    edge_timeouts: HashSet<EntityRef>,
    lookup_timeouts: HashSet<EntityRef>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphState>, SourceError> {
        self.inner
            .read()
            .map_err(|_| SourceError::Unavailable("graph read lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphState>, SourceError> {
        self.inner
            .write()
            .map_err(|_| SourceError::Unavailable("graph write lock poisoned".into()))
    }

    /// Insert an entity, replacing any existing entity with the same identity.
    pub fn upsert_entity(&self, entity: Entity) -> Result<(), SourceError> {
        let mut state = self.write()?;
        state.entities.insert(entity.reference(), entity);
        Ok(())
    }

    /// Record a relationship. Endpoints need not exist yet.
    pub fn add_edge(&self, edge: LineageEdge) -> Result<(), SourceError> {
        let mut state = self.write()?;
        state
            .incoming
            .entry(edge.target.clone())
            .or_default()
            .push(edge.clone());
        state
            .outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(edge);
        Ok(())
    }

    /// Update the externally monitored risk level of an entity.
    ///
    /// Returns `Ok(false)` if the entity does not exist.
    pub fn set_risk_level(
        &self,
        entity: &EntityRef,
        level: Option<Severity>,
    ) -> Result<bool, SourceError> {
        let mut state = self.write()?;
        match state.entities.get_mut(entity) {
            Some(e) => {
                e.risk_level = level;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Attach an external risk signal to an entity.
    pub fn add_risk_signal(&self, entity: &EntityRef, factor: RiskFactor) -> Result<(), SourceError> {
        let mut state = self.write()?;
        state.signals.entry(entity.clone()).or_default().push(factor);
        Ok(())
    }

    /// Make external risk lookups for an entity fail.
    pub fn fail_signals_for(&self, entity: &EntityRef) -> Result<(), SourceError> {
        self.write()?.signal_outages.insert(entity.clone());
        Ok(())
    }

    /// Make edge lookups for an entity time out.
    pub fn time_out_edges_for(&self, entity: &EntityRef) -> Result<(), SourceError> {
        self.write()?.edge_timeouts.insert(entity.clone());
        Ok(())
    }

    /// Make lookups of the entity itself time out.
    pub fn time_out_lookups_for(&self, entity: &EntityRef) -> Result<(), SourceError> {
        self.write()?.lookup_timeouts.insert(entity.clone());
        Ok(())
    }

    pub fn entity_count(&self) -> Result<usize, SourceError> {
        Ok(self.read()?.entities.len())
    }

    pub fn edge_count(&self) -> Result<usize, SourceError> {
        Ok(self.read()?.outgoing.values().map(Vec::len).sum())
    }
}

impl GraphSource for InMemoryGraph {
    fn get_entity(&self, entity: &EntityRef) -> Result<Option<Entity>, SourceError> {
        let state = self.read()?;
        if state.lookup_timeouts.contains(entity) {
            return Err(SourceError::Timeout(format!("lookup of {entity}")));
        }
        Ok(state.entities.get(entity).cloned())
    }

    fn outgoing_edges(&self, entity: &EntityRef) -> Result<Vec<LineageEdge>, SourceError> {
        let state = self.read()?;
        if state.edge_timeouts.contains(entity) {
            return Err(SourceError::Timeout(format!("outgoing edges of {entity}")));
        }
        Ok(state.outgoing.get(entity).cloned().unwrap_or_default())
    }

    fn incoming_edges(&self, entity: &EntityRef) -> Result<Vec<LineageEdge>, SourceError> {
        let state = self.read()?;
        if state.edge_timeouts.contains(entity) {
            return Err(SourceError::Timeout(format!("incoming edges of {entity}")));
        }
        Ok(state.incoming.get(entity).cloned().unwrap_or_default())
    }

    fn evaluate_risk_predicates(&self, entity: &Entity) -> Result<Vec<RiskFactor>, SourceError> {
        let state = self.read()?;
        let reference = entity.reference();
        if state.signal_outages.contains(&reference) {
            return Err(SourceError::Unavailable(format!(
                "forest monitoring lookup failed for {reference}"
            )));
        }
        Ok(state.signals.get(&reference).cloned().unwrap_or_default())
    }
}
