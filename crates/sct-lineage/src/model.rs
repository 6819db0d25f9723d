//! Lineage result types: leveled nodes, directed edges, and the result set.
//!
//! A [`LineageNode`] is a traversal-time projection of an entity. It is owned
//! by the [`LineageResult`] that produced it and is never persisted.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sct_risk::RiskAssessment;
use sct_types::{Coordinates, Entity, EntityData, EntityRef, EntityType, Severity};

/// Traversal direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges whose source is on the frontier (downstream).
    Forward,
    /// Follow edges whose target is on the frontier (upstream).
    Backward,
    /// Both directions from the same start entity.
    Full,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
            Self::Full => write!(f, "full"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "downstream" => Ok(Self::Forward),
            "backward" | "upstream" => Ok(Self::Backward),
            "full" | "both" => Ok(Self::Full),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// LineageEdge
// ---------------------------------------------------------------------------

/// A directed relationship between two entities.
///
/// Direction always matches the stored relationship, regardless of which way
/// the traversal walked it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub source: EntityRef,
    pub target: EntityRef,
    /// Relation kind, e.g. "supplies", "delivers_to", "processed_into".
    #[serde(rename = "type")]
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntityData>,
}

/// Identity of an edge for deduplication.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct EdgeKey {
    source: EntityRef,
    target: EntityRef,
    relation: String,
    quantity_bits: Option<u64>,
    date: Option<DateTime<Utc>>,
}

impl LineageEdge {
    pub fn new(source: EntityRef, target: EntityRef, relation: impl Into<String>) -> Self {
        Self {
            source,
            target,
            relation: relation.into(),
            quantity: None,
            date: None,
            metadata: None,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub(crate) fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            relation: self.relation.clone(),
            quantity_bits: self.quantity.map(f64::to_bits),
            date: self.date,
        }
    }
}

// ---------------------------------------------------------------------------
// LineageNode
// ---------------------------------------------------------------------------

/// A leveled projection of an entity inside one lineage result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineageNode {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    pub data: EntityData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<Severity>,
    pub certifications: BTreeSet<String>,
    /// Great-circle kilometres from the start entity, when both are geolocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Signed hop count: 0 is the start, negative is upstream.
    pub level: i32,
}

impl LineageNode {
    /// Project an entity at a level, measuring distance from `origin`.
    pub fn from_entity(entity: &Entity, level: i32, origin: Option<&Coordinates>) -> Self {
        let distance = match (origin, entity.coordinates.as_ref()) {
            (Some(o), Some(c)) => Some(o.distance_km(c)),
            _ => None,
        };
        Self {
            id: entity.id.clone(),
            entity_type: entity.entity_type,
            name: entity.name.clone(),
            data: entity.data.clone(),
            coordinates: entity.coordinates,
            risk_level: entity.risk_level,
            certifications: entity.certifications.clone(),
            distance,
            level,
        }
    }

    pub fn reference(&self) -> EntityRef {
        EntityRef::new(self.id.clone(), self.entity_type)
    }
}

// ---------------------------------------------------------------------------
// LineageResult
// ---------------------------------------------------------------------------

/// A leveled graph snapshot around a start entity plus its risk summary.
///
/// # Invariants
///
/// - `total_nodes == nodes.len()`.
/// - `depth == max(level) - min(level)`.
/// - Every edge endpoint is one of `nodes`.
/// - Node identities are unique.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineageResult {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub direction: Direction,
    pub depth: u32,
    pub total_nodes: usize,
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<RiskAssessment>,
}

impl LineageResult {
    /// Build a result, deriving `depth` and `total_nodes` from the nodes.
    pub fn new(
        start: &EntityRef,
        direction: Direction,
        nodes: Vec<LineageNode>,
        edges: Vec<LineageEdge>,
        risk_assessment: Option<RiskAssessment>,
    ) -> Self {
        let min = nodes.iter().map(|n| n.level).min().unwrap_or(0);
        let max = nodes.iter().map(|n| n.level).max().unwrap_or(0);
        Self {
            entity_id: start.id.clone(),
            entity_type: start.entity_type,
            direction,
            depth: max.abs_diff(min),
            total_nodes: nodes.len(),
            nodes,
            edges,
            risk_assessment,
        }
    }

    /// Find a node by id.
    pub fn node(&self, id: &str) -> Option<&LineageNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The start entity's node (level 0).
    pub fn start_node(&self) -> Option<&LineageNode> {
        self.nodes
            .iter()
            .find(|n| n.id == self.entity_id && n.entity_type == self.entity_type)
    }

    /// Nodes at a given level, in traversal order.
    pub fn nodes_at_level(&self, level: i32) -> Vec<&LineageNode> {
        self.nodes.iter().filter(|n| n.level == level).collect()
    }

    /// Node ids as a set.
    pub fn node_ids(&self) -> BTreeSet<EntityRef> {
        self.nodes.iter().map(LineageNode::reference).collect()
    }

    /// Check the structural invariants listed on the type.
    pub fn is_consistent(&self) -> bool {
        let ids = self.node_ids();
        let min = self.nodes.iter().map(|n| n.level).min().unwrap_or(0);
        let max = self.nodes.iter().map(|n| n.level).max().unwrap_or(0);

        self.total_nodes == self.nodes.len()
            && ids.len() == self.nodes.len()
            && self.depth == max.abs_diff(min)
            && self
                .edges
                .iter()
                .all(|e| ids.contains(&e.source) && ids.contains(&e.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, level: i32) -> LineageNode {
        LineageNode::from_entity(&Entity::new(id, EntityType::Facility, id), level, None)
    }

    #[test]
    fn direction_parses_aliases() {
        assert_eq!("upstream".parse::<Direction>().unwrap(), Direction::Backward);
        assert_eq!("Forward".parse::<Direction>().unwrap(), Direction::Forward);
        assert_eq!("both".parse::<Direction>().unwrap(), Direction::Full);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn result_derives_depth_from_level_span() {
        let start = EntityRef::facility("B");
        let result = LineageResult::new(
            &start,
            Direction::Full,
            vec![node("A", -2), node("B", 0), node("C", 1)],
            vec![],
            None,
        );
        assert_eq!(result.depth, 3);
        assert_eq!(result.total_nodes, 3);
        assert_eq!(result.start_node().map(|n| n.id.as_str()), Some("B"));
        assert_eq!(result.nodes_at_level(-2).len(), 1);
        assert!(result.is_consistent());
    }

    #[test]
    fn dangling_edge_is_inconsistent() {
        let start = EntityRef::facility("A");
        let result = LineageResult::new(
            &start,
            Direction::Forward,
            vec![node("A", 0)],
            vec![LineageEdge::new(start.clone(), EntityRef::facility("Z"), "supplies")],
            None,
        );
        assert!(!result.is_consistent());
    }

    #[test]
    fn node_distance_needs_both_coordinates() {
        let origin = Coordinates::new(0.0, 0.0).unwrap();
        let placed = Entity::new("A", EntityType::Plot, "A").with_coordinates(0.0, 1.0);
        let unplaced = Entity::new("B", EntityType::Plot, "B");

        let d = LineageNode::from_entity(&placed, 1, Some(&origin)).distance.unwrap();
        assert!((d - 111.2).abs() < 0.5);
        assert!(LineageNode::from_entity(&unplaced, 1, Some(&origin)).distance.is_none());
        assert!(LineageNode::from_entity(&placed, 1, None).distance.is_none());
    }

    #[test]
    fn edge_key_distinguishes_dated_deliveries() {
        let a = EntityRef::plot("P");
        let b = EntityRef::facility("F");
        let e1 = LineageEdge::new(a.clone(), b.clone(), "delivers_to").with_quantity(10.0);
        let e2 = LineageEdge::new(a, b, "delivers_to").with_quantity(12.0);
        assert_ne!(e1.key(), e2.key());
        assert_eq!(e1.key(), e1.clone().key());
    }

    #[test]
    fn edge_serializes_relation_as_type() {
        let e = LineageEdge::new(EntityRef::plot("P"), EntityRef::facility("F"), "supplies");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "supplies");
        assert!(json.get("quantity").is_none());
    }
}
