//! Bounded breadth-first lineage traversal with per-call risk aggregation.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use sct_risk::{RiskAssessment, RiskError, RiskEvaluator};
use sct_types::{Entity, EntityRef, EntityType};

use crate::config::LineageConfig;
use crate::error::{LineageError, SourceError, TraceResult};
use crate::model::{Direction, EdgeKey, LineageEdge, LineageNode, LineageResult};
use crate::source::GraphSource;

/// Predicate name recorded when the source's monitoring lookup fails.
const EXTERNAL_MONITORING: &str = "external_monitoring";

/// One hop direction of a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Downstream,
    Upstream,
}

impl Step {
    fn sign(self) -> i32 {
        match self {
            Self::Downstream => 1,
            Self::Upstream => -1,
        }
    }
}

/// Entities and edges collected by one walk, in discovery order.
#[derive(Default)]
struct Walk {
    visited: Vec<(Entity, i32)>,
    edges: Vec<LineageEdge>,
}

/// Traverses a [`GraphSource`] and assesses the risk of what it finds.
///
/// The engine holds no per-query state: every call scopes its own visited
/// set, so concurrent traversals over the same source never interfere.
pub struct LineageEngine<S: GraphSource> {
    source: S,
    evaluator: RiskEvaluator,
    config: LineageConfig,
}

impl<S: GraphSource> LineageEngine<S> {
    pub fn new(source: S, evaluator: RiskEvaluator, config: LineageConfig) -> Self {
        Self {
            source,
            evaluator,
            config,
        }
    }

    /// Engine with the built-in predicates, default policy and default bounds.
    pub fn with_defaults(source: S) -> Self {
        Self::new(source, RiskEvaluator::default(), LineageConfig::default())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &LineageConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &RiskEvaluator {
        &self.evaluator
    }

    /// Follow edges downstream from the start entity.
    pub fn trace_forward(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        max_depth: Option<u32>,
    ) -> TraceResult<LineageResult> {
        self.trace(Direction::Forward, entity_id, entity_type, max_depth)
    }

    /// Follow edges upstream from the start entity. Levels are negative.
    pub fn trace_backward(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        max_depth: Option<u32>,
    ) -> TraceResult<LineageResult> {
        self.trace(Direction::Backward, entity_id, entity_type, max_depth)
    }

    /// Union of the forward and backward walks around the start entity.
    pub fn full_lineage(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        max_depth: Option<u32>,
    ) -> TraceResult<LineageResult> {
        self.trace(Direction::Full, entity_id, entity_type, max_depth)
    }

    /// Run a traversal in the given direction.
    pub fn trace(
        &self,
        direction: Direction,
        entity_id: &str,
        entity_type: EntityType,
        max_depth: Option<u32>,
    ) -> TraceResult<LineageResult> {
        let start_ref = EntityRef::new(entity_id, entity_type);
        let start = self
            .source
            .get_entity(&start_ref)?
            .ok_or_else(|| LineageError::EntityNotFound(start_ref.clone()))?;
        let depth = self.config.effective_depth(max_depth);

        let walk = match direction {
            Direction::Forward => self.walk(&start, Step::Downstream, depth)?,
            Direction::Backward => self.walk(&start, Step::Upstream, depth)?,
            Direction::Full => {
                let forward = self.walk(&start, Step::Downstream, depth)?;
                let backward = self.walk(&start, Step::Upstream, depth)?;
                self.union(forward, backward)?
            }
        };

        let risk_assessment = if self.config.assess_risk {
            Some(self.assess(walk.visited.iter().map(|(e, _)| e)))
        } else {
            None
        };

        let origin = start.coordinates;
        let nodes = walk
            .visited
            .iter()
            .map(|(entity, level)| LineageNode::from_entity(entity, *level, origin.as_ref()))
            .collect();
        let result = LineageResult::new(&start_ref, direction, nodes, walk.edges, risk_assessment);

        info!(
            start = %start_ref,
            %direction,
            depth,
            nodes = result.total_nodes,
            edges = result.edges.len(),
            "lineage traced"
        );
        Ok(result)
    }

    /// Breadth-first walk from `start`, at most `max_depth` hops.
    ///
    /// Edges into already visited entities are kept, so the result never
    /// holds an edge whose endpoint is missing.
    fn walk(&self, start: &Entity, step: Step, max_depth: u32) -> TraceResult<Walk> {
        let start_ref = start.reference();
        let mut walk = Walk::default();
        let mut visited: HashSet<EntityRef> = HashSet::new();
        let mut seen_edges: HashSet<EdgeKey> = HashSet::new();
        let mut queue: VecDeque<(EntityRef, u32)> = VecDeque::new();

        visited.insert(start_ref.clone());
        walk.visited.push((start.clone(), 0));
        queue.push_back((start_ref, 0));

        while let Some((current, hops)) = queue.pop_front() {
            if hops >= max_depth {
                continue;
            }

            let edges = match step {
                Step::Downstream => self.source.outgoing_edges(&current)?,
                Step::Upstream => self.source.incoming_edges(&current)?,
            };

            for edge in edges {
                let (anchor, neighbor) = match step {
                    Step::Downstream => (&edge.source, edge.target.clone()),
                    Step::Upstream => (&edge.target, edge.source.clone()),
                };
                if *anchor != current {
                    continue;
                }

                if !visited.contains(&neighbor) {
                    let Some(entity) = self.source.get_entity(&neighbor)? else {
                        warn!(from = %current, missing = %neighbor, "edge points at unknown entity; skipping");
                        continue;
                    };
                    if walk.visited.len() >= self.config.max_nodes {
                        return Err(LineageError::LineageTooLarge {
                            limit: self.config.max_nodes,
                        });
                    }
                    let level = step.sign() * (hops as i32 + 1);
                    debug!(entity = %neighbor, level, "visited lineage node");
                    visited.insert(neighbor.clone());
                    walk.visited.push((entity, level));
                    queue.push_back((neighbor, hops + 1));
                }

                if seen_edges.insert(edge.key()) {
                    walk.edges.push(edge);
                }
            }
        }

        Ok(walk)
    }

    /// Merge two walks from the same start entity.
    ///
    /// An entity reached both ways keeps the level closest to the start;
    /// on a tie the downstream level wins. Nodes come out ordered by level.
    fn union(&self, forward: Walk, backward: Walk) -> TraceResult<Walk> {
        let mut index: HashMap<EntityRef, usize> = HashMap::new();
        let mut visited: Vec<(Entity, i32)> = Vec::new();

        for (entity, level) in forward.visited.into_iter().chain(backward.visited) {
            let reference = entity.reference();
            match index.get(&reference) {
                Some(&i) => {
                    if level.abs() < visited[i].1.abs() {
                        visited[i].1 = level;
                    }
                }
                None => {
                    index.insert(reference, visited.len());
                    visited.push((entity, level));
                }
            }
        }

        if visited.len() > self.config.max_nodes {
            return Err(LineageError::LineageTooLarge {
                limit: self.config.max_nodes,
            });
        }
        visited.sort_by_key(|(_, level)| *level);

        let mut seen_edges: HashSet<EdgeKey> = HashSet::new();
        let edges = forward
            .edges
            .into_iter()
            .chain(backward.edges)
            .filter(|e| seen_edges.insert(e.key()))
            .collect();

        Ok(Walk { visited, edges })
    }

    /// Evaluate every visited entity once and fold the factors together.
    ///
    /// Predicate and monitoring failures degrade the entity to "unevaluated"
    /// instead of failing the query.
    fn assess<'a>(&self, entities: impl Iterator<Item = &'a Entity>) -> RiskAssessment {
        let evaluations = entities.map(|entity| {
            let mut evaluation = self.evaluator.evaluate_entity(entity);
            match self.source.evaluate_risk_predicates(entity) {
                Ok(signals) => {
                    evaluation.factors.extend(signals.into_iter().map(|mut factor| {
                        if factor.entity_id.is_empty() {
                            factor.entity_id = entity.id.clone();
                        }
                        self.evaluator.classify(factor)
                    }));
                }
                Err(e) => {
                    warn!(entity = %entity.reference(), error = %e, "risk signal lookup failed; treating as unknown");
                    evaluation.failures.push(match e {
                        SourceError::Timeout(_) => RiskError::Timeout {
                            predicate: EXTERNAL_MONITORING.into(),
                        },
                        SourceError::Unavailable(message) => RiskError::Lookup {
                            predicate: EXTERNAL_MONITORING.into(),
                            message,
                        },
                    });
                }
            }
            evaluation
        });
        self.evaluator.assess(evaluations.collect::<Vec<_>>())
    }
}
