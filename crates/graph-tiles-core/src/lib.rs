//! Core domain types shared across the graph-tiles workspace.
//!
//! Callers describe a graph with [`GraphNode`] and [`GraphLink`] records (the
//! shape they have on the wire), then resolve them into a [`Graph`] whose
//! links point at node slots instead of raw ids. Everything downstream (the
//! layout engine, the projector, the tile generator) works on the resolved
//! form.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod progress;

pub use progress::{Phase, ProgressChannel, ProgressEvent};

// =============================================================================
// Errors
// =============================================================================

/// Result type alias for graph construction.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while resolving raw nodes and links into a [`Graph`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A link references a node id that is not part of the node set.
    #[error("link {link} references unknown node {id}")]
    UnknownNode { link: usize, id: NodeId },

    /// Two nodes share the same id.
    #[error("duplicate node id {id}")]
    DuplicateNode { id: NodeId },
}

// =============================================================================
// Geometry
// =============================================================================

/// A 2D position in layout space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A 2D velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// Raw graph records
// =============================================================================

/// Stable identifier of a node, as supplied by the caller.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node as supplied by the caller.
///
/// `group` only selects the fill colour; the physics never looks at it.
/// `x`/`y` optionally pin the starting position of the simulation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier for this node.
    #[serde(alias = "index")]
    pub id: NodeId,
    /// Category used for colouring.
    #[serde(default)]
    pub group: i64,
    /// Optional human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Preset x coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Preset y coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl GraphNode {
    /// Create a node with the given id and group.
    pub fn new(id: u64, group: i64) -> Self {
        Self {
            id: NodeId(id),
            group,
            ..Default::default()
        }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Pin the starting position of this node.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// The preset position, if both coordinates are given and finite.
    pub fn preset_position(&self) -> Option<Position> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Position::new(x, y)),
            _ => None,
        }
    }
}

/// A link between two node ids as supplied by the caller.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    /// Originating node id.
    pub source: NodeId,
    /// Destination node id.
    pub target: NodeId,
    /// Informational weight; not used by the physics.
    #[serde(default, alias = "weight", skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl GraphLink {
    pub fn new(source: u64, target: u64) -> Self {
        Self {
            source: NodeId(source),
            target: NodeId(target),
            value: None,
        }
    }

    /// Attach a weight.
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

// =============================================================================
// Resolved graph
// =============================================================================

/// A link whose endpoints have been resolved to node slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLink {
    /// Slot of the source node in [`Graph::nodes`].
    pub source: usize,
    /// Slot of the target node in [`Graph::nodes`].
    pub target: usize,
    /// Informational weight carried over from the raw link.
    pub weight: Option<f64>,
}

impl ResolvedLink {
    /// Whether both endpoints are the same node.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// A graph whose links have been checked against its node set.
///
/// Node slots are stable for the lifetime of the graph: slot `i` of every
/// per-node array (positions, velocities, degrees) refers to `nodes()[i]`.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    links: Vec<ResolvedLink>,
    slots: HashMap<NodeId, usize>,
}

impl Graph {
    /// Resolve raw nodes and links.
    ///
    /// Fails if two nodes share an id or a link names an id that is not in the
    /// node set. Self-loops are accepted.
    pub fn new(nodes: Vec<GraphNode>, links: Vec<GraphLink>) -> GraphResult<Self> {
        let mut slots = HashMap::with_capacity(nodes.len());
        for (slot, node) in nodes.iter().enumerate() {
            if slots.insert(node.id, slot).is_some() {
                return Err(GraphError::DuplicateNode { id: node.id });
            }
        }

        let links = links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let resolve = |id: NodeId| {
                    slots
                        .get(&id)
                        .copied()
                        .ok_or(GraphError::UnknownNode { link: i, id })
                };
                Ok(ResolvedLink {
                    source: resolve(link.source)?,
                    target: resolve(link.target)?,
                    weight: link.value,
                })
            })
            .collect::<GraphResult<Vec<_>>>()?;

        Ok(Self {
            nodes,
            links,
            slots,
        })
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[ResolvedLink] {
        &self.links
    }

    /// Slot of the node with the given id.
    pub fn slot_of(&self, id: NodeId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// Number of links touching each node slot. Self-loops count twice.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.nodes.len()];
        for link in &self.links {
            degrees[link.source] += 1;
            degrees[link.target] += 1;
        }
        degrees
    }

    /// Distinct node groups in ascending order.
    pub fn groups(&self) -> Vec<i64> {
        self.nodes
            .iter()
            .map(|n| n.group)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_nodes() -> Vec<GraphNode> {
        vec![GraphNode::new(10, 1), GraphNode::new(20, 2)]
    }

    #[test]
    fn resolves_links_to_slots() {
        let graph = Graph::new(two_nodes(), vec![GraphLink::new(20, 10).with_value(3.0)]).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 1);
        let link = graph.links()[0];
        assert_eq!((link.source, link.target), (1, 0));
        assert_eq!(link.weight, Some(3.0));
        assert_eq!(graph.slot_of(NodeId(20)), Some(1));
    }

    #[test]
    fn unknown_link_endpoint_is_rejected() {
        let err = Graph::new(
            two_nodes(),
            vec![GraphLink::new(10, 20), GraphLink::new(10, 99)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownNode {
                link: 1,
                id: NodeId(99)
            }
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let nodes = vec![GraphNode::new(1, 0), GraphNode::new(1, 0)];
        let err = Graph::new(nodes, vec![]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode { id: NodeId(1) });
    }

    #[test]
    fn self_loops_are_accepted() {
        let graph = Graph::new(two_nodes(), vec![GraphLink::new(10, 10)]).unwrap();
        assert!(graph.links()[0].is_self_loop());
        assert_eq!(graph.degrees(), vec![2, 0]);
    }

    #[test]
    fn groups_are_sorted_and_distinct() {
        let nodes = vec![
            GraphNode::new(1, 3),
            GraphNode::new(2, 1),
            GraphNode::new(3, 3),
        ];
        let graph = Graph::new(nodes, vec![]).unwrap();
        assert_eq!(graph.groups(), vec![1, 3]);
    }

    #[test]
    fn deserializes_index_alias_and_optional_fields() {
        let node: GraphNode =
            serde_json::from_str(r#"{"index": 4, "group": 2, "name": "Myriel"}"#).unwrap();
        assert_eq!(node.id, NodeId(4));
        assert_eq!(node.name.as_deref(), Some("Myriel"));
        assert_eq!(node.preset_position(), None);

        let link: GraphLink = serde_json::from_str(r#"{"source": 1, "target": 4}"#).unwrap();
        assert_eq!(link.value, None);
    }

    #[test]
    fn preset_position_requires_both_coordinates() {
        assert_eq!(
            GraphNode::new(1, 0).at(3.0, -4.0).preset_position(),
            Some(Position::new(3.0, -4.0))
        );
        let mut half = GraphNode::new(1, 0);
        half.x = Some(1.0);
        assert_eq!(half.preset_position(), None);
    }
}
