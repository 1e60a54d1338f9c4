//! Directed road graph and deterministic shortest-path search.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use safe_route_geography_models::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::RoutingError;

/// Node identifier, typically an OSM node ID.
pub type NodeId = u64;

/// Index of an edge within [`RoadGraph::edges`].
pub type EdgeId = usize;

/// A road intersection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node ID.
    pub id: NodeId,
    /// Location.
    pub point: GeoPoint,
}

/// A directed road segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Start node.
    pub from: NodeId,
    /// End node.
    pub to: NodeId,
    /// Free-flow travel time in seconds.
    pub travel_time: f64,
}

/// Anything that can assign a traversal cost to an edge.
pub trait EdgeWeights {
    /// Cost of traversing `edge`.
    fn weight(&self, edge: EdgeId) -> f64;
}

/// An ordered node sequence with its total cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Nodes from origin to destination.
    pub nodes: Vec<NodeId>,
    /// Sum of edge weights along the route.
    pub total_weight: f64,
}

#[derive(Deserialize)]
struct GraphFile {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Immutable directed road graph.
///
/// At most one edge is kept per `(from, to)` pair.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    outgoing: BTreeMap<NodeId, Vec<EdgeId>>,
    by_endpoints: BTreeMap<(NodeId, NodeId), EdgeId>,
}

impl RoadGraph {
    /// Builds a graph, checking every edge.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidGraph`] for duplicate nodes, edges
    /// referencing unknown nodes, duplicate edges, or travel times that are
    /// negative or non-finite.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, RoutingError> {
        let mut node_map = BTreeMap::new();
        for node in nodes {
            if node_map.insert(node.id, node).is_some() {
                return Err(invalid(format!("duplicate node {}", node.id)));
            }
        }

        let mut outgoing: BTreeMap<NodeId, Vec<EdgeId>> = BTreeMap::new();
        let mut by_endpoints = BTreeMap::new();

        for (id, edge) in edges.iter().enumerate() {
            if !node_map.contains_key(&edge.from) || !node_map.contains_key(&edge.to) {
                return Err(invalid(format!(
                    "edge {} -> {} references an unknown node",
                    edge.from, edge.to
                )));
            }
            if !edge.travel_time.is_finite() || edge.travel_time < 0.0 {
                return Err(invalid(format!(
                    "edge {} -> {} has travel time {}",
                    edge.from, edge.to, edge.travel_time
                )));
            }
            if by_endpoints.insert((edge.from, edge.to), id).is_some() {
                return Err(invalid(format!("duplicate edge {} -> {}", edge.from, edge.to)));
            }
            outgoing.entry(edge.from).or_default().push(id);
        }

        Ok(Self {
            nodes: node_map,
            edges,
            outgoing,
            by_endpoints,
        })
    }

    /// Parses `{"nodes": [{id, point: {lat, lng}}], "edges": [{from, to,
    /// travelTime}]}`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if the JSON is malformed or the graph is
    /// invalid.
    pub fn from_json(json: &str) -> Result<Self, RoutingError> {
        let file: GraphFile = serde_json::from_str(json)?;
        Self::new(file.nodes, file.edges)
    }

    /// Node with `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges, indexed by [`EdgeId`].
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The edge from `from` to `to`, if present.
    #[must_use]
    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.by_endpoints.get(&(from, to)).copied()
    }

    /// The edge running opposite to `edge`, if present.
    #[must_use]
    pub fn reverse_of(&self, edge: EdgeId) -> Option<EdgeId> {
        let e = self.edges.get(edge)?;
        self.edge_between(e.to, e.from).filter(|&r| r != edge)
    }

    /// Edges traversed by `route`, in order.
    pub fn route_edges<'a>(&'a self, route: &'a Route) -> impl Iterator<Item = EdgeId> + 'a {
        route
            .nodes
            .windows(2)
            .filter_map(|pair| self.edge_between(pair[0], pair[1]))
    }

    /// Dijkstra from `src` to `dst` under `weights`.
    ///
    /// The frontier is ordered by `(cost, node id)` and a predecessor is
    /// only replaced on a strictly lower cost, so equal-cost ties always
    /// resolve the same way. Edges with non-finite weight are impassable.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnknownNode`] if either endpoint is missing
    /// and [`RoutingError::NoPath`] if `dst` is unreachable.
    pub fn shortest_path(
        &self,
        weights: &dyn EdgeWeights,
        src: NodeId,
        dst: NodeId,
    ) -> Result<Route, RoutingError> {
        for id in [src, dst] {
            if !self.nodes.contains_key(&id) {
                return Err(RoutingError::UnknownNode { id });
            }
        }

        let mut dist: BTreeMap<NodeId, f64> = BTreeMap::new();
        let mut prev: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut heap = BinaryHeap::new();

        dist.insert(src, 0.0);
        heap.push(Frontier { cost: 0.0, node: src });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if node == dst {
                break;
            }
            if dist.get(&node).is_some_and(|&best| cost > best) {
                continue;
            }

            for &edge_id in self.outgoing.get(&node).map_or(&[][..], Vec::as_slice) {
                let w = weights.weight(edge_id);
                if !w.is_finite() || w < 0.0 {
                    continue;
                }
                let next = self.edges[edge_id].to;
                let candidate = cost + w;
                if dist.get(&next).is_none_or(|&best| candidate < best) {
                    dist.insert(next, candidate);
                    prev.insert(next, node);
                    heap.push(Frontier {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }

        let total_weight = *dist
            .get(&dst)
            .ok_or(RoutingError::NoPath { from: src, to: dst })?;

        let mut nodes = vec![dst];
        let mut cursor = dst;
        while cursor != src {
            cursor = *prev
                .get(&cursor)
                .ok_or(RoutingError::NoPath { from: src, to: dst })?;
            nodes.push(cursor);
        }
        nodes.reverse();

        Ok(Route {
            nodes,
            total_weight,
        })
    }
}

impl EdgeWeights for RoadGraph {
    fn weight(&self, edge: EdgeId) -> f64 {
        self.edges.get(edge).map_or(f64::INFINITY, |e| e.travel_time)
    }
}

fn invalid(message: String) -> RoutingError {
    RoutingError::InvalidGraph { message }
}

/// Heap entry ordered so the smallest `(cost, node)` pops first.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
