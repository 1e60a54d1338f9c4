//! Spatial lookups over a [`RoadGraph`].
//!
//! Nodes and edges are indexed in R-trees keyed on raw `[lng, lat]`
//! degrees. Nearest-edge distance is planar point-to-segment distance in
//! that space, which is accurate enough at city scale for snapping reports
//! to roads.

use std::sync::Arc;

use geo::{Closest, ClosestPoint};
use rstar::primitives::GeomWithData;
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use safe_route_geography_models::GeoPoint;

use crate::RoutingError;
use crate::graph::{EdgeId, EdgeWeights, NodeId, RoadGraph, Route};

/// Road network capability consumed by the injector and comparator.
pub trait RoadNetwork: Send + Sync {
    /// The underlying graph.
    fn graph(&self) -> &Arc<RoadGraph>;

    /// Closest node to `point`, or `None` for an empty graph.
    fn nearest_node(&self, point: &GeoPoint) -> Option<NodeId>;

    /// Closest edge to `point`, or `None` if the graph has no edges.
    fn nearest_edge(&self, point: &GeoPoint) -> Option<EdgeId>;

    /// Cheapest route from `src` to `dst` under `weights`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if either node is unknown or no path
    /// exists.
    fn shortest_path(
        &self,
        weights: &dyn EdgeWeights,
        src: NodeId,
        dst: NodeId,
    ) -> Result<Route, RoutingError> {
        self.graph().shortest_path(weights, src, dst)
    }
}

type NodeEntry = GeomWithData<[f64; 2], NodeId>;

/// An edge stored in the R-tree with its segment geometry.
struct EdgeEntry {
    id: EdgeId,
    segment: geo::Line<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for EdgeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for EdgeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let query = geo::Point::new(point[0], point[1]);
        let closest = match self.segment.closest_point(&query) {
            Closest::Intersection(p) | Closest::SinglePoint(p) => p,
            Closest::Indeterminate => self.segment.start_point(),
        };
        let dx = closest.x() - point[0];
        let dy = closest.y() - point[1];
        dx.mul_add(dx, dy * dy)
    }
}

fn key(point: &GeoPoint) -> [f64; 2] {
    [point.lng(), point.lat()]
}

/// In-memory [`RoadNetwork`] backed by R-trees.
pub struct IndexedRoadNetwork {
    graph: Arc<RoadGraph>,
    nodes: RTree<NodeEntry>,
    edges: RTree<EdgeEntry>,
}

impl std::fmt::Debug for IndexedRoadNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedRoadNetwork")
            .field("nodes", &self.nodes.size())
            .field("edges", &self.edges.size())
            .finish_non_exhaustive()
    }
}

impl IndexedRoadNetwork {
    /// Builds both spatial indexes.
    #[must_use]
    pub fn new(graph: Arc<RoadGraph>) -> Self {
        let nodes: Vec<NodeEntry> = graph
            .nodes()
            .map(|n| GeomWithData::new(key(&n.point), n.id))
            .collect();

        let edges: Vec<EdgeEntry> = graph
            .edges()
            .iter()
            .enumerate()
            .filter_map(|(id, e)| {
                let from = graph.node(e.from)?;
                let to = graph.node(e.to)?;
                // Both directions of a road share one canonical segment so
                // their distances compare equal.
                let (mut a, mut b) = (geo::Coord::from(from.point), geo::Coord::from(to.point));
                if (b.x, b.y) < (a.x, a.y) {
                    std::mem::swap(&mut a, &mut b);
                }
                Some(EdgeEntry {
                    id,
                    segment: geo::Line::new(a, b),
                    envelope: AABB::from_corners([a.x, a.y], [b.x, b.y]),
                })
            })
            .collect();

        let nodes = RTree::bulk_load(nodes);
        let edges = RTree::bulk_load(edges);
        log::info!(
            "Indexed road network: {} nodes, {} edges",
            nodes.size(),
            edges.size()
        );

        Self {
            graph,
            nodes,
            edges,
        }
    }
}

impl RoadNetwork for IndexedRoadNetwork {
    fn graph(&self) -> &Arc<RoadGraph> {
        &self.graph
    }

    fn nearest_node(&self, point: &GeoPoint) -> Option<NodeId> {
        let query = key(point);
        let mut candidates = self.nodes.nearest_neighbor_iter_with_distance_2(&query);
        let (first, best) = candidates.next()?;
        let mut id = first.data;
        for (entry, d) in candidates {
            if d > best {
                break;
            }
            id = id.min(entry.data);
        }
        Some(id)
    }

    fn nearest_edge(&self, point: &GeoPoint) -> Option<EdgeId> {
        let query = key(point);
        let mut candidates = self.edges.nearest_neighbor_iter_with_distance_2(&query);
        let (first, best) = candidates.next()?;
        let mut id = first.id;
        for (entry, d) in candidates {
            if d > best {
                break;
            }
            id = id.min(entry.id);
        }
        Some(id)
    }
}
