// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::{HashMap, HashSet};

use crate::{great_circle_distance, AdjacencyEntry, BoundingBox, Edge, EdgeId, Node, NodeId};

/// Lookup failures on a [Graph].
///
/// On a fully built graph these indicate an inconsistency, and callers
/// are expected to propagate them rather than paper over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    /// The node is unknown to the adjacency lists, either because it doesn't exist,
    /// or because [Graph::create_adjacency] has not been called since it was added.
    #[error("no adjacency for node {0}")]
    NoAdjacency(NodeId),
}

/// Represents a road network as a set of [Nodes](Node) and undirected [Edges](Edge)
/// between them, together with the [BoundingBox] of accepted nodes.
///
/// The graph is built in two phases: first all nodes and edges are inserted,
/// then [Graph::create_adjacency] derives the adjacency lists used by route finding.
/// Once built, the graph is not mutated and may be shared between threads
/// running concurrent queries.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    /// Region of accepted nodes. Widened by every ingested `<bounds>` element.
    pub bbox: BoundingBox,
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    edge_pairs: HashSet<(NodeId, NodeId)>,
    adjacency: HashMap<NodeId, Vec<AdjacencyEntry>>,
}

/// Normalizes a (from, to) pair so that both directions map to the same key.
#[inline]
fn unordered(from: NodeId, to: NodeId) -> (NodeId, NodeId) {
    if from <= to {
        (from, to)
    } else {
        (to, from)
    }
}

impl Graph {
    /// Creates an empty graph with an [empty](BoundingBox::EMPTY) bounding box.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns an iterator over all [Nodes](Node), ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, Node)> + '_ {
        self.nodes.iter().map(|(&id, &node)| (id, node))
    }

    /// Returns an iterator over all [Edges](Edge), ordered by id.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, Edge)> + '_ {
        self.edges.iter().map(|(&id, &edge)| (id, edge))
    }

    /// Inserts a [Node] with the provided id.
    ///
    /// Nodes are immutable once inserted: if the id already exists,
    /// the stored node is kept and `false` is returned.
    pub fn add_node(&mut self, id: NodeId, node: Node) -> bool {
        match self.nodes.entry(id) {
            Entry::Vacant(e) => {
                e.insert(node);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Inserts an [Edge] with the provided id.
    ///
    /// Returns `false` and leaves the graph unchanged if an edge between the
    /// same two nodes (in either direction) already exists, if the id is already
    /// taken, or if any of the endpoints is not in the graph.
    pub fn add_edge(&mut self, id: EdgeId, edge: Edge) -> bool {
        if self.has_edge(edge.from, edge.to)
            || self.edges.contains_key(&id)
            || !self.has_node(edge.from)
            || !self.has_node(edge.to)
        {
            return false;
        }

        self.edges.insert(id, edge);
        self.edge_pairs.insert(unordered(edge.from, edge.to));
        true
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Checks if an edge between two nodes exists, regardless of its direction.
    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edge_pairs.contains(&unordered(from, to))
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: NodeId) -> Result<Node, GraphError> {
        self.nodes
            .get(&id)
            .copied()
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Retrieves an [Edge] with the provided id.
    pub fn get_edge(&self, id: EdgeId) -> Result<Edge, GraphError> {
        self.edges
            .get(&id)
            .copied()
            .ok_or(GraphError::EdgeNotFound(id))
    }

    /// Retrieves both endpoints of an [Edge], in `(from, to)` order.
    pub fn edge_endpoints(&self, id: EdgeId) -> Result<(Node, Node), GraphError> {
        let edge = self.get_edge(id)?;
        Ok((self.get_node(edge.from)?, self.get_node(edge.to)?))
    }

    /// Derives the adjacency lists from the edge set.
    ///
    /// Every edge produces two [AdjacencyEntries](AdjacencyEntry), one in each direction,
    /// with the same weight and edge id. Every node gets a (possibly empty) list,
    /// so isolated nodes can be told apart from unknown ones.
    ///
    /// Must be called after all nodes and edges have been inserted and before
    /// any route is requested. Calling it again rebuilds the lists from scratch.
    pub fn create_adjacency(&mut self) {
        self.adjacency.clear();
        self.adjacency.reserve(self.nodes.len());
        for &id in self.nodes.keys() {
            self.adjacency.insert(id, Vec::new());
        }

        for (&edge_id, &Edge { from, to }) in &self.edges {
            // add_edge guarantees both endpoints exist
            let (Some(&a), Some(&b)) = (self.nodes.get(&from), self.nodes.get(&to)) else {
                continue;
            };
            let weight = great_circle_distance(a, b);

            if let Some(list) = self.adjacency.get_mut(&from) {
                list.push(AdjacencyEntry {
                    neighbor: to,
                    weight,
                    edge_id,
                });
            }
            if let Some(list) = self.adjacency.get_mut(&to) {
                list.push(AdjacencyEntry {
                    neighbor: from,
                    weight,
                    edge_id,
                });
            }
        }
    }

    /// Gets the adjacency list of a node.
    ///
    /// An isolated node yields an empty slice, while an unknown node
    /// (or any node before [Graph::create_adjacency]) is an error.
    pub fn get_neighbors(&self, id: NodeId) -> Result<&[AdjacencyEntry], GraphError> {
        self.adjacency
            .get(&id)
            .map(|list| list.as_slice())
            .ok_or(GraphError::NoAdjacency(id))
    }

    /// Finds the closest [Node] to the given position.
    ///
    /// This function requires computing the distance to every [Node] in the graph,
    /// and is not suitable for repeated lookups on large graphs.
    pub fn find_nearest_node(&self, lat: f64, lon: f64) -> Option<NodeId> {
        let target = Node { lat, lon };
        self.nodes
            .iter()
            .map(|(&id, &node)| (great_circle_distance(node, target), id))
            .min_by(|(a_dist, _), (b_dist, _)| a_dist.total_cmp(b_dist))
            .map(|(_, id)| id)
    }
}
