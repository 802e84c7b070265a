// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod engine;
mod error;

pub use engine::{astar, dijkstra};
pub use error::SearchError;

use crate::{EdgeId, Graph, NodeId};

/// Result of a shortest path search.
///
/// `edges` are stored in **target to source** order, as produced by walking
/// the predecessor chain back from the target. Use [Route::edges_from_source]
/// for the travel order.
///
/// An empty `edges` list means that either the source and target are the same
/// node, or that the target is unreachable. `distance` can't tell these apart,
/// as zero-length edges are legitimate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub edges: Vec<EdgeId>,

    /// Total length of the route, in meters.
    pub distance: f64,
}

impl Route {
    /// Returns the edges of the route in the order of travel.
    pub fn edges_from_source(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().rev().copied()
    }
}

/// Finds the shortest route between two nodes with [astar].
///
/// Returns `Ok(None)` if the target is unreachable, and an empty route
/// if `from == to`. Unknown nodes or a graph without adjacency lists are errors.
pub fn find_route(g: &Graph, from: NodeId, to: NodeId) -> Result<Option<Route>, SearchError> {
    let route = astar(g, from, to)?;
    if route.edges.is_empty() && from != to {
        log::debug!("no route from {from} to {to}");
        Ok(None)
    } else {
        Ok(Some(route))
    }
}
