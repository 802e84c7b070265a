// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{GraphError, NodeId};

/// Error conditions which may occur during [dijkstra](crate::dijkstra),
/// [astar](crate::astar) or [find_route](crate::find_route).
///
/// An unreachable target is not an error - it results in an empty path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The start or end nodes don't exist in the graph.
    #[error("invalid node: {0}")]
    InvalidReference(NodeId),

    /// A lookup failed while expanding the search, which means the graph
    /// is inconsistent or its adjacency lists were never created.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
