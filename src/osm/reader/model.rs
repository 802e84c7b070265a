// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{BoundingBox, Node, NodeId};

/// Represents an [OSM way](https://wiki.openstreetmap.org/wiki/Way).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<NodeId>,

    /// Tags in document order. Keys may repeat.
    pub tags: Vec<(String, String)>,
}

/// Union over all OSM XML elements relevant for building a road graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Bounds(BoundingBox),
    Node(NodeId, Node),
    Way(Way),
}
