// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Road graphs built from [OpenStreetMap](https://www.openstreetmap.org/) extracts.
//!
//! OSM XML is converted into an undirected graph of intersections and road segments,
//! weighted by great-circle distance. Shortest paths are found with Dijkstra or A*,
//! and a [quadtree](crate::spatial::SpatialIndex) over projected edge geometry answers
//! viewport queries for renderers. Parsed graphs can be cached in a compact
//! [binary snapshot](crate::snapshot) to skip XML parsing on subsequent runs.
//!
//! # Example
//!
//! ```no_run
//! let ids = osmgraph::EdgeIdGenerator::default();
//! let options = osmgraph::osm::Options {
//!     filter: &osmgraph::osm::ROAD_FILTER,
//!     file_format: osmgraph::osm::FileFormat::Unknown,
//!     ids: &ids,
//! };
//! let (g, _used_cache) = osmgraph::load_graph(
//!     &["path/to/tampere.osm"],
//!     "path/to/tampere.bin",
//!     &options,
//! );
//!
//! let start = g.find_nearest_node(61.4978, 23.7610).unwrap();
//! let end = g.find_nearest_node(61.4500, 23.8500).unwrap();
//! match osmgraph::find_route(&g, start, end).expect("nodes exist in the graph") {
//!     Some(route) => println!("{}", osmgraph::format_distance(route.distance)),
//!     None => println!("no route"),
//! }
//! ```

mod distance;
mod graph;
mod id;
mod loader;
pub mod osm;
mod search;
pub mod snapshot;
pub mod spatial;

pub use distance::{format_distance, great_circle_distance, EARTH_RADIUS};
pub use graph::{Graph, GraphError};
pub use id::{Clock, EdgeIdGenerator, FixedClock, SystemClock};
pub use loader::load_graph;
pub use search::{astar, dijkstra, find_route, Route, SearchError};
pub use spatial::{query_visible, ProjectedEdge, Projection, Rect, SpatialIndex};

/// Identifier of a [Node], taken verbatim from the source data.
pub type NodeId = i64;

/// Identifier of an [Edge], generated during ingestion by an [EdgeIdGenerator].
pub type EdgeId = u32;

/// An intersection or a shape point of a road, positioned in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub lat: f64,
    pub lon: f64,
}

/// A road segment between two [Nodes](Node).
///
/// Edges are stored as a single directed record, but are traversable in both
/// directions once [Graph::create_adjacency] has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

/// One entry of a node's adjacency list: a reachable neighbor, the cost
/// of getting there (in meters) and the edge used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacencyEntry {
    pub neighbor: NodeId,
    pub weight: f64,
    pub edge_id: EdgeId,
}

/// Geographic region of accepted nodes, in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// An inverted box which contains nothing,
    /// and becomes exactly the other box when [expanded](BoundingBox::expand).
    pub const EMPTY: Self = Self {
        min_lat: f64::MAX,
        max_lat: f64::MIN,
        min_lon: f64::MAX,
        max_lon: f64::MIN,
    };

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Widens this box to the union of itself and `other`. Never shrinks.
    pub fn expand(&mut self, other: &BoundingBox) {
        self.min_lat = self.min_lat.min(other.min_lat);
        self.max_lat = self.max_lat.max(other.max_lat);
        self.min_lon = self.min_lon.min(other.min_lon);
        self.max_lon = self.max_lon.max(other.max_lon);
    }

    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lon > self.max_lon
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}
