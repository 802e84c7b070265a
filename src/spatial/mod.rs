// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Viewport culling over projected edge geometry.
//!
//! Edges are projected from WGS84 degrees into a flat world space with
//! a [Projection], and stored in a [quadtree](Quadtree) by a [SpatialIndex].
//! Renderers then only fetch the edges intersecting the visible region.

mod quadtree;

use std::collections::HashSet;

pub use quadtree::{Quadtree, MAX_DEPTH};

use crate::{BoundingBox, EdgeId, Graph, GraphError, Node, NodeId};

/// Default number of edges a quadtree node holds before subdividing.
pub const DEFAULT_CAPACITY: usize = 4;

/// Axis-aligned rectangle in world space. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Returns the smallest rectangle containing both points.
    pub fn spanning(a: (f32, f32), b: (f32, f32)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_y: a.1.min(b.1),
            max_x: a.0.max(b.0),
            max_y: a.1.max(b.1),
        }
    }

    /// Returns a square with half-side `radius` centered on `point`.
    pub fn around(point: (f32, f32), radius: f32) -> Self {
        Self {
            min_x: point.0 - radius,
            min_y: point.1 - radius,
            max_x: point.0 + radius,
            max_y: point.1 + radius,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Checks whether the two rectangles overlap. Touching counts as overlapping.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y)
    }

    /// Splits the rectangle into four equal quadrants:
    /// top-left, top-right, bottom-left and bottom-right (with `y` growing downwards).
    pub fn quadrants(&self) -> [Rect; 4] {
        let mid_x = self.min_x + self.width() / 2.0;
        let mid_y = self.min_y + self.height() / 2.0;
        [
            Rect::new(self.min_x, self.min_y, mid_x, mid_y),
            Rect::new(mid_x, self.min_y, self.max_x, mid_y),
            Rect::new(self.min_x, mid_y, mid_x, self.max_y),
            Rect::new(mid_x, mid_y, self.max_x, self.max_y),
        ]
    }
}

/// An [Edge](crate::Edge) projected into world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedEdge {
    pub edge_id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub endpoint_a: (f32, f32),
    pub endpoint_b: (f32, f32),
}

impl ProjectedEdge {
    pub fn bbox(&self) -> Rect {
        Rect::spanning(self.endpoint_a, self.endpoint_b)
    }
}

/// Equirectangular mapping of a geographic [BoundingBox] onto a
/// `width` × `height` world space, with `y` growing southwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub bbox: BoundingBox,
    pub width: f32,
    pub height: f32,
}

impl Projection {
    /// Degenerate (single-point) boxes are stretched to this span, in degrees.
    const MIN_SPAN: f64 = 1e-6;

    pub fn new(bbox: BoundingBox, width: f32, height: f32) -> Self {
        Self {
            bbox,
            width,
            height,
        }
    }

    /// Returns the world space covered by this projection.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn project(&self, node: Node) -> (f32, f32) {
        let lat_span = (self.bbox.max_lat - self.bbox.min_lat).max(Self::MIN_SPAN);
        let lon_span = (self.bbox.max_lon - self.bbox.min_lon).max(Self::MIN_SPAN);
        let x = (node.lon - self.bbox.min_lon) / lon_span * self.width as f64;
        let y = (self.bbox.max_lat - node.lat) / lat_span * self.height as f64;
        (x as f32, y as f32)
    }
}

/// [Quadtree] of projected graph edges.
///
/// The index is never updated in place - on any change of the [Projection]
/// (like a viewport resize) call [SpatialIndex::rebuild], which reprojects
/// and reinserts every edge.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    projection: Projection,
    edges: Vec<ProjectedEdge>,
    tree: Quadtree,
}

impl SpatialIndex {
    /// Creates an empty index covering the world space of the projection.
    pub fn new(projection: Projection, capacity: usize) -> Self {
        Self {
            projection,
            edges: Vec::new(),
            tree: Quadtree::new(projection.bounds(), capacity),
        }
    }

    /// Projects and indexes every edge of the graph.
    pub fn build(g: &Graph, projection: Projection, capacity: usize) -> Result<Self, GraphError> {
        let mut index = Self::new(projection, capacity);
        for (id, edge) in g.edges() {
            let (a, b) = g.edge_endpoints(id)?;
            index.insert(ProjectedEdge {
                edge_id: id,
                from: edge.from,
                to: edge.to,
                endpoint_a: projection.project(a),
                endpoint_b: projection.project(b),
            });
        }

        log::debug!(
            "indexed {} edges in {} quadtree nodes",
            index.len(),
            index.tree.node_count(),
        );
        Ok(index)
    }

    /// Discards the tree and rebuilds it from the graph with a new projection.
    /// On error, the index is left untouched.
    pub fn rebuild(&mut self, g: &Graph, projection: Projection) -> Result<(), GraphError> {
        *self = Self::build(g, projection, self.tree.capacity())?;
        Ok(())
    }

    /// Adds an already-projected edge to the index.
    /// Returns false if the edge lies outside of the indexed world space.
    pub fn insert(&mut self, edge: ProjectedEdge) -> bool {
        let bbox = edge.bbox();
        if !self.tree.bounds().intersects(&bbox) {
            return false;
        }

        self.tree.insert(self.edges.len(), bbox);
        self.edges.push(edge);
        true
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Returns the number of indexed edges, counting each edge once.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns all edges whose bounding box intersects `area`.
    ///
    /// An edge straddling quadrant boundaries may be returned multiple times,
    /// see [SpatialIndex::query_distinct].
    pub fn query(&self, area: &Rect) -> Vec<&ProjectedEdge> {
        let mut items = Vec::new();
        self.tree.query(area, &mut items);
        items.into_iter().map(|i| &self.edges[i]).collect()
    }

    /// Like [SpatialIndex::query], but every edge id is returned at most once.
    pub fn query_distinct(&self, area: &Rect) -> Vec<&ProjectedEdge> {
        let mut seen = HashSet::new();
        self.query(area)
            .into_iter()
            .filter(|e| seen.insert(e.edge_id))
            .collect()
    }

    /// Finds the edges within `radius` of `point` and returns their endpoint
    /// closest to `point`.
    pub fn pick_node(&self, point: (f32, f32), radius: f32) -> Option<NodeId> {
        let dist = |p: (f32, f32)| (p.0 - point.0).hypot(p.1 - point.1);

        self.query(&Rect::around(point, radius))
            .into_iter()
            .flat_map(|e| [(e.from, e.endpoint_a), (e.to, e.endpoint_b)])
            .min_by(|(_, a), (_, b)| dist(*a).total_cmp(&dist(*b)))
            .map(|(id, _)| id)
    }
}

/// Returns copies of all edges intersecting the `view` rectangle.
///
/// Duplicates are preserved; deduplicate by [ProjectedEdge::edge_id]
/// if uniqueness matters.
pub fn query_visible(index: &SpatialIndex, view: Rect) -> Vec<ProjectedEdge> {
    index.query(&view).into_iter().copied().collect()
}
