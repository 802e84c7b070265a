// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::Rect;

/// Maximum depth of the tree. Nodes at this depth keep accepting items
/// past their capacity, which bounds subdivision of coincident geometry.
pub const MAX_DEPTH: u32 = 12;

#[derive(Debug, Clone)]
struct QuadNode {
    bounds: Rect,
    depth: u32,
    items: Vec<(usize, Rect)>,
    children: Option<[usize; 4]>,
}

impl QuadNode {
    fn new(bounds: Rect, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }
}

/// Bounded-capacity [quadtree](https://en.wikipedia.org/wiki/Quadtree) over
/// axis-aligned boxes.
///
/// Items are opaque indices (into an arena owned by the caller) together with
/// their bounding box. Tree nodes live in an arena as well, with the root at index 0,
/// and children are addressed by index.
///
/// A node holds up to `capacity` items. When full, it is divided (once) into four
/// equal quadrants and further items are pushed into every quadrant they intersect -
/// an item straddling a quadrant boundary is stored multiple times, and may be
/// returned multiple times by [Quadtree::query].
#[derive(Debug, Clone)]
pub struct Quadtree {
    capacity: usize,
    nodes: Vec<QuadNode>,
}

impl Quadtree {
    pub fn new(bounds: Rect, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            nodes: vec![QuadNode::new(bounds, 0)],
        }
    }

    /// Returns the region covered by the tree.
    pub fn bounds(&self) -> Rect {
        self.nodes[0].bounds
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of tree nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts an item with the provided bounding box.
    /// Items which don't intersect the tree's bounds are ignored.
    pub fn insert(&mut self, item: usize, bbox: Rect) {
        let mut stack = vec![0];

        while let Some(idx) = stack.pop() {
            let node = &mut self.nodes[idx];
            if !node.bounds.intersects(&bbox) {
                continue;
            }

            if node.items.len() < self.capacity || node.depth >= MAX_DEPTH {
                node.items.push((item, bbox));
                continue;
            }

            let children = match node.children {
                Some(children) => children,
                None => self.subdivide(idx),
            };
            stack.extend(children);
        }
    }

    fn subdivide(&mut self, idx: usize) -> [usize; 4] {
        let parent = &self.nodes[idx];
        let depth = parent.depth + 1;
        let quadrants = parent.bounds.quadrants();

        let first = self.nodes.len();
        let children = [first, first + 1, first + 2, first + 3];
        self.nodes
            .extend(quadrants.into_iter().map(|q| QuadNode::new(q, depth)));
        self.nodes[idx].children = Some(children);
        children
    }

    /// Appends all items whose bounding box intersects `area` to `results`.
    ///
    /// Items stored in multiple quadrants are appended multiple times.
    pub fn query(&self, area: &Rect, results: &mut Vec<usize>) {
        let mut stack = vec![0];

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bounds.intersects(area) {
                continue;
            }

            results.extend(
                node.items
                    .iter()
                    .filter(|(_, bbox)| bbox.intersects(area))
                    .map(|&(item, _)| item),
            );

            if let Some(children) = node.children {
                // Reversed, so that quadrants are visited in order
                stack.extend(children.into_iter().rev());
            }
        }
    }
}
