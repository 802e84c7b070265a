// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use crate::{great_circle_distance, AdjacencyEntry, EdgeId, Graph, Node, NodeId};

use super::{Route, SearchError};

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: NodeId,
    cost: f64,
    score: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.score.eq(&other.score)
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.score.total_cmp(&self.score)
    }
}

/// How a node was reached: the previous node, the weight of the edge used and its id.
#[derive(Debug, Clone, Copy)]
struct Predecessor {
    parent: NodeId,
    weight: f64,
    edge_id: EdgeId,
}

/// Estimates the remaining cost from a node to the target.
/// Must never overestimate for the search to return shortest paths.
trait Heuristic {
    fn estimate(&self, at: Node) -> f64;
}

/// Plain Dijkstra - no estimate at all.
struct Zero;

impl Heuristic for Zero {
    #[inline]
    fn estimate(&self, _: Node) -> f64 {
        0.0
    }
}

/// Crow-flies distance to the target.
struct GreatCircle(Node);

impl Heuristic for GreatCircle {
    #[inline]
    fn estimate(&self, at: Node) -> f64 {
        great_circle_distance(at, self.0)
    }
}

fn reconstruct_path(
    predecessors: &HashMap<NodeId, Predecessor>,
    source: NodeId,
    target: NodeId,
) -> Result<Route, SearchError> {
    let mut route = Route::default();
    let mut at = target;

    while at != source {
        let p = predecessors
            .get(&at)
            .ok_or(SearchError::InvalidReference(at))?;
        route.edges.push(p.edge_id);
        route.distance += p.weight;
        at = p.parent;
    }

    Ok(route)
}

fn search<H: Heuristic>(
    g: &Graph,
    source: NodeId,
    target: NodeId,
    heuristic: H,
) -> Result<Route, SearchError> {
    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut predecessors: HashMap<NodeId, Predecessor> = HashMap::default();
    let mut best: HashMap<NodeId, f64> = HashMap::default();

    let source_node = g
        .get_node(source)
        .map_err(|_| SearchError::InvalidReference(source))?;

    queue.push(QueueItem {
        at: source,
        cost: 0.0,
        score: heuristic.estimate(source_node),
    });
    best.insert(source, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == target {
            return reconstruct_path(&predecessors, source, target);
        }

        // Contrary to the textbook definition, we might keep multiple items in the queue
        // for the same node. Stale ones are skipped here instead of being removed on update.
        if item.cost > best.get(&item.at).copied().unwrap_or(f64::INFINITY) {
            continue;
        }

        for &AdjacencyEntry {
            neighbor,
            weight,
            edge_id,
        } in g.get_neighbors(item.at)?
        {
            let neighbor_cost = item.cost + weight;
            if best.get(&neighbor).is_some_and(|&known| neighbor_cost >= known) {
                continue;
            }

            let neighbor_node = g.get_node(neighbor)?;
            best.insert(neighbor, neighbor_cost);
            predecessors.insert(
                neighbor,
                Predecessor {
                    parent: item.at,
                    weight,
                    edge_id,
                },
            );
            queue.push(QueueItem {
                at: neighbor,
                cost: neighbor_cost,
                score: neighbor_cost + heuristic.estimate(neighbor_node),
            });
        }
    }

    Ok(Route::default())
}

fn check_target(g: &Graph, target: NodeId) -> Result<Node, SearchError> {
    g.get_node(target)
        .map_err(|_| SearchError::InvalidReference(target))
}

/// Uses [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm)
/// to find the shortest route between two nodes in the provided graph.
///
/// The returned [Route::edges] are in **target to source** order.
/// If there is no route between the two nodes, or if `source == target`,
/// the returned route has no edges and a distance of zero.
///
/// [Graph::create_adjacency] must have been called before.
pub fn dijkstra(g: &Graph, source: NodeId, target: NodeId) -> Result<Route, SearchError> {
    check_target(g, target)?;
    search(g, source, target, Zero)
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// with the great-circle distance as the heuristic to find the shortest route
/// between two nodes in the provided graph.
///
/// The result is the same as the one of [dijkstra] (up to floating-point error,
/// and to the choice between equally short routes), but fewer nodes are expanded.
///
/// The returned [Route::edges] are in **target to source** order.
/// If there is no route between the two nodes, or if `source == target`,
/// the returned route has no edges and a distance of zero.
///
/// [Graph::create_adjacency] must have been called before.
pub fn astar(g: &Graph, source: NodeId, target: NodeId) -> Result<Route, SearchError> {
    let target_node = check_target(g, target)?;
    search(g, source, target, GreatCircle(target_node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Edge;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    const A: NodeId = 1;
    const B: NodeId = 2;
    const C: NodeId = 3;
    const D: NodeId = 4;

    fn abc() -> Graph {
        let mut g = Graph::new();
        g.add_node(A, Node { lat: 0.0, lon: 0.0 });
        g.add_node(B, Node { lat: 0.0, lon: 1.0 });
        g.add_node(C, Node { lat: 1.0, lon: 1.0 });
        g.add_node(D, Node { lat: 5.0, lon: 5.0 });
        g.add_edge(1, Edge { from: A, to: B });
        g.add_edge(2, Edge { from: B, to: C });
        g.create_adjacency();
        g
    }

    fn distance(g: &Graph, a: NodeId, b: NodeId) -> f64 {
        great_circle_distance(g.get_node(a).unwrap(), g.get_node(b).unwrap())
    }

    //   0   1   2   3
    // 0 1 ─ 2 ─ 3 ─ 4
    //   │           │
    // 1 5 ───────── 6
    fn ladder() -> Graph {
        let mut g = Graph::new();
        g.add_node(1, Node { lat: 0.0, lon: 0.0 });
        g.add_node(2, Node { lat: 0.0, lon: 0.01 });
        g.add_node(3, Node { lat: 0.0, lon: 0.02 });
        g.add_node(4, Node { lat: 0.0, lon: 0.03 });
        g.add_node(5, Node { lat: -0.01, lon: 0.0 });
        g.add_node(6, Node { lat: -0.01, lon: 0.03 });
        g.add_edge(10, Edge { from: 1, to: 2 });
        g.add_edge(11, Edge { from: 2, to: 3 });
        g.add_edge(12, Edge { from: 3, to: 4 });
        g.add_edge(13, Edge { from: 1, to: 5 });
        g.add_edge(14, Edge { from: 5, to: 6 });
        g.add_edge(15, Edge { from: 6, to: 4 });
        g.create_adjacency();
        g
    }

    #[test]
    fn path_is_in_target_to_source_order() {
        let g = abc();
        let expected = distance(&g, A, B) + distance(&g, B, C);

        let route = dijkstra(&g, A, C).unwrap();
        assert_eq!(route.edges, vec![2, 1]);
        assert_almost_eq!(route.distance, expected);
        assert_eq!(route.edges_from_source().collect::<Vec<_>>(), vec![1, 2]);

        let route = astar(&g, A, C).unwrap();
        assert_eq!(route.edges, vec![2, 1]);
        assert_almost_eq!(route.distance, expected);
    }

    #[test]
    fn edges_are_traversable_backwards() {
        let g = abc();
        let route = astar(&g, C, A).unwrap();
        assert_eq!(route.edges, vec![1, 2]);
    }

    #[test]
    fn same_source_and_target() {
        let g = abc();
        assert_eq!(dijkstra(&g, A, A).unwrap(), Route::default());
        assert_eq!(astar(&g, A, A).unwrap(), Route::default());
    }

    #[test]
    fn unreachable() {
        let g = abc();
        let route = dijkstra(&g, A, D).unwrap();
        assert!(route.edges.is_empty());
        assert_eq!(route.distance, 0.0);

        let route = astar(&g, D, C).unwrap();
        assert!(route.edges.is_empty());
    }

    #[test]
    fn invalid_reference() {
        let g = abc();
        assert_eq!(dijkstra(&g, A, 99), Err(SearchError::InvalidReference(99)));
        assert_eq!(astar(&g, 99, A), Err(SearchError::InvalidReference(99)));
    }

    #[test]
    fn adjacency_required() {
        let mut g = Graph::new();
        g.add_node(A, Node { lat: 0.0, lon: 0.0 });
        g.add_node(B, Node { lat: 0.0, lon: 1.0 });
        g.add_edge(1, Edge { from: A, to: B });
        assert_eq!(
            astar(&g, A, B),
            Err(SearchError::Graph(crate::GraphError::NoAdjacency(A)))
        );
    }

    #[test]
    fn shortest_of_two_routes() {
        let g = ladder();

        let route = dijkstra(&g, 1, 4).unwrap();
        assert_eq!(route.edges, vec![12, 11, 10]);
        assert_almost_eq!(route.distance, distance(&g, 1, 4));

        let route = astar(&g, 1, 4).unwrap();
        assert_eq!(route.edges, vec![12, 11, 10]);

        let route = astar(&g, 5, 3).unwrap();
        assert_eq!(route.edges, vec![11, 10, 13]);

        let route = dijkstra(&g, 2, 6).unwrap();
        assert_eq!(route.edges, vec![15, 12, 11]);
    }

    #[test]
    fn dijkstra_and_astar_agree() {
        let g = ladder();
        for (source, _) in g.nodes() {
            for (target, _) in g.nodes() {
                let d = dijkstra(&g, source, target).unwrap();
                let a = astar(&g, source, target).unwrap();
                assert_almost_eq!(d.distance, a.distance);
                assert_eq!(d.edges.is_empty(), a.edges.is_empty());
            }
        }
    }

    #[test]
    fn concurrent_queries() {
        let g = ladder();
        let routes: Vec<Route> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| astar(&g, 1, 6).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for r in &routes {
            assert_eq!(r, &routes[0]);
        }
    }
}
