//! Best-first search over the polygon adjacency graph of one region

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;
use navgrid::{PathMode, RegionMesh};

#[derive(Debug, Clone, Copy)]
struct SearchNode {
    /// Cost from the start
    cost: f32,
    /// Point the cost is measured from
    pos: Vec2,
    parent: Option<usize>,
    closed: bool,
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    total: f32,
    polygon: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // Min-heap on total cost; ties resolved towards the lower polygon index
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .total
            .total_cmp(&self.total)
            .then(other.polygon.cmp(&self.polygon))
    }
}

/// Finds a polygon corridor from `start` to `goal`.
///
/// With [`PathMode::PolygonCenter`] edges cost the distance between polygon
/// centroids and the heuristic is the centroid distance to the goal centroid.
/// With [`PathMode::MidEdge`] the search point moves from `start_pos` through
/// shared-edge midpoints, accumulating the distance between consecutive
/// points, and the heuristic is the distance from the midpoint to `goal_pos`.
///
/// Returns `None` when the goal is unreachable.
pub fn find_polygon_path(
    mesh: &RegionMesh,
    start: usize,
    start_pos: Vec2,
    goal: usize,
    goal_pos: Vec2,
    mode: PathMode,
) -> Option<Vec<usize>> {
    let count = mesh.polygons.len();
    if start >= count || goal >= count {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let goal_centroid = mesh.polygons[goal].centroid;
    let initial_pos = match mode {
        PathMode::PolygonCenter => mesh.polygons[start].centroid,
        PathMode::MidEdge => start_pos,
    };

    let mut nodes: Vec<Option<SearchNode>> = vec![None; count];
    nodes[start] = Some(SearchNode {
        cost: 0.0,
        pos: initial_pos,
        parent: None,
        closed: false,
    });

    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        total: 0.0,
        polygon: start,
    });

    while let Some(OpenEntry { polygon: current, .. }) = open.pop() {
        let Some(node) = nodes[current] else {
            continue;
        };
        if node.closed {
            continue;
        }
        if let Some(n) = nodes[current].as_mut() {
            n.closed = true;
        }

        if current == goal {
            return Some(reconstruct(&nodes, goal));
        }

        let poly = &mesh.polygons[current];
        for (slot, neighbor) in poly.neighbors.iter().enumerate() {
            let Some(next) = *neighbor else {
                continue;
            };
            if nodes[next].is_some_and(|n| n.closed) {
                continue;
            }

            let (next_pos, heuristic) = match mode {
                PathMode::PolygonCenter => {
                    let c = mesh.polygons[next].centroid;
                    (c, c.distance(goal_centroid))
                }
                PathMode::MidEdge => {
                    let (a, b) = poly.edge(slot);
                    let mid = (mesh.vertices[a as usize] + mesh.vertices[b as usize]) * 0.5;
                    (mid, mid.distance(goal_pos))
                }
            };
            let cost = node.cost + node.pos.distance(next_pos);

            let improved = nodes[next].map_or(true, |n| cost < n.cost);
            if improved {
                nodes[next] = Some(SearchNode {
                    cost,
                    pos: next_pos,
                    parent: Some(current),
                    closed: false,
                });
                open.push(OpenEntry {
                    total: cost + heuristic,
                    polygon: next,
                });
            }
        }
    }

    None
}

fn reconstruct(nodes: &[Option<SearchNode>], goal: usize) -> Vec<usize> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(parent) = nodes[current].and_then(|n| n.parent) {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use navgrid::{build_adjacency, BuildContext, ConvexPolygon};

    /// A row of `n` unit squares
    fn strip(n: usize) -> RegionMesh {
        let mut vertices = Vec::new();
        for i in 0..=n {
            vertices.push(Vec2::new(i as f32, 0.0));
            vertices.push(Vec2::new(i as f32, 1.0));
        }
        let polygons = (0..n as u32)
            .map(|i| ConvexPolygon::new(vec![2 * i, 2 * i + 2, 2 * i + 3, 2 * i + 1], &vertices))
            .collect();
        let mut mesh = RegionMesh { vertices, polygons };
        build_adjacency(&mut BuildContext::new(), &mut mesh);
        mesh
    }

    #[test]
    fn test_corridor_along_strip() {
        let mesh = strip(5);
        for mode in [PathMode::PolygonCenter, PathMode::MidEdge] {
            let path = find_polygon_path(
                &mesh,
                0,
                Vec2::new(0.5, 0.5),
                4,
                Vec2::new(4.5, 0.5),
                mode,
            )
            .unwrap();
            assert_eq!(path, vec![0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_same_polygon() {
        let mesh = strip(2);
        let path = find_polygon_path(
            &mesh,
            1,
            Vec2::new(1.2, 0.5),
            1,
            Vec2::new(1.8, 0.5),
            PathMode::PolygonCenter,
        );
        assert_eq!(path, Some(vec![1]));
    }

    #[test]
    fn test_disconnected_goal() {
        let mut mesh = strip(3);
        // Cut the link between polygons 1 and 2
        mesh.polygons[1].neighbors[1] = None;
        mesh.polygons[2].neighbors[3] = None;
        let path = find_polygon_path(
            &mesh,
            0,
            Vec2::new(0.5, 0.5),
            2,
            Vec2::new(2.5, 0.5),
            PathMode::MidEdge,
        );
        assert!(path.is_none());
    }

    #[test]
    fn test_out_of_range_polygon() {
        let mesh = strip(1);
        assert!(find_polygon_path(&mesh, 0, Vec2::ZERO, 3, Vec2::ZERO, PathMode::PolygonCenter).is_none());
    }
}
