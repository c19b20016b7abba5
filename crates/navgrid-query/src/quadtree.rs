//! Fixed-depth quadtree over the convex polygons of one region
//!
//! Polygons are stored in every leaf whose box they overlap, decided with a
//! separating-axis test. Nodes live in a flat arena and refer to their
//! children by index.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;
use navgrid::RegionMesh;
use navgrid_common::{closest_point_on_segment, Aabb2};

/// Result of a nearest-polygon query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPolygon {
    /// Polygon index within the region
    pub polygon: usize,
    /// Distance to the polygon boundary, positive inside and negative outside
    pub signed_distance: f32,
    /// The query point itself when inside, otherwise the closest boundary point
    pub point: Vec2,
}

#[derive(Debug, Clone)]
struct QuadNode {
    bounds: Aabb2,
    /// Index of the first of four consecutive children, if split
    first_child: Option<usize>,
    polygons: Vec<usize>,
}

/// Quadtree spatial index
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    depth: u32,
}

impl QuadTree {
    /// Builds the tree to `depth` levels below the root
    pub fn build(mesh: &RegionMesh, depth: u32) -> Self {
        let mut bounds = Aabb2::empty();
        for poly in &mesh.polygons {
            bounds.expand(&poly.bounds);
        }
        if !bounds.is_valid() {
            bounds = Aabb2::new(Vec2::ZERO, Vec2::ZERO);
        }

        let mut tree = Self {
            nodes: vec![QuadNode {
                bounds,
                first_child: None,
                polygons: Vec::new(),
            }],
            depth,
        };
        tree.subdivide(0, 0);

        for (index, poly) in mesh.polygons.iter().enumerate() {
            let points = poly.points(&mesh.vertices);
            tree.insert(0, 0, index, &poly.bounds, &points);
        }
        tree
    }

    fn subdivide(&mut self, node: usize, level: u32) {
        if level >= self.depth {
            return;
        }
        let first = self.nodes.len();
        for quadrant in self.nodes[node].bounds.quadrants() {
            self.nodes.push(QuadNode {
                bounds: quadrant,
                first_child: None,
                polygons: Vec::new(),
            });
        }
        self.nodes[node].first_child = Some(first);
        for child in first..first + 4 {
            self.subdivide(child, level + 1);
        }
    }

    fn insert(&mut self, node: usize, level: u32, index: usize, bounds: &Aabb2, points: &[Vec2]) {
        let node_bounds = self.nodes[node].bounds;
        if !node_bounds.overlaps(bounds) || !aabb_overlaps_convex(&node_bounds, points) {
            return;
        }
        match self.nodes[node].first_child {
            Some(first) => {
                for child in first..first + 4 {
                    self.insert(child, level + 1, index, bounds, points);
                }
            }
            None => self.nodes[node].polygons.push(index),
        }
    }

    /// Number of nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Polygons stored in the leaf containing `p`, if `p` is inside the root
    pub fn leaf_polygons(&self, p: Vec2) -> Option<&[usize]> {
        let mut node = 0;
        if !self.nodes[node].bounds.contains(p) {
            return None;
        }
        while let Some(first) = self.nodes[node].first_child {
            node = (first..first + 4)
                .find(|&c| self.nodes[c].bounds.contains(p))
                .unwrap_or(first);
        }
        Some(&self.nodes[node].polygons)
    }

    /// Finds the polygon containing `p`, or failing that the polygon whose
    /// boundary is closest to it
    pub fn nearest(&self, mesh: &RegionMesh, p: Vec2) -> Option<NearestPolygon> {
        if mesh.polygons.is_empty() {
            return None;
        }

        if let Some(candidates) = self.leaf_polygons(p) {
            let inside = candidates
                .iter()
                .map(|&i| evaluate(mesh, i, p))
                .filter(|r| r.signed_distance >= 0.0)
                .max_by(better);
            if inside.is_some() {
                return inside;
            }
        }

        let mut visited = vec![false; mesh.polygons.len()];
        let mut best: Option<NearestPolygon> = None;
        let mut heap = BinaryHeap::new();
        heap.push(NodeEntry {
            distance: self.nodes[0].bounds.distance_to_point(p),
            node: 0,
        });

        while let Some(NodeEntry { distance, node }) = heap.pop() {
            if let Some(b) = &best {
                if distance > -b.signed_distance {
                    break;
                }
            }

            let current = &self.nodes[node];
            match current.first_child {
                Some(first) => {
                    for child in first..first + 4 {
                        heap.push(NodeEntry {
                            distance: self.nodes[child].bounds.distance_to_point(p),
                            node: child,
                        });
                    }
                }
                None => {
                    for &i in &current.polygons {
                        if std::mem::replace(&mut visited[i], true) {
                            continue;
                        }
                        let candidate = evaluate(mesh, i, p);
                        if best.map_or(true, |b| better(&candidate, &b) == Ordering::Greater) {
                            best = Some(candidate);
                        }
                    }
                }
            }
        }

        best
    }
}

/// Larger signed distance wins, then lower polygon index
fn better(a: &NearestPolygon, b: &NearestPolygon) -> Ordering {
    a.signed_distance
        .total_cmp(&b.signed_distance)
        .then(b.polygon.cmp(&a.polygon))
}

/// Signed distance of `p` to a polygon and the snapped point
pub fn evaluate(mesh: &RegionMesh, polygon: usize, p: Vec2) -> NearestPolygon {
    let poly = &mesh.polygons[polygon];
    let n = poly.vertex_count();
    let mut inside = true;
    let mut min_dist = f32::MAX;
    let mut closest = p;

    for i in 0..n {
        let (ia, ib) = poly.edge(i);
        let a = mesh.vertices[ia as usize];
        let b = mesh.vertices[ib as usize];
        if (b - a).perp_dot(p - a) < 0.0 {
            inside = false;
        }
        let (c, _) = closest_point_on_segment(p, a, b);
        let d = c.distance(p);
        if d < min_dist {
            min_dist = d;
            closest = c;
        }
    }

    if inside {
        NearestPolygon {
            polygon,
            signed_distance: min_dist,
            point: p,
        }
    } else {
        NearestPolygon {
            polygon,
            signed_distance: -min_dist,
            point: closest,
        }
    }
}

/// Separating-axis test between a box and a convex polygon; touching counts
pub fn aabb_overlaps_convex(aabb: &Aabb2, points: &[Vec2]) -> bool {
    if points.is_empty() {
        return false;
    }
    let corners = aabb.corners();
    let n = points.len();

    let mut axes: Vec<Vec2> = vec![Vec2::X, Vec2::Y];
    for i in 0..n {
        let edge = points[(i + 1) % n] - points[i];
        if edge.length_squared() > 0.0 {
            axes.push(edge.perp());
        }
    }

    axes.iter().all(|&axis| {
        let (amin, amax) = project(&corners, axis);
        let (pmin, pmax) = project(points, axis);
        amin <= pmax && pmin <= amax
    })
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

#[derive(Debug, Clone, Copy)]
struct NodeEntry {
    distance: f32,
    node: usize,
}

impl PartialEq for NodeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NodeEntry {}

impl PartialOrd for NodeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeEntry {
    // Reversed so the heap pops the closest node first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then(other.node.cmp(&self.node))
    }
}
