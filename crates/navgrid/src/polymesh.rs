//! Convex polygon mesh of a region
//!
//! Triangles from the triangulator are greedily merged into larger convex
//! polygons (Hertel-Mehlhorn), then the shared-edge neighbor graph is built.
//! Polygons reference the region's vertex buffer by index, so no position is
//! ever stored twice within a region.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use glam::Vec2;
use navgrid_common::{is_convex, polygon_area2, vertex_centroid, Aabb2};

use crate::context::{BakeStage, BuildContext};
use crate::triangulation::{edge_key, Triangulation};

/// Convex, counter-clockwise polygon over a shared vertex buffer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ConvexPolygon {
    /// Indices into the region vertex buffer
    pub indices: Vec<u32>,
    /// Neighbor across edge `i` (from vertex `i` to vertex `i + 1`), `None` on the boundary
    pub neighbors: Vec<Option<usize>>,
    pub centroid: Vec2,
    pub bounds: Aabb2,
}

impl ConvexPolygon {
    /// Creates a polygon, forcing counter-clockwise winding
    pub fn new(indices: Vec<u32>, vertices: &[Vec2]) -> Self {
        let n = indices.len();
        let mut poly = Self {
            indices,
            neighbors: vec![None; n],
            centroid: Vec2::ZERO,
            bounds: Aabb2::empty(),
        };
        poly.force_ccw(vertices);
        poly.update_cache(vertices);
        poly
    }

    pub fn vertex_count(&self) -> usize {
        self.indices.len()
    }

    /// Vertex positions in winding order
    pub fn points(&self, vertices: &[Vec2]) -> Vec<Vec2> {
        self.indices.iter().map(|&i| vertices[i as usize]).collect()
    }

    /// Vertex indices of edge `i`
    #[inline]
    pub fn edge(&self, i: usize) -> (u32, u32) {
        (self.indices[i], self.indices[(i + 1) % self.indices.len()])
    }

    pub fn is_ccw(&self, vertices: &[Vec2]) -> bool {
        polygon_area2(&self.points(vertices)) > 0.0
    }

    pub fn is_convex(&self, vertices: &[Vec2]) -> bool {
        is_convex(&self.points(vertices))
    }

    /// Reverses the winding if the polygon is clockwise
    pub fn force_ccw(&mut self, vertices: &[Vec2]) {
        if polygon_area2(&self.points(vertices)) < 0.0 {
            self.indices.reverse();
            self.neighbors.reverse();
            // Neighbor `i` belongs to edge (i, i+1); after reversing, edge k runs
            // between what were vertices n-1-k and n-2-k
            if !self.neighbors.is_empty() {
                self.neighbors.rotate_left(1);
            }
        }
    }

    /// Recomputes centroid and bounds
    pub fn update_cache(&mut self, vertices: &[Vec2]) {
        let points = self.points(vertices);
        self.centroid = vertex_centroid(&points);
        self.bounds = Aabb2::from_points(&points).unwrap_or_else(Aabb2::empty);
    }

    /// Whether the point lies inside or on the boundary
    pub fn contains_point(&self, vertices: &[Vec2], p: Vec2) -> bool {
        let n = self.indices.len();
        (0..n).all(|i| {
            let a = vertices[self.indices[i] as usize];
            let b = vertices[self.indices[(i + 1) % n] as usize];
            (b - a).perp_dot(p - a) >= -1e-5
        })
    }

    /// Edge slot leading to `neighbor`
    pub fn neighbor_slot(&self, neighbor: usize) -> Option<usize> {
        self.neighbors.iter().position(|&n| n == Some(neighbor))
    }
}

/// Convex polygons and the vertex buffer they share
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RegionMesh {
    pub vertices: Vec<Vec2>,
    pub polygons: Vec<ConvexPolygon>,
}

impl RegionMesh {
    /// One polygon per triangle
    pub fn from_triangulation(tri: &Triangulation) -> Self {
        let polygons = tri
            .triangles
            .iter()
            .map(|t| ConvexPolygon::new(t.to_vec(), &tri.vertices))
            .collect();
        Self {
            vertices: tri.vertices.clone(),
            polygons,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn polygon_points(&self, poly: usize) -> Vec<Vec2> {
        self.polygons[poly].points(&self.vertices)
    }

    /// Moves every vertex through `f` and refreshes the polygon caches
    pub fn transform(&mut self, f: impl Fn(Vec2) -> Vec2) {
        for v in &mut self.vertices {
            *v = f(*v);
        }
        for poly in &mut self.polygons {
            poly.force_ccw(&self.vertices);
            poly.update_cache(&self.vertices);
        }
    }

    /// Portal between two adjacent polygons as `(left, right)` seen when
    /// walking from `from` into `to`
    pub fn portal(&self, from: usize, to: usize) -> Option<(Vec2, Vec2)> {
        let poly = &self.polygons[from];
        if let Some(slot) = poly.neighbor_slot(to) {
            let (a, b) = poly.edge(slot);
            return Some((self.vertices[b as usize], self.vertices[a as usize]));
        }
        // Fall back to the neighbor's record, whose edge runs the other way
        let other = &self.polygons[to];
        let slot = other.neighbor_slot(from)?;
        let (a, b) = other.edge(slot);
        Some((self.vertices[a as usize], self.vertices[b as usize]))
    }

    /// Total polygon area
    pub fn area(&self) -> f32 {
        (0..self.polygons.len())
            .map(|i| polygon_area2(&self.polygon_points(i)) * 0.5)
            .sum()
    }

    /// Number of polygon groups reachable from each other through neighbor links
    pub fn component_count(&self) -> usize {
        let mut seen = vec![false; self.polygons.len()];
        let mut queue = VecDeque::new();
        let mut count = 0;

        for start in 0..self.polygons.len() {
            if seen[start] {
                continue;
            }
            count += 1;
            seen[start] = true;
            queue.push_back(start);
            while let Some(p) = queue.pop_front() {
                for &next in self.polygons[p].neighbors.iter().flatten() {
                    if !seen[next] {
                        seen[next] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        count
    }
}

/// Shared edge whose removal is pending, longest first
#[derive(Debug, Clone, Copy, PartialEq)]
struct MergeCandidate {
    length_sqr: f32,
    edge: (u32, u32),
}

impl Eq for MergeCandidate {}

impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties go to the smaller edge key
        self.length_sqr
            .total_cmp(&other.length_sqr)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Polygons holding each undirected edge, in ascending polygon order
fn edge_owners<'a>(rings: impl Iterator<Item = (usize, &'a [u32])>) -> HashMap<(u32, u32), Vec<usize>> {
    let mut owners: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (p, ring) in rings {
        let n = ring.len();
        for i in 0..n {
            owners
                .entry(edge_key(ring[i], ring[(i + 1) % n]))
                .or_default()
                .push(p);
        }
    }
    owners
}

fn edge_slot(ring: &[u32], edge: (u32, u32)) -> Option<usize> {
    let n = ring.len();
    (0..n).find(|&i| edge_key(ring[i], ring[(i + 1) % n]) == edge)
}

/// Merges face-adjacent polygons while the union stays convex.
///
/// Shared edges are visited longest first, so long diagonals disappear first.
/// Growing a polygon only widens its corners, so an edge that cannot be
/// removed now never becomes removable later. Returns the number of merges.
pub fn merge_convex_polygons(ctx: &mut BuildContext, mesh: &mut RegionMesh) -> usize {
    ctx.start_timer(BakeStage::Merge);

    let before = mesh.polygons.len();
    let mut rings: Vec<Option<Vec<u32>>> =
        mesh.polygons.iter().map(|p| Some(p.indices.clone())).collect();
    let mut owners = edge_owners(mesh.polygons.iter().map(|p| p.indices.as_slice()).enumerate());

    let vertices = &mesh.vertices;
    let mut heap: BinaryHeap<MergeCandidate> = owners
        .iter()
        .filter(|(_, polys)| polys.len() == 2 && polys[0] != polys[1])
        .map(|(&edge, _)| MergeCandidate {
            length_sqr: vertices[edge.0 as usize].distance_squared(vertices[edge.1 as usize]),
            edge,
        })
        .collect();

    let mut merges = 0;
    while let Some(candidate) = heap.pop() {
        let Some(&[p, q]) = owners.get(&candidate.edge).map(Vec::as_slice) else {
            continue;
        };
        let (pa, pb) = (p.min(q), p.max(q));
        if pa == pb {
            continue;
        }

        let merged = match (&rings[pa], &rings[pb]) {
            (Some(a), Some(b)) => match (edge_slot(a, candidate.edge), edge_slot(b, candidate.edge)) {
                (Some(ea), Some(eb)) => merge_rings(vertices, a, ea, b, eb),
                _ => None,
            },
            _ => None,
        };
        let Some(merged) = merged else {
            continue;
        };

        // Every other edge of the absorbed polygon now belongs to the merged one
        if let Some(absorbed) = rings[pb].take() {
            let n = absorbed.len();
            for i in 0..n {
                let key = edge_key(absorbed[i], absorbed[(i + 1) % n]);
                if let Some(polys) = owners.get_mut(&key) {
                    for owner in polys.iter_mut().filter(|o| **o == pb) {
                        *owner = pa;
                    }
                }
            }
        }
        owners.remove(&candidate.edge);
        rings[pa] = Some(merged);
        merges += 1;
    }

    mesh.polygons = rings
        .into_iter()
        .flatten()
        .map(|ring| ConvexPolygon::new(ring, &mesh.vertices))
        .collect();

    ctx.log_debug(format!(
        "Merged {} triangles into {} convex polygons",
        before,
        mesh.polygons.len()
    ));
    ctx.stop_timer(BakeStage::Merge);
    merges
}

/// Union of two rings sharing edge `ea` of `a` and edge `eb` of `b`, if convex
fn merge_rings(vertices: &[Vec2], a: &[u32], ea: usize, b: &[u32], eb: usize) -> Option<Vec<u32>> {
    let (na, nb) = (a.len(), b.len());
    // The shared edge must run in opposite directions
    if a[ea] != b[(eb + 1) % nb] || a[(ea + 1) % na] != b[eb] {
        return None;
    }

    let mut merged = Vec::with_capacity(na + nb - 2);
    for k in 0..na {
        merged.push(a[(ea + 1 + k) % na]);
    }
    for k in 2..nb {
        merged.push(b[(eb + k) % nb]);
    }

    let mut seen = merged.clone();
    seen.sort_unstable();
    seen.dedup();
    if seen.len() != merged.len() {
        return None;
    }

    let points: Vec<Vec2> = merged.iter().map(|&i| vertices[i as usize]).collect();
    (is_convex(&points) && polygon_area2(&points) > 0.0).then_some(merged)
}

/// Links every polygon edge to the first other polygon holding the same edge
/// in either direction
pub fn build_adjacency(ctx: &mut BuildContext, mesh: &mut RegionMesh) {
    ctx.start_timer(BakeStage::Adjacency);

    let owners = edge_owners(mesh.polygons.iter().map(|p| p.indices.as_slice()).enumerate());
    let mut links = 0;
    for (i, poly) in mesh.polygons.iter_mut().enumerate() {
        let n = poly.vertex_count();
        poly.neighbors = (0..n)
            .map(|e| {
                let (a, b) = poly.edge(e);
                owners
                    .get(&edge_key(a, b))
                    .and_then(|polys| polys.iter().copied().find(|&j| j != i))
            })
            .collect();
        links += poly.neighbors.iter().flatten().count();
    }

    ctx.log_debug(format!(
        "Built adjacency for {} polygons, {} linked edges",
        mesh.polygons.len(),
        links
    ));
    ctx.stop_timer(BakeStage::Adjacency);
}
