//! Ear-clipping triangulation of a region outline with holes
//!
//! Holes are first bridged into the outer ring, turning the region into a
//! single weakly simple polygon, which is then clipped ear by ear. Vertices are
//! stored once in a shared buffer and referenced by index.

use std::collections::{HashMap, HashSet};

use glam::Vec2;
use navgrid_common::{point_in_triangle, tri_area_2d, Error, Result};

use crate::context::{BakeStage, BuildContext};
use crate::contour::Polyline;

/// Signed doubled areas at or below this are treated as degenerate
const AREA_EPSILON: f32 = 1e-6;

/// Triangle soup over a deduplicated vertex buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triangulation {
    pub vertices: Vec<Vec2>,
    /// Counter-clockwise triangles
    pub triangles: Vec<[u32; 3]>,
    /// Outline and hole edges as `(min, max)` vertex pairs; these are never flipped
    pub constrained: HashSet<(u32, u32)>,
    /// Ears clipped with other ring vertices inside them; the triangles may overlap
    pub forced_ears: usize,
}

impl Triangulation {
    /// Whether the undirected edge lies on the outline or a hole
    pub fn is_constrained(&self, a: u32, b: u32) -> bool {
        self.constrained.contains(&edge_key(a, b))
    }
}

/// Normalized key of an undirected edge
#[inline]
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Vertex buffer that hands out one index per distinct position
#[derive(Default)]
struct VertexBuffer {
    vertices: Vec<Vec2>,
    lookup: HashMap<(u32, u32), u32>,
}

impl VertexBuffer {
    fn index_of(&mut self, p: Vec2) -> u32 {
        let key = (p.x.to_bits(), p.y.to_bits());
        *self.lookup.entry(key).or_insert_with(|| {
            self.vertices.push(p);
            (self.vertices.len() - 1) as u32
        })
    }

    fn ring(&mut self, line: &Polyline) -> Vec<u32> {
        let mut ring: Vec<u32> = line.points.iter().map(|&p| self.index_of(p)).collect();
        dedup_ring(&mut ring);
        ring
    }
}

/// Triangulates a counter-clockwise outline with clockwise holes
pub fn triangulate_region(
    ctx: &mut BuildContext,
    outer: &Polyline,
    holes: &[Polyline],
) -> Result<Triangulation> {
    ctx.start_timer(BakeStage::Triangulation);
    let result = triangulate(ctx, outer, holes);
    ctx.stop_timer(BakeStage::Triangulation);
    result
}

fn triangulate(ctx: &mut BuildContext, outer: &Polyline, holes: &[Polyline]) -> Result<Triangulation> {
    let mut buffer = VertexBuffer::default();
    let mut constrained = HashSet::new();

    let mut ring = buffer.ring(outer);
    if ring.len() < 3 {
        return Ok(Triangulation::default());
    }
    add_ring_edges(&ring, &mut constrained);

    let mut hole_rings: Vec<Vec<u32>> = holes
        .iter()
        .map(|h| buffer.ring(h))
        .filter(|r| r.len() >= 3)
        .collect();
    for hole in &hole_rings {
        add_ring_edges(hole, &mut constrained);
    }

    let verts = &buffer.vertices;
    // Rightmost holes first so earlier bridges never block later ones
    hole_rings.sort_by(|a, b| {
        let ax = max_x_position(verts, a).1;
        let bx = max_x_position(verts, b).1;
        bx.x.total_cmp(&ax.x).then(ax.y.total_cmp(&bx.y))
    });

    for hole in &hole_rings {
        if !bridge_hole(verts, &mut ring, hole) {
            return Err(Error::Triangulation(
                "could not connect a hole to its outline".to_string(),
            ));
        }
    }

    let (triangles, forced_ears) = ear_clip(ctx, verts, ring)?;
    let mut out = compact(buffer.vertices, triangles, constrained);
    out.forced_ears = forced_ears;
    Ok(out)
}

fn add_ring_edges(ring: &[u32], constrained: &mut HashSet<(u32, u32)>) {
    let n = ring.len();
    for i in 0..n {
        constrained.insert(edge_key(ring[i], ring[(i + 1) % n]));
    }
}

/// Removes consecutive repeated indices, including across the seam
fn dedup_ring(ring: &mut Vec<u32>) {
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
}

fn max_x_position(verts: &[Vec2], ring: &[u32]) -> (usize, Vec2) {
    let mut best = 0;
    for (i, &v) in ring.iter().enumerate() {
        let (p, b) = (verts[v as usize], verts[ring[best] as usize]);
        if p.x > b.x || (p.x == b.x && p.y < b.y) {
            best = i;
        }
    }
    (best, verts[ring[best] as usize])
}

/// Whether `h` lies inside the interior angle at ring position `i`
fn locally_inside(verts: &[Vec2], ring: &[u32], i: usize, h: Vec2) -> bool {
    let n = ring.len();
    let prev = verts[ring[(i + n - 1) % n] as usize];
    let p = verts[ring[i] as usize];
    let next = verts[ring[(i + 1) % n] as usize];
    if tri_area_2d(prev, p, next) >= 0.0 {
        tri_area_2d(prev, p, h) >= 0.0 && tri_area_2d(p, next, h) >= 0.0
    } else {
        tri_area_2d(prev, p, h) >= 0.0 || tri_area_2d(p, next, h) >= 0.0
    }
}

/// Splices a hole into the ring through a mutually visible vertex pair.
///
/// A ray is cast in +X from the hole's rightmost vertex; the nearest ring edge
/// it hits gives a candidate, which is replaced by any reflex ring vertex
/// inside the triangle spanned by the ray segment and the candidate.
fn bridge_hole(verts: &[Vec2], ring: &mut Vec<u32>, hole: &[u32]) -> bool {
    let (hole_start, h) = max_x_position(verts, hole);
    let n = ring.len();

    let mut qx = f32::INFINITY;
    let mut candidate = None;
    for i in 0..n {
        let a = verts[ring[i] as usize];
        let b = verts[ring[(i + 1) % n] as usize];
        if a.y == b.y || h.y < a.y.min(b.y) || h.y > a.y.max(b.y) {
            continue;
        }
        let x = a.x + (h.y - a.y) * (b.x - a.x) / (b.y - a.y);
        if x >= h.x && x < qx {
            qx = x;
            if x == h.x {
                if a == h {
                    candidate = Some(i);
                    break;
                }
                if b == h {
                    candidate = Some((i + 1) % n);
                    break;
                }
            }
            candidate = Some(if a.x > b.x { i } else { (i + 1) % n });
        }
    }

    let Some(mut m) = candidate else {
        return false;
    };

    let mp = verts[ring[m] as usize];
    if mp != h {
        let hit = Vec2::new(qx, h.y);
        let (t0, t1) = if h.y < mp.y { (h, hit) } else { (hit, h) };
        let mut tan_min = f32::INFINITY;
        let mut best_x = mp.x;

        for i in 0..n {
            let p = verts[ring[i] as usize];
            if i == m || p.x < h.x || p.x > mp.x || p.x == h.x {
                continue;
            }
            if !point_in_triangle(p, t0, mp, t1) {
                continue;
            }
            let tan = (h.y - p.y).abs() / (p.x - h.x);
            if locally_inside(verts, ring, i, h)
                && (tan < tan_min || (tan == tan_min && p.x < best_x))
            {
                m = i;
                tan_min = tan;
                best_x = p.x;
            }
        }
    }

    let mut spliced = Vec::with_capacity(ring.len() + hole.len() + 2);
    spliced.extend_from_slice(&ring[..=m]);
    spliced.extend_from_slice(&hole[hole_start..]);
    spliced.extend_from_slice(&hole[..hole_start]);
    spliced.push(hole[hole_start]);
    spliced.extend_from_slice(&ring[m..]);
    dedup_ring(&mut spliced);
    *ring = spliced;
    true
}

fn neighbors(n: usize, i: usize) -> (usize, usize) {
    ((i + n - 1) % n, (i + 1) % n)
}

/// Clips ears until three vertices remain.
///
/// Zero-area corners are never clipped as ears. Spikes that fold straight back
/// are dropped at once; straight corners wait until a neighbor is clipped and
/// are only dropped when nothing else can be clipped.
fn ear_clip(
    ctx: &mut BuildContext,
    verts: &[Vec2],
    mut ring: Vec<u32>,
) -> Result<(Vec<[u32; 3]>, usize)> {
    let pos = |v: u32| verts[v as usize];
    let area_at = |ring: &[u32], i: usize| {
        let (p, q) = neighbors(ring.len(), i);
        tri_area_2d(pos(ring[p]), pos(ring[i]), pos(ring[q]))
    };
    let mut triangles = Vec::with_capacity(ring.len());
    let mut forced = 0;

    while ring.len() > 3 {
        let n = ring.len();

        if let Some(i) = (0..n).find(|&i| {
            let (p, q) = neighbors(n, i);
            ring[p] == ring[q]
        }) {
            ring.remove(i);
            dedup_ring(&mut ring);
            continue;
        }

        let i = match (0..n).find(|&i| is_ear(verts, &ring, i)) {
            Some(i) => i,
            None => {
                if let Some(i) = (0..n).find(|&i| area_at(&ring, i).abs() <= AREA_EPSILON) {
                    ring.remove(i);
                    dedup_ring(&mut ring);
                    continue;
                }
                forced += 1;
                (0..n)
                    .map(|i| (i, area_at(&ring, i)))
                    .filter(|&(_, area)| area > AREA_EPSILON)
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(i, _)| i)
                    .ok_or_else(|| {
                        Error::Triangulation(format!(
                            "no convex vertex left among {} ring vertices",
                            n
                        ))
                    })?
            }
        };

        let (p, q) = neighbors(n, i);
        triangles.push([ring[p], ring[i], ring[q]]);
        ring.remove(i);
        dedup_ring(&mut ring);
    }

    if ring.len() == 3 && area_at(&ring, 1) > AREA_EPSILON {
        triangles.push([ring[0], ring[1], ring[2]]);
    }

    if forced > 0 {
        ctx.log_warning_with_category(
            format!("Ear clipping forced {} non-empty ears", forced),
            "triangulation",
        );
    }

    Ok((triangles, forced))
}

fn is_ear(verts: &[Vec2], ring: &[u32], i: usize) -> bool {
    let n = ring.len();
    let (p, q) = neighbors(n, i);
    let (ia, ib, ic) = (ring[p], ring[i], ring[q]);
    let (a, b, c) = (verts[ia as usize], verts[ib as usize], verts[ic as usize]);

    if tri_area_2d(a, b, c) <= AREA_EPSILON {
        return false;
    }

    ring.iter()
        .filter(|&&v| v != ia && v != ib && v != ic)
        .all(|&v| !point_in_triangle(verts[v as usize], a, b, c))
}

/// Drops vertices no triangle uses and renumbers the rest
fn compact(
    vertices: Vec<Vec2>,
    triangles: Vec<[u32; 3]>,
    constrained: HashSet<(u32, u32)>,
) -> Triangulation {
    let mut remap = vec![u32::MAX; vertices.len()];
    let mut out = Triangulation::default();

    for tri in &triangles {
        for &v in tri {
            if remap[v as usize] == u32::MAX {
                remap[v as usize] = out.vertices.len() as u32;
                out.vertices.push(vertices[v as usize]);
            }
        }
    }

    out.triangles = triangles
        .iter()
        .map(|t| [remap[t[0] as usize], remap[t[1] as usize], remap[t[2] as usize]])
        .collect();
    out.constrained = constrained
        .into_iter()
        .filter_map(|(a, b)| {
            let (ra, rb) = (remap[a as usize], remap[b as usize]);
            (ra != u32::MAX && rb != u32::MAX).then(|| edge_key(ra, rb))
        })
        .collect();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use navgrid_common::polygon_area2;

    fn line(points: &[(f32, f32)]) -> Polyline {
        Polyline::closed(points.iter().map(|&(x, y)| Vec2::new(x, y)).collect())
    }

    fn total_area(t: &Triangulation) -> f32 {
        t.triangles
            .iter()
            .map(|tri| {
                let pts: Vec<Vec2> = tri.iter().map(|&v| t.vertices[v as usize]).collect();
                polygon_area2(&pts) * 0.5
            })
            .sum()
    }

    fn assert_all_ccw(t: &Triangulation) {
        for tri in &t.triangles {
            let [a, b, c] = tri.map(|v| t.vertices[v as usize]);
            assert!(tri_area_2d(a, b, c) > 0.0);
        }
    }

    #[test]
    fn test_square_gives_two_triangles() {
        let mut ctx = BuildContext::new();
        let square = line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let t = triangulate_region(&mut ctx, &square, &[]).unwrap();
        assert_eq!(t.vertices.len(), 4);
        assert_eq!(t.triangles.len(), 2);
        assert_eq!(total_area(&t), 100.0);
        assert_eq!(t.constrained.len(), 4);
        assert_all_ccw(&t);
    }

    #[test]
    fn test_concave_outline() {
        let mut ctx = BuildContext::new();
        let l_shape = line(&[
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 1.0),
            (2.0, 1.0),
            (2.0, 3.0),
            (0.0, 3.0),
        ]);
        let t = triangulate_region(&mut ctx, &l_shape, &[]).unwrap();
        assert_eq!(t.triangles.len(), 4);
        assert_eq!(total_area(&t), 8.0);
        assert_all_ccw(&t);
    }

    #[test]
    fn test_collinear_vertices_never_form_flat_triangles() {
        let mut ctx = BuildContext::new();
        let square = line(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
        ]);
        let t = triangulate_region(&mut ctx, &square, &[]).unwrap();
        assert_eq!(t.triangles.len(), 3);
        assert_eq!(t.vertices.len(), 5);
        assert_eq!(total_area(&t), 4.0);
        assert_all_ccw(&t);
    }

    #[test]
    fn test_hole_is_bridged() {
        let mut ctx = BuildContext::new();
        let outer = line(&[(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0)]);
        let hole = line(&[(2.0, 2.0), (2.0, 4.0), (4.0, 4.0), (4.0, 2.0)]);
        let t = triangulate_region(&mut ctx, &outer, &[hole]).unwrap();

        assert_eq!(t.vertices.len(), 8);
        assert!(t.triangles.len() <= 8);
        assert!((total_area(&t) - 32.0).abs() < 1e-4);
        assert_eq!(t.constrained.len(), 8);
        assert_eq!(t.forced_ears, 0);
        assert_all_ccw(&t);
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_two_holes() {
        let mut ctx = BuildContext::new();
        let outer = line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 4.0), (0.0, 4.0)]);
        let left = line(&[(1.0, 1.0), (1.0, 3.0), (3.0, 3.0), (3.0, 1.0)]);
        let right = line(&[(6.0, 1.0), (6.0, 3.0), (8.0, 3.0), (8.0, 1.0)]);
        let t = triangulate_region(&mut ctx, &outer, &[left, right]).unwrap();

        assert!(t.triangles.len() <= 14);
        assert!((total_area(&t) - 32.0).abs() < 1e-4);
        assert_all_ccw(&t);
    }

    #[test]
    fn test_degenerate_outline_is_empty() {
        let mut ctx = BuildContext::new();
        let sliver = line(&[(0.0, 0.0), (1.0, 0.0)]);
        let t = triangulate_region(&mut ctx, &sliver, &[]).unwrap();
        assert!(t.triangles.is_empty());
    }
}
