//! Ray walking across the polygon graph of a region

use glam::Vec2;
use navgrid::RegionMesh;

const EPS: f32 = 1e-6;

/// Result of walking a ray across the mesh
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastHit {
    /// The ray left the mesh before reaching its full length
    pub blocked: bool,
    /// Where the ray stopped: the boundary hit, or the ray end when not blocked
    pub point: Vec2,
    /// Polygon containing `point`
    pub polygon: usize,
    /// Fraction of the ray length travelled, in `[0, 1]`
    pub t: f32,
    /// Boundary edge of `polygon` that stopped the ray
    pub edge: Option<usize>,
    /// Polygons crossed, starting with the origin polygon
    pub visited: Vec<usize>,
}

/// Clips segment `p0 -> p1` against a counter-clockwise convex polygon.
///
/// Returns `(tmin, tmax, entry_edge, exit_edge)` of the part of the segment
/// inside the polygon, or `None` when it misses.
pub fn intersect_segment_poly(
    p0: Vec2,
    p1: Vec2,
    points: &[Vec2],
) -> Option<(f32, f32, Option<usize>, Option<usize>)> {
    let dir = p1 - p0;
    let n = points.len();
    let mut tmin = 0.0f32;
    let mut tmax = 1.0f32;
    let mut seg_min = None;
    let mut seg_max = None;

    for i in 0..n {
        let a = points[i];
        let edge = points[(i + 1) % n] - a;
        let num = edge.perp_dot(p0 - a);
        let den = edge.perp_dot(dir);

        if den.abs() < EPS {
            // Parallel to the edge: outside means no overlap at all
            if num < 0.0 {
                return None;
            }
            continue;
        }

        let t = -num / den;
        if den < 0.0 {
            // Leaving through this edge
            if t < tmax {
                tmax = t;
                seg_max = Some(i);
            }
        } else if t > tmin {
            tmin = t;
            seg_min = Some(i);
        }

        if tmin > tmax {
            return None;
        }
    }

    Some((tmin, tmax, seg_min, seg_max))
}

/// Walks the segment `origin -> end` from `start_polygon` through shared edges
/// until it ends inside a polygon or leaves through a boundary edge
pub fn raycast_mesh(mesh: &RegionMesh, start_polygon: usize, origin: Vec2, end: Vec2) -> RaycastHit {
    let mut current = start_polygon;
    let mut previous: Option<usize> = None;
    let mut visited = vec![current];
    let mut t_reached = 0.0f32;

    let stop = |polygon, t: f32, edge, visited| RaycastHit {
        blocked: true,
        point: origin.lerp(end, t),
        polygon,
        t,
        edge,
        visited,
    };

    for _ in 0..mesh.polygons.len().max(1) * 2 {
        let points = mesh.polygon_points(current);
        let Some((_, tmax, _, exit)) = intersect_segment_poly(origin, end, &points) else {
            return stop(current, t_reached, None, visited);
        };

        let edge = match exit {
            Some(edge) if tmax < 1.0 - EPS => edge,
            _ => {
                return RaycastHit {
                    blocked: false,
                    point: end,
                    polygon: current,
                    t: 1.0,
                    edge: None,
                    visited,
                }
            }
        };
        t_reached = tmax.max(t_reached);

        match mesh.polygons[current].neighbors[edge] {
            Some(next) if Some(next) != previous => {
                previous = Some(current);
                current = next;
                visited.push(next);
            }
            _ => return stop(current, t_reached, Some(edge), visited),
        }
    }

    stop(current, t_reached, None, visited)
}
