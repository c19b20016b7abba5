//! Contour simplification
//!
//! Operates on closed polylines in grid coordinates, where one unit is one cell.

use glam::Vec2;
use navgrid_common::{
    between, dist_point_line, dist_point_segment_sqr, intersect, point_in_polygon, Aabb2,
};

use crate::config::SimplificationMode;
use crate::context::{BakeStage, BuildContext};
use crate::contour::{Polyline, RegionContours};

/// Douglas-Peucker tolerance in cells
const DOUGLAS_PEUCKER_EPSILON: f32 = 1.0;

/// Simplifies every outer boundary and hole.
///
/// A simplified ring replaces the traced one only while the region stays a
/// valid polygon with holes: same winding, no ring touching itself or another
/// ring, holes inside the outer boundary and outside each other. Otherwise the
/// traced ring is kept.
pub fn simplify_contours(
    ctx: &mut BuildContext,
    contours: &mut [RegionContours],
    mode: SimplificationMode,
    cell_size: f32,
) {
    ctx.start_timer(BakeStage::Simplification);

    let mut before = 0;
    let mut after = 0;
    let mut rejected = 0;
    for region in contours.iter_mut() {
        let has_outer = region.outer.is_some();
        let traced: Vec<Polyline> = region.outer.iter().chain(&region.holes).cloned().collect();
        let mut rings: Vec<Polyline> = traced
            .iter()
            .map(|line| {
                let mut line = line.clone();
                line.remove_duplicates();
                line
            })
            .collect();

        if mode != SimplificationMode::None {
            for (i, line) in traced.iter().enumerate() {
                let candidate = simplify_polyline(line, mode, cell_size);
                if ring_fits(&candidate, i, has_outer, &rings) {
                    rings[i] = candidate;
                } else {
                    rejected += 1;
                }
            }
        }

        before += traced.iter().map(Polyline::len).sum::<usize>();
        after += rings.iter().map(Polyline::len).sum::<usize>();

        let mut rings = rings.into_iter();
        if has_outer {
            region.outer = rings.next();
        }
        region.holes = rings.collect();
    }

    ctx.log_debug(format!(
        "Simplified contours from {} to {} vertices ({:?}), {} rings kept as traced",
        before, after, mode, rejected
    ));
    ctx.stop_timer(BakeStage::Simplification);
}

/// Whether `candidate` can stand in for ring `index` next to the other `rings`.
///
/// Ring 0 is the outer boundary when `has_outer` is set.
fn ring_fits(candidate: &Polyline, index: usize, has_outer: bool, rings: &[Polyline]) -> bool {
    let area = candidate.signed_area();
    let traced_area = rings[index].signed_area();
    if candidate.len() < 3 || area == 0.0 || (area > 0.0) != (traced_area > 0.0) {
        return false;
    }

    let points = &candidate.points;
    if !is_simple_ring(points) {
        return false;
    }
    let Some(bounds) = Aabb2::from_points(points) else {
        return false;
    };

    for (j, other) in rings.iter().enumerate() {
        if j == index || other.len() < 3 {
            continue;
        }
        let crosses = Aabb2::from_points(&other.points)
            .is_some_and(|b| b.overlaps(&bounds))
            && rings_touch(points, &other.points);
        if crosses {
            return false;
        }

        // Disjoint rings nest all or nothing, so one vertex decides
        let nested = if has_outer && index == 0 {
            point_in_polygon(other.points[0], points)
        } else if has_outer && j == 0 {
            point_in_polygon(points[0], &other.points)
        } else {
            !point_in_polygon(other.points[0], points) && !point_in_polygon(points[0], &other.points)
        };
        if !nested {
            return false;
        }
    }
    true
}

/// No two edges meet except consecutive ones at their shared corner, and no
/// corner folds back onto its own edges
fn is_simple_ring(points: &[Vec2]) -> bool {
    let n = points.len();
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        for j in (i + 1)..n {
            let (c, d) = (points[j], points[(j + 1) % n]);
            let conflict = if j == i + 1 {
                between(a, b, d) || between(c, d, a)
            } else if i == 0 && j == n - 1 {
                between(a, b, c) || between(c, d, b)
            } else {
                intersect(a, b, c, d)
            };
            if conflict {
                return false;
            }
        }
    }
    true
}

/// Whether any edge of `a` meets any edge of `b`, touching included
fn rings_touch(a: &[Vec2], b: &[Vec2]) -> bool {
    let (na, nb) = (a.len(), b.len());
    (0..na).any(|i| {
        let (p, q) = (a[i], a[(i + 1) % na]);
        (0..nb).any(|j| intersect(p, q, b[j], b[(j + 1) % nb]))
    })
}

/// Simplifies a closed polyline, then drops exact duplicate points.
///
/// `cell_size` converts the decimation distance from world units to cells.
/// A result with fewer than three points falls back to the input.
pub fn simplify_polyline(line: &Polyline, mode: SimplificationMode, cell_size: f32) -> Polyline {
    let points = match mode {
        SimplificationMode::None => line.points.clone(),
        SimplificationMode::DouglasPeucker => douglas_peucker_closed(&line.points, DOUGLAS_PEUCKER_EPSILON),
        SimplificationMode::Decimation { max_distance } => {
            decimate_closed(&line.points, max_distance / cell_size)
        }
    };

    let mut out = Polyline {
        points,
        closed: line.closed,
    };
    out.remove_duplicates();
    if out.len() < 3 && mode != SimplificationMode::None {
        let mut original = line.clone();
        original.remove_duplicates();
        return original;
    }
    out
}

/// Douglas-Peucker over a closed ring, split at the first point and the point farthest from it
fn douglas_peucker_closed(points: &[Vec2], epsilon: f32) -> Vec<Vec2> {
    let n = points.len();
    if n <= 3 {
        return points.to_vec();
    }

    let split = (1..n)
        .max_by(|&a, &b| {
            points[a]
                .distance_squared(points[0])
                .total_cmp(&points[b].distance_squared(points[0]))
        })
        .unwrap_or(n / 2);

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[split] = true;

    let mut ring: Vec<Vec2> = points.to_vec();
    ring.push(points[0]);
    mark_douglas_peucker(&ring, 0, split, epsilon, &mut keep);
    let mut tail = vec![false; n + 1];
    mark_douglas_peucker(&ring, split, n, epsilon, &mut tail);
    for i in split..n {
        keep[i] |= tail[i];
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

fn mark_douglas_peucker(points: &[Vec2], first: usize, last: usize, epsilon: f32, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }

    let (a, b) = (points[first], points[last]);
    let mut max_dist = 0.0;
    let mut index = first;
    for (i, p) in points.iter().enumerate().take(last).skip(first + 1) {
        let d = if a == b {
            a.distance(*p)
        } else {
            dist_point_line(*p, a, b)
        };
        if d > max_dist {
            max_dist = d;
            index = i;
        }
    }

    if max_dist > epsilon {
        keep[index] = true;
        mark_douglas_peucker(points, first, index, epsilon, keep);
        mark_douglas_peucker(points, index, last, epsilon, keep);
    }
}

/// Repeatedly removes the vertex whose removal deviates the least, while that
/// deviation stays below `max_distance`
fn decimate_closed(points: &[Vec2], max_distance: f32) -> Vec<Vec2> {
    let mut ring = points.to_vec();
    let max_sqr = max_distance * max_distance;

    while ring.len() > 3 {
        let n = ring.len();
        let best = (0..n)
            .map(|i| {
                let prev = ring[(i + n - 1) % n];
                let next = ring[(i + 1) % n];
                (i, dist_point_segment_sqr(ring[i], prev, next))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((i, d)) if d <= max_sqr => {
                ring.remove(i);
            }
            _ => break,
        }
    }

    ring
}
