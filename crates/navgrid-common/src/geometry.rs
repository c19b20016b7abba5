//! 2D geometry operations on the navigation plane
//!
//! All predicates work on the XY plane with counter-clockwise as the positive
//! winding: `tri_area_2d(a, b, c) > 0` means `c` lies left of the line `a -> b`.

use glam::Vec2;

/// Calculate twice the signed area of a 2D triangle.
///
/// - Positive: counter-clockwise
/// - Negative: clockwise
/// - Zero: degenerate (collinear points)
#[inline]
pub fn tri_area_2d(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Check if point c is strictly left of the line from a to b.
#[inline]
pub fn left(a: Vec2, b: Vec2, c: Vec2) -> bool {
    tri_area_2d(a, b, c) > 0.0
}

/// Check if three points are collinear.
#[inline]
pub fn collinear(a: Vec2, b: Vec2, c: Vec2) -> bool {
    tri_area_2d(a, b, c) == 0.0
}

/// Check if point c lies on the closed segment a-b, assuming collinearity.
#[inline]
pub fn between(a: Vec2, b: Vec2, c: Vec2) -> bool {
    if !collinear(a, b, c) {
        return false;
    }
    // If ab not vertical, check betweenness on x; else on y
    if a.x != b.x {
        (a.x <= c.x && c.x <= b.x) || (a.x >= c.x && c.x >= b.x)
    } else {
        (a.y <= c.y && c.y <= b.y) || (a.y >= c.y && c.y >= b.y)
    }
}

/// Proper intersection: the segments cross at a single interior point.
pub fn intersect_prop(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    // Eliminate improper cases
    if collinear(a, b, c) || collinear(a, b, d) || collinear(c, d, a) || collinear(c, d, b) {
        return false;
    }
    (left(a, b, c) ^ left(a, b, d)) && (left(c, d, a) ^ left(c, d, b))
}

/// Segments a-b and c-d intersect properly or improperly (touching counts).
pub fn intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    if intersect_prop(a, b, c, d) {
        return true;
    }
    between(a, b, c) || between(a, b, d) || between(c, d, a) || between(c, d, b)
}

/// Twice the signed area of a closed polygon (positive when counter-clockwise).
pub fn polygon_area2(points: &[Vec2]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        area += a.perp_dot(b);
    }
    area
}

/// Signed area of a closed polygon.
#[inline]
pub fn polygon_signed_area(points: &[Vec2]) -> f32 {
    polygon_area2(points) * 0.5
}

/// Checks if a closed polygon is wound counter-clockwise.
#[inline]
pub fn is_ccw(points: &[Vec2]) -> bool {
    polygon_area2(points) > 0.0
}

/// Checks that every corner turns left or goes straight.
pub fn is_convex(points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    (0..n).all(|i| {
        let a = points[(i + n - 1) % n];
        let b = points[i];
        let c = points[(i + 1) % n];
        tri_area_2d(a, b, c) >= -1e-5
    })
}

/// Average of the polygon vertices.
pub fn vertex_centroid(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }
    points.iter().copied().sum::<Vec2>() / points.len() as f32
}

/// Closest point on segment a-b to p, together with the segment parameter.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, f32) {
    let ab = b - a;
    let d = ab.length_squared();
    if d <= f32::EPSILON {
        // Segment is a point
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / d).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Calculate the squared distance from a point to a line segment.
#[inline]
pub fn dist_point_segment_sqr(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let (closest, _) = closest_point_on_segment(p, a, b);
    closest.distance_squared(p)
}

/// Distance from p to the infinite line through a and b.
pub fn dist_point_line(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let len = a.distance(b);
    if len <= f32::EPSILON {
        return a.distance(p);
    }
    tri_area_2d(a, b, p).abs() / len
}

/// Checks if p lies inside or on the boundary of the triangle (any winding).
pub fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = tri_area_2d(a, b, p);
    let d2 = tri_area_2d(b, c, p);
    let d3 = tri_area_2d(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Even-odd test for a closed polygon of either winding. Points on the
/// boundary may land on either side.
pub fn point_in_polygon(p: Vec2, points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// In-circle determinant for the counter-clockwise triangle a, b, c.
///
/// Positive when d lies inside the circumcircle, zero when cocircular.
pub fn in_circle(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> f32 {
    let ad = a - d;
    let bd = b - d;
    let cd = c - d;
    let ad2 = ad.length_squared();
    let bd2 = bd.length_squared();
    let cd2 = cd.length_squared();
    ad.x * (bd.y * cd2 - bd2 * cd.y) - ad.y * (bd.x * cd2 - bd2 * cd.x)
        + ad2 * (bd.x * cd.y - bd.y * cd.x)
}
