//! Funnel string-pulling through a polygon corridor

use glam::Vec2;
use navgrid::RegionMesh;
use navgrid_common::tri_area_2d;

const EQUAL_EPSILON_SQR: f32 = 1e-12;

#[inline]
fn vequal(a: Vec2, b: Vec2) -> bool {
    a.distance_squared(b) < EQUAL_EPSILON_SQR
}

/// Portals `(left, right)` crossed when walking the polygon corridor
pub fn corridor_portals(mesh: &RegionMesh, corridor: &[usize]) -> Vec<(Vec2, Vec2)> {
    corridor
        .windows(2)
        .filter_map(|pair| mesh.portal(pair[0], pair[1]))
        .collect()
}

/// Shortest path from `start` to `end` through the portals.
///
/// Keeps an apex with a left and right bound. A portal point that narrows one
/// bound past the other commits that other bound as a waypoint, which becomes
/// the new apex, and the sweep restarts from the portal after it.
pub fn string_pull(start: Vec2, end: Vec2, portals: &[(Vec2, Vec2)]) -> Vec<Vec2> {
    let mut gates = Vec::with_capacity(portals.len() + 2);
    gates.push((start, start));
    gates.extend_from_slice(portals);
    gates.push((end, end));

    let mut path = vec![start];
    let (mut apex, mut left, mut right) = (start, start, start);
    let (mut left_index, mut right_index) = (0, 0);

    let mut i = 1;
    while i < gates.len() {
        let (portal_left, portal_right) = gates[i];

        // Narrow the right side
        if tri_area_2d(apex, right, portal_right) >= 0.0 {
            if vequal(apex, right) || tri_area_2d(apex, left, portal_right) < 0.0 {
                right = portal_right;
                right_index = i;
            } else {
                // Right crossed over left: left becomes a corner
                push_unique(&mut path, left);
                apex = left;
                right = left;
                right_index = left_index;
                i = left_index + 1;
                continue;
            }
        }

        // Narrow the left side
        if tri_area_2d(apex, left, portal_left) <= 0.0 {
            if vequal(apex, left) || tri_area_2d(apex, right, portal_left) > 0.0 {
                left = portal_left;
                left_index = i;
            } else {
                // Left crossed over right: right becomes a corner
                push_unique(&mut path, right);
                apex = right;
                left = right;
                left_index = right_index;
                i = right_index + 1;
                continue;
            }
        }

        i += 1;
    }

    push_unique(&mut path, end);
    path
}

fn push_unique(path: &mut Vec<Vec2>, p: Vec2) {
    if path.last().map_or(true, |&last| !vequal(last, p)) {
        path.push(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navgrid::{build_adjacency, BuildContext, ConvexPolygon};

    #[test]
    fn test_straight_corridor_is_one_segment() {
        let portals = [
            (Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)),
            (Vec2::new(2.0, 1.0), Vec2::new(2.0, 0.0)),
        ];
        let path = string_pull(Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5), &portals);
        assert_eq!(path, vec![Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)]);
    }

    #[test]
    fn test_corner_is_committed() {
        // Right then up around the corner at (1, 1)
        let portals = [
            (Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)),
            (Vec2::new(1.0, 1.0), Vec2::new(2.0, 1.0)),
        ];
        let path = string_pull(Vec2::new(0.5, 0.5), Vec2::new(1.2, 1.8), &portals);
        assert_eq!(
            path,
            vec![Vec2::new(0.5, 0.5), Vec2::new(1.0, 1.0), Vec2::new(1.2, 1.8)]
        );
    }

    #[test]
    fn test_right_corner_is_committed() {
        // Right then down around the corner at (1, 0)
        let portals = [
            (Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)),
            (Vec2::new(2.0, 0.0), Vec2::new(1.0, 0.0)),
        ];
        let path = string_pull(Vec2::new(0.5, 0.5), Vec2::new(1.2, -0.8), &portals);
        assert_eq!(
            path,
            vec![Vec2::new(0.5, 0.5), Vec2::new(1.0, 0.0), Vec2::new(1.2, -0.8)]
        );
    }

    #[test]
    fn test_funnel_beats_centroid_path() {
        // Unit squares at (0,0), (1,0) and (1,1)
        let vertices = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(2.0, 2.0),
        ];
        let polygons = vec![
            ConvexPolygon::new(vec![0, 1, 4, 3], &vertices),
            ConvexPolygon::new(vec![1, 2, 5, 4], &vertices),
            ConvexPolygon::new(vec![4, 5, 7, 6], &vertices),
        ];
        let mut mesh = RegionMesh { vertices, polygons };
        build_adjacency(&mut BuildContext::new(), &mut mesh);

        let corridor = [0, 1, 2];
        let (start, end) = (Vec2::new(0.2, 0.5), Vec2::new(1.5, 1.8));
        let pulled = string_pull(start, end, &corridor_portals(&mesh, &corridor));
        assert_eq!(pulled, vec![start, Vec2::new(1.0, 1.0), end]);

        let centers = [start, mesh.polygons[1].centroid, end];
        let length = |p: &[Vec2]| p.windows(2).map(|w| w[0].distance(w[1])).sum::<f32>();
        assert!(length(&pulled) <= length(&centers));
    }

    #[test]
    fn test_no_portals() {
        let path = string_pull(Vec2::ZERO, Vec2::ONE, &[]);
        assert_eq!(path, vec![Vec2::ZERO, Vec2::ONE]);
        let path = string_pull(Vec2::ONE, Vec2::ONE, &[]);
        assert_eq!(path, vec![Vec2::ONE]);
    }
}
