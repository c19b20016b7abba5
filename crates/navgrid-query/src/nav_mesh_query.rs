//! Read-only queries against a baked [`NavMesh`]
//!
//! All queries borrow the mesh immutably and report failure as values:
//! `None` for unresolvable points and [`PathStatus::NoPath`] for paths.

use glam::Vec2;

use crate::funnel::{corridor_portals, string_pull};
use crate::nav_mesh::NavMesh;
use crate::pathfinding::find_polygon_path;
use crate::quadtree::NearestPolygon;
use crate::raycast::{raycast_mesh, RaycastHit};
use crate::status::{NavPath, PathStatus};

/// A point resolved onto the navigation mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointOnMesh {
    pub region: usize,
    pub polygon: usize,
    /// The query point when inside a polygon, otherwise the closest boundary point
    pub point: Vec2,
    /// Positive inside the polygon, negative outside
    pub signed_distance: f32,
}

impl PointOnMesh {
    fn new(region: usize, nearest: NearestPolygon) -> Self {
        Self {
            region,
            polygon: nearest.polygon,
            point: nearest.point,
            signed_distance: nearest.signed_distance,
        }
    }

    /// Whether the query point lay inside the polygon
    pub fn is_inside(&self) -> bool {
        self.signed_distance >= 0.0
    }
}

/// Query interface over a navigation mesh
#[derive(Debug, Clone, Copy)]
pub struct NavMeshQuery<'a> {
    nav_mesh: &'a NavMesh,
}

impl<'a> NavMeshQuery<'a> {
    pub fn new(nav_mesh: &'a NavMesh) -> Self {
        Self { nav_mesh }
    }

    pub fn nav_mesh(&self) -> &'a NavMesh {
        self.nav_mesh
    }

    /// Resolves `point` onto the mesh.
    ///
    /// With a region only that region is searched. Without one every region
    /// is searched and the closest polygon overall wins, ties going to the
    /// lower region index. Returns `None` when nothing is baked.
    pub fn get_point_on_navmesh(&self, point: Vec2, region: Option<usize>) -> Option<PointOnMesh> {
        if let Some(r) = region {
            return self
                .nav_mesh
                .closest_polygon(r, point)
                .map(|n| PointOnMesh::new(r, n));
        }

        let mut best: Option<PointOnMesh> = None;
        for r in 0..self.nav_mesh.region_count() {
            let Some(nearest) = self.nav_mesh.closest_polygon(r, point) else {
                continue;
            };
            if best.map_or(true, |b| nearest.signed_distance > b.signed_distance) {
                best = Some(PointOnMesh::new(r, nearest));
            }
        }
        best
    }

    /// Plans a path between two world points.
    ///
    /// Both points are snapped onto the mesh first. Without an explicit region
    /// they must resolve to the same region, otherwise there is no path.
    pub fn plan_path(&self, start: Vec2, end: Vec2, region: Option<usize>) -> NavPath {
        let (Some(from), Some(to)) = (
            self.get_point_on_navmesh(start, region),
            self.get_point_on_navmesh(end, region),
        ) else {
            log::debug!("Path endpoints {:?} -> {:?} are not on the mesh", start, end);
            return NavPath::no_path();
        };

        if from.region != to.region {
            log::debug!(
                "Path endpoints lie in different regions ({} and {})",
                from.region,
                to.region
            );
            return NavPath::no_path();
        }

        self.plan_path_on_navmesh(from.point, from.polygon, to.point, to.polygon, from.region)
    }

    /// Plans a path between points whose polygons are already known.
    ///
    /// Waypoints are string-pulled through the corridor when the funnel is
    /// enabled, otherwise they run through the centroids of the polygons
    /// between the endpoints. Panics when `region` is out of range.
    pub fn plan_path_on_navmesh(
        &self,
        start: Vec2,
        start_polygon: usize,
        end: Vec2,
        end_polygon: usize,
        region: usize,
    ) -> NavPath {
        let config = self.nav_mesh.config();
        let mesh = &self.nav_mesh.region(region).mesh;

        let Some(polygons) =
            find_polygon_path(mesh, start_polygon, start, end_polygon, end, config.path_mode)
        else {
            log::debug!(
                "No corridor from polygon {} to {} in region {}",
                start_polygon,
                end_polygon,
                region
            );
            return NavPath::no_path();
        };

        let waypoints = if config.use_funnel {
            string_pull(start, end, &corridor_portals(mesh, &polygons))
        } else {
            let inner = polygons.len().saturating_sub(1);
            std::iter::once(start)
                .chain(polygons[1.min(inner)..inner].iter().map(|&p| mesh.polygons[p].centroid))
                .chain(std::iter::once(end))
                .collect()
        };

        NavPath {
            status: PathStatus::Full,
            region: Some(region),
            polygons,
            waypoints,
        }
    }

    /// Walks a ray of `max_distance` along `direction` from `origin`.
    ///
    /// The origin is resolved like [`Self::get_point_on_navmesh`]. An origin
    /// off the mesh is blocked immediately at its snapped position. Returns the
    /// region walked together with the hit, or `None` when nothing is baked.
    pub fn raycast_vector(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        region: Option<usize>,
    ) -> Option<(usize, RaycastHit)> {
        let start = self.get_point_on_navmesh(origin, region)?;

        if !start.is_inside() {
            return Some((
                start.region,
                RaycastHit {
                    blocked: true,
                    point: start.point,
                    polygon: start.polygon,
                    t: 0.0,
                    edge: None,
                    visited: vec![start.polygon],
                },
            ));
        }

        let end = origin + direction.normalize_or_zero() * max_distance.max(0.0);
        let mesh = &self.nav_mesh.region(start.region).mesh;
        Some((start.region, raycast_mesh(mesh, start.polygon, origin, end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navgrid::{BuildContext, Grid, NavMeshConfig, PathMode, SimplificationMode};

    fn bake(map: &str, use_funnel: bool) -> NavMesh {
        let config = NavMeshConfig {
            cell_size: 1.0,
            agent_radius: 0.0,
            simplification: SimplificationMode::None,
            use_funnel,
            ..Default::default()
        };
        let grid = Grid::from_ascii(map, 1.0, Vec2::ZERO).unwrap();
        NavMesh::bake_grid(&mut BuildContext::new(), config, grid).unwrap()
    }

    const SPLIT: &str = "
        ....#....
        ....#....
        ....#....
    ";

    const CORNER: &str = "
        ......
        ......
        ....##
        ....##
    ";

    #[test]
    fn test_point_on_mesh_picks_region() {
        let mesh = bake(SPLIT, true);
        let query = NavMeshQuery::new(&mesh);

        let p = query.get_point_on_navmesh(Vec2::new(7.0, 1.0), None).unwrap();
        assert_eq!(p.region, 1);
        assert_eq!(p.point, Vec2::new(7.0, 1.0));
        assert!(p.is_inside());

        // Inside the wall: snaps to the closer side
        let p = query.get_point_on_navmesh(Vec2::new(4.2, 1.0), None).unwrap();
        assert_eq!(p.region, 0);
        assert!((p.point - Vec2::new(4.0, 1.0)).length() < 1e-5);
        assert!(!p.is_inside());

        // Scoped to the far region
        let p = query
            .get_point_on_navmesh(Vec2::new(4.2, 1.0), Some(1))
            .unwrap();
        assert_eq!(p.region, 1);
        assert!((p.point - Vec2::new(5.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_point_on_empty_mesh() {
        let mesh = bake("##\n##", true);
        let query = NavMeshQuery::new(&mesh);
        assert!(query.get_point_on_navmesh(Vec2::ONE, None).is_none());
        assert!(!query.plan_path(Vec2::ZERO, Vec2::ONE, None).is_full());
        assert!(query.raycast_vector(Vec2::ONE, Vec2::X, 1.0, None).is_none());
    }

    #[test]
    fn test_plan_path_across_regions_fails() {
        let mesh = bake(SPLIT, true);
        let query = NavMeshQuery::new(&mesh);
        let path = query.plan_path(Vec2::new(1.0, 1.0), Vec2::new(8.0, 1.0), None);
        assert_eq!(path.status, PathStatus::NoPath);
        assert!(path.waypoints.is_empty());
    }

    #[test]
    fn test_plan_path_around_corner() {
        let mesh = bake(CORNER, true);
        let query = NavMeshQuery::new(&mesh);
        let start = Vec2::new(5.5, 2.5);
        let end = Vec2::new(1.0, 0.5);
        let path = query.plan_path(start, end, None);

        assert!(path.is_full());
        assert_eq!(path.waypoints.first(), Some(&start));
        assert_eq!(path.waypoints.last(), Some(&end));
        // The straight line cuts through the obstacle, so the path bends at its corner
        assert!(path
            .waypoints
            .iter()
            .any(|w| (*w - Vec2::new(4.0, 2.0)).length() < 1e-4));
        assert!(path.length() >= start.distance(end));
    }

    #[test]
    fn test_plan_path_without_funnel_uses_centroids() {
        let mesh = bake(CORNER, false);
        let query = NavMeshQuery::new(&mesh);
        let start = Vec2::new(5.5, 2.5);
        let end = Vec2::new(1.0, 0.5);
        let path = query.plan_path(start, end, None);

        assert!(path.is_full());
        assert_eq!(path.waypoints.len(), path.polygons.len().max(2));
        let region = &mesh.region(0).mesh;
        for (w, &p) in path.waypoints[1..path.waypoints.len() - 1]
            .iter()
            .zip(&path.polygons[1..])
        {
            assert_eq!(*w, region.polygons[p].centroid);
        }
    }

    #[test]
    fn test_plan_path_on_navmesh_with_known_polygons() {
        let mesh = bake(CORNER, true);
        let query = NavMeshQuery::new(&mesh);
        let start = query.get_point_on_navmesh(Vec2::new(5.5, 2.5), None).unwrap();
        let end = query.get_point_on_navmesh(Vec2::new(1.0, 0.5), None).unwrap();

        let direct = query.plan_path(start.point, end.point, None);
        let known =
            query.plan_path_on_navmesh(start.point, start.polygon, end.point, end.polygon, 0);
        assert_eq!(direct, known);
    }

    #[test]
    fn test_mid_edge_mode_finds_same_endpoints() {
        let config = NavMeshConfig {
            cell_size: 1.0,
            agent_radius: 0.0,
            simplification: SimplificationMode::None,
            path_mode: PathMode::MidEdge,
            ..Default::default()
        };
        let grid = Grid::from_ascii(CORNER, 1.0, Vec2::ZERO).unwrap();
        let mesh = NavMesh::bake_grid(&mut BuildContext::new(), config, grid).unwrap();
        let query = NavMeshQuery::new(&mesh);

        let path = query.plan_path(Vec2::new(5.5, 2.5), Vec2::new(1.0, 0.5), None);
        assert!(path.is_full());
        assert_eq!(path.waypoints.last(), Some(&Vec2::new(1.0, 0.5)));
    }

    #[test]
    fn test_raycast_vector() {
        let mesh = bake(CORNER, true);
        let query = NavMeshQuery::new(&mesh);

        // Along the open top band
        let (region, hit) = query
            .raycast_vector(Vec2::new(0.5, 3.0), Vec2::X, 5.0, None)
            .unwrap();
        assert_eq!(region, 0);
        assert!(!hit.blocked);
        assert!((hit.point - Vec2::new(5.5, 3.0)).length() < 1e-4);

        // Into the obstacle block
        let (_, hit) = query
            .raycast_vector(Vec2::new(0.5, 1.0), Vec2::X, 10.0, None)
            .unwrap();
        assert!(hit.blocked);
        assert!((hit.point - Vec2::new(4.0, 1.0)).length() < 1e-4);

        // Off-mesh origin is blocked where it snaps
        let (_, hit) = query
            .raycast_vector(Vec2::new(5.0, 1.0), Vec2::Y, 3.0, None)
            .unwrap();
        assert!(hit.blocked);
        assert_eq!(hit.t, 0.0);
    }
}
