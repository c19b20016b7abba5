//! Baked navigation mesh snapshot
//!
//! A [`NavMesh`] owns the result of the last completed bake: the inflated grid,
//! the region labels and one [`Region`] per connected walkable area. Each
//! region lazily builds a quadtree over its polygons on first query.

use std::sync::OnceLock;

use glam::Vec2;
use navgrid::{
    BakeOutput, BakeStats, BakedRegion, BuildContext, Grid, NavMeshBuilder, NavMeshConfig,
    ObstacleQuery, Polyline, RegionMap, RegionMesh,
};
#[cfg(feature = "serialization")]
use navgrid_common::Error;
use navgrid_common::Result;

use crate::quadtree::{NearestPolygon, QuadTree};

/// One connected walkable area of the navigation mesh
#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Region {
    /// Region label in the grid's region map
    pub id: u16,
    /// Number of walkable cells in the region
    pub cell_count: usize,
    /// Counter-clockwise outer boundary
    pub outer: Option<Polyline>,
    /// Clockwise hole boundaries
    pub holes: Vec<Polyline>,
    /// Convex polygons with their neighbor graph
    pub mesh: RegionMesh,
    quadtree_depth: u32,
    /// Spatial index (not serialized)
    #[cfg_attr(feature = "serialization", serde(skip))]
    index: OnceLock<QuadTree>,
}

impl Region {
    fn from_baked(baked: BakedRegion, quadtree_depth: u32) -> Self {
        Self {
            id: baked.id,
            cell_count: baked.cell_count,
            outer: baked.outer,
            holes: baked.holes,
            mesh: baked.mesh,
            quadtree_depth,
            index: OnceLock::new(),
        }
    }

    /// Quadtree over the region's polygons, built on first use
    pub fn spatial_index(&self) -> &QuadTree {
        self.index.get_or_init(|| {
            log::debug!(
                "Building quadtree for region {} ({} polygons)",
                self.id,
                self.mesh.polygons.len()
            );
            QuadTree::build(&self.mesh, self.quadtree_depth)
        })
    }

    /// Whether the spatial index has been built
    pub fn has_spatial_index(&self) -> bool {
        self.index.get().is_some()
    }

    /// Polygon containing `point`, or the one whose boundary is closest
    pub fn closest_polygon(&self, point: Vec2) -> Option<NearestPolygon> {
        self.spatial_index().nearest(&self.mesh, point)
    }
}

/// Navigation mesh built from one bake
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NavMesh {
    config: NavMeshConfig,
    grid: Grid,
    region_map: RegionMap,
    regions: Vec<Region>,
    stats: BakeStats,
}

impl NavMesh {
    /// Rasterizes `obstacles` and bakes a navigation mesh from them
    pub fn bake<Q: ObstacleQuery + ?Sized>(
        ctx: &mut BuildContext,
        config: NavMeshConfig,
        obstacles: &Q,
    ) -> Result<Self> {
        let output = NavMeshBuilder::new(config.clone()).build(ctx, obstacles)?;
        Ok(Self::from_output(config, output))
    }

    /// Bakes a navigation mesh from an already rasterized grid
    pub fn bake_grid(ctx: &mut BuildContext, config: NavMeshConfig, grid: Grid) -> Result<Self> {
        let output = NavMeshBuilder::new(config.clone()).build_from_grid(ctx, grid)?;
        Ok(Self::from_output(config, output))
    }

    /// Replaces the baked state with a fresh bake of `obstacles`.
    ///
    /// On failure the previous state is discarded and the mesh is left empty.
    pub fn rebake<Q: ObstacleQuery + ?Sized>(
        &mut self,
        ctx: &mut BuildContext,
        obstacles: &Q,
    ) -> Result<()> {
        let config = self.config.clone();
        match NavMeshBuilder::new(config.clone()).build(ctx, obstacles) {
            Ok(output) => {
                *self = Self::from_output(config, output);
                Ok(())
            }
            Err(e) => {
                ctx.log_error(format!("Bake failed: {}", e));
                self.grid = Grid::empty(config.cell_size);
                self.region_map = RegionMap {
                    width: 0,
                    height: 0,
                    labels: Vec::new(),
                    cell_counts: Vec::new(),
                    truncated: false,
                };
                self.regions.clear();
                self.stats = BakeStats::default();
                Err(e)
            }
        }
    }

    fn from_output(config: NavMeshConfig, output: BakeOutput) -> Self {
        let depth = config.quadtree_depth;
        Self {
            grid: output.grid,
            region_map: output.region_map,
            regions: output
                .regions
                .into_iter()
                .map(|r| Region::from_baked(r, depth))
                .collect(),
            stats: output.stats,
            config,
        }
    }

    pub fn config(&self) -> &NavMeshConfig {
        &self.config
    }

    /// Grid after obstacle inflation
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn region_map(&self) -> &RegionMap {
        &self.region_map
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Region at `index`. Panics when out of range.
    pub fn region(&self, index: usize) -> &Region {
        &self.regions[index]
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn stats(&self) -> &BakeStats {
        &self.stats
    }

    /// Whether the bake produced no regions
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region whose grid cells contain `point`
    pub fn region_of_point(&self, point: Vec2) -> Option<usize> {
        let (x, y) = self.grid.world_to_cell(point)?;
        self.region_map
            .label(x as i32, y as i32)
            .map(usize::from)
            .filter(|&r| r < self.regions.len())
    }

    /// Closest polygon to `point` within one region. Panics when `region` is out of range.
    pub fn closest_polygon(&self, region: usize, point: Vec2) -> Option<NearestPolygon> {
        self.regions[region].closest_polygon(point)
    }

    /// Saves the navigation mesh to a file in JSON format
    #[cfg(feature = "serialization")]
    pub fn save_to_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads a navigation mesh from a JSON file
    #[cfg(feature = "serialization")]
    pub fn load_from_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_bytes(json.as_bytes())
    }

    /// Serializes the navigation mesh to JSON bytes
    #[cfg(feature = "serialization")]
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes a navigation mesh from JSON bytes
    #[cfg(feature = "serialization")]
    pub fn from_json_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navgrid::ObstacleSet;
    use navgrid_common::Aabb2;

    fn open_config() -> NavMeshConfig {
        NavMeshConfig {
            cell_size: 1.0,
            agent_radius: 0.0,
            ..Default::default()
        }
    }

    fn split_map() -> Grid {
        Grid::from_ascii(
            "
            ....#....
            ....#....
            ....#....
            ",
            1.0,
            Vec2::ZERO,
        )
        .unwrap()
    }

    #[test]
    fn test_bake_grid_builds_regions() {
        let mut ctx = BuildContext::new();
        let mesh = NavMesh::bake_grid(&mut ctx, open_config(), split_map()).unwrap();
        assert_eq!(mesh.region_count(), 2);
        assert_eq!(mesh.stats().region_count, 2);
        assert_eq!(mesh.region(0).cell_count, 12);
        assert_eq!(mesh.region(1).cell_count, 12);
    }

    #[test]
    fn test_region_of_point() {
        let mut ctx = BuildContext::new();
        let mesh = NavMesh::bake_grid(&mut ctx, open_config(), split_map()).unwrap();
        assert_eq!(mesh.region_of_point(Vec2::new(1.5, 1.5)), Some(0));
        assert_eq!(mesh.region_of_point(Vec2::new(7.5, 1.5)), Some(1));
        assert_eq!(mesh.region_of_point(Vec2::new(4.5, 1.5)), None);
        assert_eq!(mesh.region_of_point(Vec2::new(-1.0, 1.5)), None);
    }

    #[test]
    fn test_spatial_index_is_lazy() {
        let mut ctx = BuildContext::new();
        let mesh = NavMesh::bake_grid(&mut ctx, open_config(), split_map()).unwrap();
        assert!(!mesh.region(0).has_spatial_index());

        let hit = mesh.closest_polygon(0, Vec2::new(2.0, 1.5)).unwrap();
        assert_eq!(hit.point, Vec2::new(2.0, 1.5));
        assert!(mesh.region(0).has_spatial_index());
        assert!(!mesh.region(1).has_spatial_index());
    }

    #[test]
    fn test_rebake_replaces_state() {
        let config = NavMeshConfig {
            bounds: Some(Aabb2::new(Vec2::ZERO, Vec2::splat(10.0))),
            ..open_config()
        };
        let mut ctx = BuildContext::new();
        let mut mesh = NavMesh::bake(&mut ctx, config, &ObstacleSet::new()).unwrap();
        assert_eq!(mesh.region_count(), 1);
        mesh.closest_polygon(0, Vec2::splat(5.0));

        let mut wall = ObstacleSet::new();
        wall.add_box(Vec2::new(4.0, 0.0), Vec2::new(6.0, 10.0));
        mesh.rebake(&mut ctx, &wall).unwrap();
        assert_eq!(mesh.region_count(), 2);
        assert!(!mesh.region(0).has_spatial_index());
    }

    #[test]
    fn test_failed_rebake_discards_state() {
        let mut ctx = BuildContext::new();
        let mut mesh = NavMesh::bake_grid(&mut ctx, open_config(), split_map()).unwrap();
        mesh.config.cell_size = -1.0;
        assert!(mesh.rebake(&mut ctx, &ObstacleSet::new()).is_err());
        assert!(mesh.is_empty());
        assert_eq!(*mesh.stats(), BakeStats::default());
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn test_json_round_trip() {
        let mut ctx = BuildContext::new();
        let mesh = NavMesh::bake_grid(&mut ctx, open_config(), split_map()).unwrap();
        let bytes = mesh.to_json_bytes().unwrap();
        let restored = NavMesh::from_json_bytes(&bytes).unwrap();

        assert_eq!(restored.region_count(), 2);
        assert_eq!(restored.region(0).mesh, mesh.region(0).mesh);
        assert_eq!(restored.grid(), mesh.grid());
        assert!(!restored.region(0).has_spatial_index());
        assert!(restored.closest_polygon(0, Vec2::new(1.5, 1.5)).is_some());
    }
}
