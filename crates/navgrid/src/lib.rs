//! Navgrid bake pipeline
//!
//! Turns an obstacle layout into convex walkable polygons: obstacles are
//! rasterized onto a grid, grown by the agent radius, split into connected
//! regions, traced into outlines, simplified, triangulated, refined and merged
//! into convex polygons linked by shared edges.

mod area;
mod config;
mod context;
mod contour;
mod delaunay;
mod obstacles;
mod polymesh;
mod rasterization;
mod regions;
mod simplify;
mod triangulation;

pub use area::inflate_obstacles;
pub use config::{NavMeshConfig, PathMode, SimplificationMode};
pub use context::{BakeStage, BuildContext, LogEntry, LogLevel, ProgressInfo, StageTiming};
pub use contour::{trace_contours, Polyline, RegionContours};
pub use delaunay::refine_delaunay;
pub use obstacles::{Collider, ColliderHit, ColliderShape, ObstacleQuery, ObstacleSet};
pub use polymesh::{build_adjacency, merge_convex_polygons, ConvexPolygon, RegionMesh};
pub use rasterization::{
    rasterize_obstacles, Grid, CELL_INFLATED, CELL_OBSTACLE, CELL_WALKABLE,
};
pub use regions::{label_regions, RegionMap, UNASSIGNED};
pub use simplify::{simplify_contours, simplify_polyline};
pub use triangulation::{edge_key, triangulate_region, Triangulation};

use navgrid_common::{Error, Result};

/// One connected walkable region after baking, in world coordinates
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BakedRegion {
    /// Region label
    pub id: u16,
    /// Number of grid cells in the region
    pub cell_count: usize,
    /// Counter-clockwise outer boundary after simplification
    pub outer: Option<Polyline>,
    /// Clockwise hole boundaries after simplification
    pub holes: Vec<Polyline>,
    /// Convex polygons with their neighbor graph
    pub mesh: RegionMesh,
}

/// Summary counters of a bake
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BakeStats {
    pub grid_width: usize,
    pub grid_height: usize,
    pub walkable_cells: usize,
    pub region_count: usize,
    /// Labeling stopped at the region capacity
    pub regions_truncated: bool,
    pub triangle_count: usize,
    pub delaunay_flips: usize,
    pub polygon_count: usize,
    pub vertex_count: usize,
}

/// Everything produced by one bake
#[derive(Debug, Clone)]
pub struct BakeOutput {
    /// Grid after inflation
    pub grid: Grid,
    pub region_map: RegionMap,
    pub regions: Vec<BakedRegion>,
    pub stats: BakeStats,
}

/// Builder for navgrid navigation meshes
#[derive(Debug)]
pub struct NavMeshBuilder {
    config: NavMeshConfig,
}

impl NavMeshBuilder {
    /// Creates a new builder with the specified configuration
    pub fn new(config: NavMeshConfig) -> Self {
        Self { config }
    }

    /// Gets a reference to the configuration
    pub fn config(&self) -> &NavMeshConfig {
        &self.config
    }

    /// Rasterizes the obstacles and runs the full pipeline
    pub fn build<Q: ObstacleQuery + ?Sized>(
        &self,
        ctx: &mut BuildContext,
        obstacles: &Q,
    ) -> Result<BakeOutput> {
        self.config.validate()?;
        ctx.start_timer(BakeStage::Total);

        let result = rasterize_obstacles(ctx, &self.config, obstacles)
            .and_then(|grid| self.build_stages(ctx, grid));

        ctx.stop_timer(BakeStage::Total);
        result
    }

    /// Runs the pipeline on an already rasterized grid.
    ///
    /// The grid's own cell size and origin are used; only cells marked
    /// [`CELL_OBSTACLE`] seed inflation.
    pub fn build_from_grid(&self, ctx: &mut BuildContext, grid: Grid) -> Result<BakeOutput> {
        self.config.validate()?;
        if grid.cell_size <= 0.0 || !grid.cell_size.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "Invalid grid cell size {}",
                grid.cell_size
            )));
        }
        ctx.start_timer(BakeStage::Total);
        let result = self.build_stages(ctx, grid);
        ctx.stop_timer(BakeStage::Total);
        result
    }

    fn build_stages(&self, ctx: &mut BuildContext, mut grid: Grid) -> Result<BakeOutput> {
        let config = &self.config;
        let radius_cells = (config.agent_radius / grid.cell_size).ceil().max(0.0) as usize;
        inflate_obstacles(ctx, &mut grid, radius_cells);

        let region_map = label_regions(ctx, &grid, config.max_regions);
        let traced = trace_contours(ctx, &region_map)?;
        let mut contours = traced.clone();
        simplify_contours(ctx, &mut contours, config.simplification, grid.cell_size);

        let mut stats = BakeStats {
            grid_width: grid.width,
            grid_height: grid.height,
            walkable_cells: grid.walkable_count(),
            region_count: region_map.region_count(),
            regions_truncated: region_map.truncated,
            ..Default::default()
        };

        let total = contours.len();
        let mut regions = Vec::with_capacity(total);
        for (id, (simplified, traced)) in contours.into_iter().zip(traced).enumerate() {
            ctx.set_progress(id + 1, total, format!("Building region {}", id));

            let (region, mut mesh) = self.region_mesh(ctx, id, simplified, traced, &mut stats);
            mesh.transform(|p| grid.grid_to_world(p));
            stats.polygon_count += mesh.polygons.len();
            stats.vertex_count += mesh.vertices.len();

            regions.push(BakedRegion {
                id: id as u16,
                cell_count: region_map.cell_counts[id],
                outer: region.outer.map(|o| o.map_points(|p| grid.grid_to_world(p))),
                holes: region
                    .holes
                    .iter()
                    .map(|h| h.map_points(|p| grid.grid_to_world(p)))
                    .collect(),
                mesh,
            });
        }
        ctx.clear_progress();

        ctx.log_info(format!(
            "Baked {} regions, {} polygons, {} vertices",
            stats.region_count, stats.polygon_count, stats.vertex_count
        ));

        Ok(BakeOutput {
            grid,
            region_map,
            regions,
            stats,
        })
    }

    /// Builds the convex mesh of one region.
    ///
    /// A simplified outline that fails to triangulate, or whose mesh falls
    /// apart or misses part of the outline area, is rebuilt from the traced
    /// outline. Returns the outline the mesh was built from.
    fn region_mesh(
        &self,
        ctx: &mut BuildContext,
        id: usize,
        simplified: RegionContours,
        mut traced: RegionContours,
        stats: &mut BakeStats,
    ) -> (RegionContours, RegionMesh) {
        if simplified.outer.is_none() {
            return (simplified, RegionMesh::default());
        }

        let can_retry = self.config.simplification != SimplificationMode::None;
        match self.convex_mesh(ctx, &simplified) {
            Ok(built) if !can_retry || built.covers(&simplified) => {
                return (simplified, built.finish(stats));
            }
            Ok(_) => ctx.log_warning_with_category(
                format!(
                    "Region {} lost coverage or connectivity after simplification; using the traced outline",
                    id
                ),
                "simplification",
            ),
            Err(e) if can_retry => ctx.log_warning_with_category(
                format!(
                    "Region {} failed to triangulate after simplification ({}); using the traced outline",
                    id, e
                ),
                "simplification",
            ),
            Err(e) => {
                ctx.log_warning_with_category(
                    format!("Region {} could not be triangulated: {}", id, e),
                    "triangulation",
                );
                return (simplified, RegionMesh::default());
            }
        }

        for line in traced.outer.iter_mut().chain(traced.holes.iter_mut()) {
            line.remove_duplicates();
        }
        match self.convex_mesh(ctx, &traced) {
            Ok(built) => (traced, built.finish(stats)),
            Err(e) => {
                ctx.log_warning_with_category(
                    format!("Region {} could not be triangulated: {}", id, e),
                    "triangulation",
                );
                (traced, RegionMesh::default())
            }
        }
    }

    fn convex_mesh(&self, ctx: &mut BuildContext, contours: &RegionContours) -> Result<RegionBuild> {
        let Some(outer) = &contours.outer else {
            return Ok(RegionBuild::default());
        };

        let mut tri = triangulate_region(ctx, outer, &contours.holes)?;
        let triangles = tri.triangles.len();
        let flips = refine_delaunay(
            ctx,
            &mut tri,
            self.config.delaunay_max_iterations,
            self.config.delaunay_flip_tolerance,
        );
        let mut mesh = RegionMesh::from_triangulation(&tri);
        merge_convex_polygons(ctx, &mut mesh);
        build_adjacency(ctx, &mut mesh);

        Ok(RegionBuild {
            mesh,
            triangles,
            flips,
            forced_ears: tri.forced_ears,
        })
    }
}

/// Mesh of one region with the counters it contributes to [`BakeStats`]
#[derive(Debug, Default)]
struct RegionBuild {
    mesh: RegionMesh,
    triangles: usize,
    flips: usize,
    forced_ears: usize,
}

impl RegionBuild {
    /// One connected piece covering exactly the area inside `contours`.
    ///
    /// Outline corners sit on cell corners, so the smallest triangle that can
    /// go missing has an area of half a cell.
    fn covers(&self, contours: &RegionContours) -> bool {
        let expected: f32 = contours
            .outer
            .iter()
            .chain(&contours.holes)
            .map(Polyline::signed_area)
            .sum();
        self.forced_ears == 0
            && self.mesh.component_count() == 1
            && (self.mesh.area() - expected).abs() <= 0.25f32.max(expected.abs() * 1e-6)
    }

    fn finish(self, stats: &mut BakeStats) -> RegionMesh {
        stats.triangle_count += self.triangles;
        stats.delaunay_flips += self.flips;
        self.mesh
    }
}
