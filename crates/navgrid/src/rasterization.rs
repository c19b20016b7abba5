//! Obstacle rasterization onto a uniform walkability grid

use glam::Vec2;
use navgrid_common::{Aabb2, Error, Result};

use crate::config::NavMeshConfig;
use crate::context::{BakeStage, BuildContext};
use crate::obstacles::ObstacleQuery;

/// Cell is walkable
pub const CELL_WALKABLE: u8 = 0;
/// Cell overlaps a static obstacle
pub const CELL_OBSTACLE: u8 = 1;
/// Cell was blocked by agent radius inflation
pub const CELL_INFLATED: u8 = 2;

/// Uniform grid of cell states covering the baked area
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Grid {
    /// Number of cells along X
    pub width: usize,
    /// Number of cells along Y
    pub height: usize,
    /// World position of the minimum corner of cell (0, 0)
    pub origin: Vec2,
    /// Edge length of one cell in world units
    pub cell_size: f32,
    /// Row-major cell states
    pub cells: Vec<u8>,
}

impl Grid {
    /// Creates a fully walkable grid
    pub fn new(width: usize, height: usize, origin: Vec2, cell_size: f32) -> Self {
        Self {
            width,
            height,
            origin,
            cell_size,
            cells: vec![CELL_WALKABLE; width * height],
        }
    }

    /// Creates an empty 0x0 grid
    pub fn empty(cell_size: f32) -> Self {
        Self::new(0, 0, Vec2::ZERO, cell_size)
    }

    /// Parses an ASCII map. `#` and `X` are obstacles, `.` and spaces are walkable.
    ///
    /// The first non-blank line is the top row (largest Y), so the map reads
    /// the same way it is drawn.
    pub fn from_ascii(map: &str, cell_size: f32, origin: Vec2) -> Result<Self> {
        let rows: Vec<&str> = map
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.trim())
            .collect();

        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        let mut grid = Grid::new(width, height, origin, cell_size);

        for (row, line) in rows.iter().enumerate() {
            if line.chars().count() != width {
                return Err(Error::Rasterization(format!(
                    "map row {} has {} cells, expected {}",
                    row,
                    line.chars().count(),
                    width
                )));
            }
            let y = height - 1 - row;
            for (x, ch) in line.chars().enumerate() {
                let value = match ch {
                    '#' | 'X' => CELL_OBSTACLE,
                    '.' | ' ' => CELL_WALKABLE,
                    other => {
                        return Err(Error::Rasterization(format!(
                            "unexpected map character '{}' at row {}",
                            other, row
                        )))
                    }
                };
                grid.set(x, y, value);
            }
        }

        Ok(grid)
    }

    /// Index of a cell in the row-major array
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        let idx = self.index(x, y);
        self.cells[idx] = value;
    }

    /// Whether a cell is walkable; out-of-range cells are not
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.get(x as usize, y as usize) == CELL_WALKABLE
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of walkable cells
    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == CELL_WALKABLE).count()
    }

    /// Center of a cell in world space
    pub fn cell_center(&self, x: usize, y: usize) -> Vec2 {
        self.origin + (Vec2::new(x as f32, y as f32) + 0.5) * self.cell_size
    }

    /// Cell containing a world position
    pub fn world_to_cell(&self, point: Vec2) -> Option<(usize, usize)> {
        let local = (point - self.origin) / self.cell_size;
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let (x, y) = (local.x.floor() as usize, local.y.floor() as usize);
        (x < self.width && y < self.height).then_some((x, y))
    }

    /// Converts a point in cell-corner coordinates to world space
    #[inline]
    pub fn grid_to_world(&self, p: Vec2) -> Vec2 {
        self.origin + p * self.cell_size
    }

    /// World bounds covered by the grid
    pub fn bounds(&self) -> Aabb2 {
        Aabb2::new(
            self.origin,
            self.origin + Vec2::new(self.width as f32, self.height as f32) * self.cell_size,
        )
    }
}

/// Samples the obstacle source at every cell center and marks cells overlapped
/// by a static collider.
///
/// World bounds come from `config.bounds` when set, otherwise from the static
/// colliders matching the layer mask. With neither, a 0x0 grid is returned and
/// a warning recorded.
pub fn rasterize_obstacles<Q: ObstacleQuery + ?Sized>(
    ctx: &mut BuildContext,
    config: &NavMeshConfig,
    obstacles: &Q,
) -> Result<Grid> {
    ctx.start_timer(BakeStage::Rasterization);

    let bounds = match config.bounds.or_else(|| obstacles.static_bounds(config.layer_mask)) {
        Some(bounds) => bounds,
        None => {
            ctx.log_warning_with_category(
                "No static obstacles found to compute bake bounds; navmesh will be empty",
                "rasterization",
            );
            ctx.stop_timer(BakeStage::Rasterization);
            return Ok(Grid::empty(config.cell_size));
        }
    };

    let (width, height) = config.calculate_grid_size(&bounds);
    if width == 0 || height == 0 {
        ctx.log_warning_with_category(
            "Bake bounds have zero area; navmesh will be empty",
            "rasterization",
        );
        ctx.stop_timer(BakeStage::Rasterization);
        return Ok(Grid::empty(config.cell_size));
    }

    let mut grid = Grid::new(width, height, bounds.min, config.cell_size);
    let half = Vec2::splat(config.cell_size * 0.5);
    let mut blocked = 0usize;

    for y in 0..height {
        for x in 0..width {
            let center = grid.cell_center(x, y);
            let hits = obstacles.overlap_box(center, half, config.layer_mask);
            if hits.iter().any(|hit| hit.is_static) {
                grid.set(x, y, CELL_OBSTACLE);
                blocked += 1;
            }
        }
    }

    ctx.log_debug(format!(
        "Rasterized {}x{} grid, {} obstacle cells",
        width, height, blocked
    ));
    ctx.stop_timer(BakeStage::Rasterization);
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::ObstacleSet;

    #[test]
    fn test_from_ascii_top_row_is_highest_y() {
        let grid = Grid::from_ascii(
            "
            #..
            ...
            ",
            1.0,
            Vec2::ZERO,
        )
        .unwrap();
        assert_eq!(grid.width, 3);
        assert_eq!(grid.height, 2);
        assert_eq!(grid.get(0, 1), CELL_OBSTACLE);
        assert_eq!(grid.get(0, 0), CELL_WALKABLE);
        assert_eq!(grid.walkable_count(), 5);
    }

    #[test]
    fn test_from_ascii_rejects_ragged_rows() {
        assert!(Grid::from_ascii("...\n..", 1.0, Vec2::ZERO).is_err());
        assert!(Grid::from_ascii("..?", 1.0, Vec2::ZERO).is_err());
    }

    #[test]
    fn test_world_to_cell() {
        let grid = Grid::new(4, 4, Vec2::new(-2.0, -2.0), 1.0);
        assert_eq!(grid.world_to_cell(Vec2::new(-1.5, 1.5)), Some((0, 3)));
        assert_eq!(grid.world_to_cell(Vec2::new(2.5, 0.0)), None);
        assert_eq!(grid.cell_center(0, 0), Vec2::new(-1.5, -1.5));
    }

    #[test]
    fn test_rasterize_marks_overlapped_cells() {
        let config = NavMeshConfig {
            cell_size: 1.0,
            bounds: Some(Aabb2::new(Vec2::ZERO, Vec2::new(8.0, 8.0))),
            ..Default::default()
        };
        let mut small = ObstacleSet::new();
        small.add_box(Vec2::new(2.0, 2.0), Vec2::new(4.0, 3.0));

        let mut ctx = BuildContext::new();
        let grid = rasterize_obstacles(&mut ctx, &config, &small).unwrap();
        assert_eq!((grid.width, grid.height), (8, 8));
        assert_eq!(grid.get(2, 2), CELL_OBSTACLE);
        assert_eq!(grid.get(3, 2), CELL_OBSTACLE);
        assert_eq!(grid.get(4, 2), CELL_WALKABLE);
        assert_eq!(grid.get(2, 3), CELL_WALKABLE);
        assert_eq!(grid.walkable_count(), 62);


        small.add_box(Vec2::new(0.0, 0.0), Vec2::new(8.0, 8.0));
        let grid = rasterize_obstacles(&mut ctx, &config, &small).unwrap();
        assert_eq!(grid.walkable_count(), 0);
    }

    #[test]
    fn test_rasterize_without_obstacles_warns() {
        let config = NavMeshConfig::default();
        let mut ctx = BuildContext::new();
        let grid = rasterize_obstacles(&mut ctx, &config, &ObstacleSet::new()).unwrap();
        assert!(grid.is_empty());
        assert_eq!(ctx.warnings().len(), 1);
    }

    #[test]
    fn test_rasterize_dynamic_colliders_are_ignored() {
        use crate::obstacles::{Collider, ColliderShape};

        let mut obstacles = ObstacleSet::new();
        obstacles.add(Collider {
            shape: ColliderShape::Box(Aabb2::new(Vec2::ZERO, Vec2::splat(2.0))),
            layer: 1,
            is_static: false,
        });
        let config = NavMeshConfig {
            cell_size: 1.0,
            bounds: Some(Aabb2::new(Vec2::ZERO, Vec2::splat(2.0))),
            ..Default::default()
        };
        let mut ctx = BuildContext::new();
        let grid = rasterize_obstacles(&mut ctx, &config, &obstacles).unwrap();
        assert_eq!(grid.walkable_count(), 4);
    }
}
