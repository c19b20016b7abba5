//! Agent radius inflation
//!
//! Grows every original obstacle cell by the agent radius measured in cells,
//! using a square (Chebyshev) neighborhood. The result is a grid-resolution
//! approximation of the Minkowski sum of obstacles and agent footprint.

use crate::context::{BakeStage, BuildContext};
use crate::rasterization::{Grid, CELL_INFLATED, CELL_OBSTACLE, CELL_WALKABLE};

/// Marks walkable cells within `radius_cells` of an original obstacle as inflated.
///
/// Returns the number of cells that changed. Only cells marked
/// [`CELL_OBSTACLE`] act as seeds, so inflation never cascades.
pub fn inflate_obstacles(ctx: &mut BuildContext, grid: &mut Grid, radius_cells: usize) -> usize {
    if radius_cells == 0 || grid.is_empty() {
        return 0;
    }

    ctx.start_timer(BakeStage::Inflation);

    let w = grid.width as i64;
    let h = grid.height as i64;
    let r = radius_cells as i64;
    let mut changed = 0;

    for y in 0..h {
        for x in 0..w {
            if grid.get(x as usize, y as usize) != CELL_OBSTACLE {
                continue;
            }

            let (x0, x1) = ((x - r).max(0), (x + r).min(w - 1));
            let (y0, y1) = ((y - r).max(0), (y + r).min(h - 1));
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let idx = grid.index(nx as usize, ny as usize);
                    if grid.cells[idx] == CELL_WALKABLE {
                        grid.cells[idx] = CELL_INFLATED;
                        changed += 1;
                    }
                }
            }
        }
    }

    ctx.log_debug(format!(
        "Inflated obstacles by {} cells, {} cells blocked",
        radius_cells, changed
    ));
    ctx.stop_timer(BakeStage::Inflation);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_inflation_uses_square_neighborhood() {
        let mut grid = Grid::new(7, 7, Vec2::ZERO, 1.0);
        grid.set(3, 3, CELL_OBSTACLE);

        let mut ctx = BuildContext::new();
        let changed = inflate_obstacles(&mut ctx, &mut grid, 1);
        assert_eq!(changed, 8);
        assert_eq!(grid.get(2, 2), CELL_INFLATED);
        assert_eq!(grid.get(4, 4), CELL_INFLATED);
        assert_eq!(grid.get(3, 3), CELL_OBSTACLE);
        assert_eq!(grid.get(1, 3), CELL_WALKABLE);
    }

    #[test]
    fn test_inflation_does_not_cascade() {
        let mut grid = Grid::new(9, 1, Vec2::ZERO, 1.0);
        grid.set(0, 0, CELL_OBSTACLE);

        let mut ctx = BuildContext::new();
        inflate_obstacles(&mut ctx, &mut grid, 2);
        assert_eq!(grid.get(2, 0), CELL_INFLATED);
        assert_eq!(grid.get(3, 0), CELL_WALKABLE);
    }

    #[test]
    fn test_inflation_clamps_to_grid() {
        let mut grid = Grid::new(3, 3, Vec2::ZERO, 1.0);
        grid.set(0, 0, CELL_OBSTACLE);

        let mut ctx = BuildContext::new();
        assert_eq!(inflate_obstacles(&mut ctx, &mut grid, 5), 8);
        assert_eq!(grid.walkable_count(), 0);
    }

    #[test]
    fn test_zero_radius_is_noop() {
        let mut grid = Grid::new(3, 3, Vec2::ZERO, 1.0);
        grid.set(1, 1, CELL_OBSTACLE);
        let mut ctx = BuildContext::new();
        assert_eq!(inflate_obstacles(&mut ctx, &mut grid, 0), 0);
        assert_eq!(grid.walkable_count(), 8);
    }
}
