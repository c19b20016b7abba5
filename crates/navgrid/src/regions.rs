//! Region labeling by 4-connected flood fill

use std::collections::VecDeque;

use crate::context::{BakeStage, BuildContext};
use crate::rasterization::Grid;

/// Label of cells that belong to no region
pub const UNASSIGNED: u16 = u16::MAX;

/// Region label per grid cell
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RegionMap {
    pub width: usize,
    pub height: usize,
    /// Row-major labels parallel to the grid cells
    pub labels: Vec<u16>,
    /// Cell count of each assigned region, indexed by label
    pub cell_counts: Vec<usize>,
    /// Set when labeling stopped early because the capacity was reached
    pub truncated: bool,
}

impl RegionMap {
    /// Number of regions assigned
    pub fn region_count(&self) -> usize {
        self.cell_counts.len()
    }

    /// Label at a cell, `None` when unassigned or out of range
    pub fn label(&self, x: i32, y: i32) -> Option<u16> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let label = self.labels[y as usize * self.width + x as usize];
        (label != UNASSIGNED).then_some(label)
    }
}

/// Partitions walkable cells into 4-connected regions.
///
/// Cells are scanned in row-major order and each unlabeled walkable cell seeds
/// a breadth-first fill with the next label, so the result depends only on the
/// grid. When `max_regions` labels are in use and another seed is found,
/// labeling stops with a warning and the remaining cells stay unassigned.
pub fn label_regions(ctx: &mut BuildContext, grid: &Grid, max_regions: u16) -> RegionMap {
    ctx.start_timer(BakeStage::Regions);

    let (w, h) = (grid.width, grid.height);
    let mut map = RegionMap {
        width: w,
        height: h,
        labels: vec![UNASSIGNED; w * h],
        cell_counts: Vec::new(),
        truncated: false,
    };
    let mut queue = VecDeque::new();

    'scan: for y in 0..h {
        for x in 0..w {
            let idx = grid.index(x, y);
            if !grid.is_walkable(x as i32, y as i32) || map.labels[idx] != UNASSIGNED {
                continue;
            }

            if map.cell_counts.len() >= max_regions as usize {
                ctx.log_warning_with_category(
                    format!(
                        "Region count exceeds capacity of {}; remaining cells left unassigned",
                        max_regions
                    ),
                    "regions",
                );
                map.truncated = true;
                break 'scan;
            }

            let label = map.cell_counts.len() as u16;
            let mut count = 0;
            map.labels[idx] = label;
            queue.push_back((x as i32, y as i32));

            while let Some((cx, cy)) = queue.pop_front() {
                count += 1;
                for (dx, dy) in [(1, 0), (0, 1), (-1, 0), (0, -1)] {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if !grid.is_walkable(nx, ny) {
                        continue;
                    }
                    let nidx = grid.index(nx as usize, ny as usize);
                    if map.labels[nidx] == UNASSIGNED {
                        map.labels[nidx] = label;
                        queue.push_back((nx, ny));
                    }
                }
            }

            map.cell_counts.push(count);
        }
    }

    ctx.log_debug(format!("Labeled {} regions", map.region_count()));
    ctx.stop_timer(BakeStage::Regions);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn grid(map: &str) -> Grid {
        Grid::from_ascii(map, 1.0, Vec2::ZERO).unwrap()
    }

    #[test]
    fn test_obstacle_band_splits_regions() {
        let g = grid(
            "
            ...#...
            ...#...
            ...#...
            ",
        );
        let mut ctx = BuildContext::new();
        let map = label_regions(&mut ctx, &g, 255);
        assert_eq!(map.region_count(), 2);
        assert_eq!(map.cell_counts, vec![9, 9]);
        assert_eq!(map.label(0, 0), Some(0));
        assert_eq!(map.label(6, 2), Some(1));
        assert_eq!(map.label(3, 1), None);
    }

    #[test]
    fn test_diagonal_cells_are_separate() {
        let g = grid(
            "
            #.
            .#
            ",
        );
        let mut ctx = BuildContext::new();
        let map = label_regions(&mut ctx, &g, 255);
        assert_eq!(map.region_count(), 2);
    }

    #[test]
    fn test_labeling_is_deterministic() {
        let g = grid(
            "
            ..#..#..
            ..#.....
            ####.###
            ........
            ",
        );
        let mut ctx = BuildContext::new();
        let a = label_regions(&mut ctx, &g, 255);
        let b = label_regions(&mut ctx, &g, 255);
        assert_eq!(a, b);
    }

    #[test]
    fn test_capacity_overflow_warns_and_stops() {
        let g = grid(".#.#.#.");
        let mut ctx = BuildContext::new();
        let map = label_regions(&mut ctx, &g, 2);
        assert_eq!(map.region_count(), 2);
        assert!(map.truncated);
        assert_eq!(map.label(4, 0), None);
        assert_eq!(ctx.warnings().len(), 1);
    }
}
