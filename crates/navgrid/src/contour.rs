//! Boundary tracing of labeled regions
//!
//! Every cell side that separates a region from anything else becomes a
//! directed edge with the region on its left. Following edges corner to corner
//! yields closed loops: the loop enclosing the largest area is the outer
//! boundary, every other loop is a hole.
//!
//! Loop vertices are cell corners in grid coordinates; straight runs of cell
//! sides are collapsed to their end points.

use std::collections::BTreeMap;

use glam::Vec2;
use navgrid_common::{polygon_signed_area, tri_area_2d, Error, Result};

use crate::context::{BakeStage, BuildContext};
use crate::regions::RegionMap;

/// Ordered sequence of 2D points
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Polyline {
    pub points: Vec<Vec2>,
    /// Whether the last point connects back to the first
    pub closed: bool,
}

impl Polyline {
    /// Creates a closed polyline
    pub fn closed(points: Vec<Vec2>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signed area, positive when counter-clockwise
    pub fn signed_area(&self) -> f32 {
        polygon_signed_area(&self.points)
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Reverses the winding if the polyline is clockwise
    pub fn force_ccw(&mut self) {
        if self.signed_area() < 0.0 {
            self.points.reverse();
        }
    }

    /// Reverses the winding if the polyline is counter-clockwise
    pub fn force_cw(&mut self) {
        if self.signed_area() > 0.0 {
            self.points.reverse();
        }
    }

    /// Removes consecutive exactly equal points, including across the seam of a closed polyline
    pub fn remove_duplicates(&mut self) {
        self.points.dedup();
        if self.closed {
            while self.points.len() > 1 && self.points.first() == self.points.last() {
                self.points.pop();
            }
        }
    }

    /// Applies `f` to every point
    pub fn map_points(&self, f: impl Fn(Vec2) -> Vec2) -> Polyline {
        Polyline {
            points: self.points.iter().map(|&p| f(p)).collect(),
            closed: self.closed,
        }
    }
}

/// Traced boundary of one region
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionContours {
    /// Counter-clockwise outer boundary, `None` for a region without cells
    pub outer: Option<Polyline>,
    /// Clockwise hole boundaries
    pub holes: Vec<Polyline>,
}

type Corner = (i32, i32);

/// Traces the boundary loops of every region in the map
pub fn trace_contours(ctx: &mut BuildContext, map: &RegionMap) -> Result<Vec<RegionContours>> {
    ctx.start_timer(BakeStage::Contours);

    let mut edges: Vec<BTreeMap<Corner, Vec<Corner>>> = vec![BTreeMap::new(); map.region_count()];

    for y in 0..map.height as i32 {
        for x in 0..map.width as i32 {
            let Some(label) = map.label(x, y) else {
                continue;
            };
            let region_edges = &mut edges[label as usize];
            let mut push = |from: Corner, to: Corner| region_edges.entry(from).or_default().push(to);

            if map.label(x, y - 1) != Some(label) {
                push((x, y), (x + 1, y));
            }
            if map.label(x + 1, y) != Some(label) {
                push((x + 1, y), (x + 1, y + 1));
            }
            if map.label(x, y + 1) != Some(label) {
                push((x + 1, y + 1), (x, y + 1));
            }
            if map.label(x - 1, y) != Some(label) {
                push((x, y + 1), (x, y));
            }
        }
    }

    let mut result = Vec::with_capacity(edges.len());
    for (label, region_edges) in edges.into_iter().enumerate() {
        let loops = extract_loops(region_edges).map_err(|e| match e {
            Error::Contour(msg) => Error::Contour(format!("region {}: {}", label, msg)),
            other => other,
        })?;
        result.push(classify_loops(loops));
    }

    let loop_count: usize = result
        .iter()
        .map(|r| r.holes.len() + usize::from(r.outer.is_some()))
        .sum();
    ctx.log_debug(format!(
        "Traced {} boundary loops over {} regions",
        loop_count,
        result.len()
    ));
    ctx.stop_timer(BakeStage::Contours);
    Ok(result)
}

/// Chains directed edges into closed loops
fn extract_loops(mut edges: BTreeMap<Corner, Vec<Corner>>) -> Result<Vec<Vec<Corner>>> {
    let mut loops = Vec::new();

    loop {
        let Some(start) = edges.keys().next().copied() else {
            break;
        };
        let mut corners = vec![start];
        let mut prev = start;
        let mut current = take_edge(&mut edges, start, None)?;

        while current != start {
            corners.push(current);
            let incoming = (current.0 - prev.0, current.1 - prev.1);
            let next = take_edge(&mut edges, current, Some(incoming))?;
            prev = current;
            current = next;
        }

        loops.push(corners);
    }

    Ok(loops)
}

/// Removes and returns one outgoing edge of `from`.
///
/// At corners where two cells of the region touch diagonally there are two
/// outgoing edges; the left turn is taken so each loop keeps hugging the cell
/// it arrived along.
fn take_edge(
    edges: &mut BTreeMap<Corner, Vec<Corner>>,
    from: Corner,
    incoming: Option<(i32, i32)>,
) -> Result<Corner> {
    let outgoing = edges
        .get_mut(&from)
        .ok_or_else(|| Error::Contour(format!("open boundary at corner {:?}", from)))?;

    let pick = match incoming {
        Some((dx, dy)) if outgoing.len() > 1 => {
            let rank = |to: &Corner| {
                let (ox, oy) = (to.0 - from.0, to.1 - from.1);
                let cross = dx * oy - dy * ox;
                if cross > 0 {
                    0
                } else if cross == 0 {
                    1
                } else {
                    2
                }
            };
            (0..outgoing.len())
                .min_by_key(|&i| rank(&outgoing[i]))
                .unwrap_or(0)
        }
        _ => 0,
    };

    let to = outgoing.remove(pick);
    if outgoing.is_empty() {
        edges.remove(&from);
    }
    Ok(to)
}

/// Picks the largest loop as the outer boundary and winds it counter-clockwise;
/// the rest become clockwise holes.
fn classify_loops(loops: Vec<Vec<Corner>>) -> RegionContours {
    let mut polylines: Vec<Polyline> = loops
        .into_iter()
        .map(|corners| Polyline::closed(collapse_straight_runs(&corners)))
        .filter(|p| p.len() >= 3)
        .collect();

    if polylines.is_empty() {
        return RegionContours::default();
    }

    let outer_index = polylines
        .iter()
        .enumerate()
        .max_by(|a, b| {
            a.1.signed_area()
                .abs()
                .total_cmp(&b.1.signed_area().abs())
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut outer = polylines.swap_remove(outer_index);
    outer.force_ccw();
    for hole in &mut polylines {
        hole.force_cw();
    }

    RegionContours {
        outer: Some(outer),
        holes: polylines,
    }
}

/// Keeps only corners where the boundary changes direction
fn collapse_straight_runs(corners: &[Corner]) -> Vec<Vec2> {
    let n = corners.len();
    let points: Vec<Vec2> = corners
        .iter()
        .map(|&(x, y)| Vec2::new(x as f32, y as f32))
        .collect();

    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            tri_area_2d(prev, points[i], next) != 0.0
        })
        .map(|i| points[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterization::Grid;
    use crate::regions::label_regions;

    fn contours(map: &str) -> Vec<RegionContours> {
        let grid = Grid::from_ascii(map, 1.0, Vec2::ZERO).unwrap();
        let mut ctx = BuildContext::new();
        let regions = label_regions(&mut ctx, &grid, 255);
        trace_contours(&mut ctx, &regions).unwrap()
    }

    #[test]
    fn test_open_square_has_four_corner_outline() {
        let result = contours(&"..........\n".repeat(10));
        assert_eq!(result.len(), 1);

        let outer = result[0].outer.as_ref().unwrap();
        assert_eq!(outer.len(), 4);
        assert!(outer.is_ccw());
        assert_eq!(outer.signed_area(), 100.0);
        assert!(outer.points.contains(&Vec2::new(10.0, 10.0)));
        assert!(result[0].holes.is_empty());
    }

    #[test]
    fn test_interior_obstacle_becomes_clockwise_hole() {
        let result = contours(
            "
            .....
            .....
            ..#..
            .....
            .....
            ",
        );
        assert_eq!(result.len(), 1);
        let region = &result[0];
        assert!(region.outer.as_ref().unwrap().is_ccw());
        assert_eq!(region.holes.len(), 1);

        let hole = &region.holes[0];
        assert_eq!(hole.len(), 4);
        assert!(!hole.is_ccw());
        assert_eq!(hole.signed_area(), -1.0);
    }

    #[test]
    fn test_l_shape_outline() {
        let result = contours(
            "
            ..##
            ..##
            ....
            ",
        );
        let outer = result[0].outer.as_ref().unwrap();
        assert_eq!(outer.len(), 6);
        assert_eq!(outer.signed_area(), 8.0);
    }

    #[test]
    fn test_diagonal_pinch_keeps_loops_closed() {
        let result = contours(
            "
            ....
            .#..
            ..#.
            ....
            ",
        );
        assert_eq!(result.len(), 1);
        let region = &result[0];
        let outer = region.outer.as_ref().unwrap();
        assert_eq!(outer.signed_area(), 16.0);
        let hole_area: f32 = region.holes.iter().map(|h| h.signed_area()).sum();
        assert_eq!(hole_area, -2.0);
    }

    #[test]
    fn test_each_region_traced() {
        let result = contours(
            "
            ..#..
            ..#..
            ",
        );
        assert_eq!(result.len(), 2);
        for region in &result {
            assert_eq!(region.outer.as_ref().unwrap().signed_area(), 4.0);
        }
    }

    #[test]
    fn test_polyline_remove_duplicates() {
        let mut line = Polyline::closed(vec![
            Vec2::ZERO,
            Vec2::ZERO,
            Vec2::X,
            Vec2::ONE,
            Vec2::ZERO,
        ]);
        line.remove_duplicates();
        assert_eq!(line.points, vec![Vec2::ZERO, Vec2::X, Vec2::ONE]);
    }
}
