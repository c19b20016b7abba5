//! Bounded constrained Delaunay refinement by edge flipping

use std::collections::HashMap;

use navgrid_common::{in_circle, tri_area_2d};

use crate::context::{BakeStage, BuildContext};
use crate::triangulation::{edge_key, Triangulation};

const AREA_EPSILON: f32 = 1e-6;

/// Flips interior edges whose opposite vertex lies inside the neighbor's
/// circumcircle by more than `tolerance` (in-circle determinant, grid units).
///
/// Runs at most `max_iterations` sweeps; each sweep touches a triangle at most
/// once. Constrained edges are never flipped. Returns the number of flips.
pub fn refine_delaunay(
    ctx: &mut BuildContext,
    mesh: &mut Triangulation,
    max_iterations: usize,
    tolerance: f32,
) -> usize {
    ctx.start_timer(BakeStage::Delaunay);

    let mut total = 0;
    let mut sweeps = 0;
    while sweeps < max_iterations {
        sweeps += 1;
        let flips = flip_sweep(mesh, tolerance);
        total += flips;
        if flips == 0 {
            break;
        }
    }

    ctx.log_debug(format!(
        "Delaunay refinement: {} flips in {} sweeps",
        total, sweeps
    ));
    ctx.stop_timer(BakeStage::Delaunay);
    total
}

fn flip_sweep(mesh: &mut Triangulation, tolerance: f32) -> usize {
    let mut edges: HashMap<(u32, u32), Vec<(usize, usize)>> = HashMap::new();
    for (t, tri) in mesh.triangles.iter().enumerate() {
        for e in 0..3 {
            edges
                .entry(edge_key(tri[e], tri[(e + 1) % 3]))
                .or_default()
                .push((t, e));
        }
    }

    let mut keys: Vec<(u32, u32)> = edges
        .iter()
        .filter(|(key, sides)| sides.len() == 2 && !mesh.constrained.contains(key))
        .map(|(key, _)| *key)
        .collect();
    keys.sort_unstable();

    let mut dirty = vec![false; mesh.triangles.len()];
    let mut flips = 0;

    for key in keys {
        let (t1, e1) = edges[&key][0];
        let (t2, e2) = edges[&key][1];
        if dirty[t1] || dirty[t2] {
            continue;
        }

        let tri1 = mesh.triangles[t1];
        let tri2 = mesh.triangles[t2];
        let (a, b, c) = (tri1[e1], tri1[(e1 + 1) % 3], tri1[(e1 + 2) % 3]);
        let d = tri2[(e2 + 2) % 3];
        if tri2[e2] != b || tri2[(e2 + 1) % 3] != a {
            // Inconsistent winding between the two sides
            continue;
        }

        let p = |v: u32| mesh.vertices[v as usize];
        if in_circle(p(a), p(b), p(c), p(d)) <= tolerance {
            continue;
        }

        let new1 = [a, d, c];
        let new2 = [d, b, c];
        if tri_area_2d(p(new1[0]), p(new1[1]), p(new1[2])) <= AREA_EPSILON
            || tri_area_2d(p(new2[0]), p(new2[1]), p(new2[2])) <= AREA_EPSILON
        {
            continue;
        }

        mesh.triangles[t1] = new1;
        mesh.triangles[t2] = new2;
        dirty[t1] = true;
        dirty[t2] = true;
        flips += 1;
    }

    flips
}
