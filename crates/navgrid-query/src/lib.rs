//! Queries over a baked navgrid navigation mesh
//!
//! [`NavMesh`] holds the result of a bake. [`NavMeshQuery`] resolves points
//! onto it, plans polygon corridors with a best-first search, tightens them
//! with a funnel and walks rays across polygon edges.

mod funnel;
mod nav_mesh;
mod nav_mesh_query;
mod pathfinding;
mod quadtree;
mod raycast;
mod status;


pub use funnel::{corridor_portals, string_pull};
pub use nav_mesh::{NavMesh, Region};
pub use nav_mesh_query::{NavMeshQuery, PointOnMesh};
pub use pathfinding::find_polygon_path;
pub use quadtree::{aabb_overlaps_convex, NearestPolygon, QuadTree};
pub use raycast::{intersect_segment_poly, raycast_mesh, RaycastHit};
pub use status::{NavPath, PathStatus};
