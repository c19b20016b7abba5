//! Obstacle sources consumed by the rasterizer
//!
//! The bake does not own a physics world. It asks an [`ObstacleQuery`] for the
//! bounds of all static colliders and for the colliders overlapping each grid
//! cell. [`ObstacleSet`] is a self-contained implementation over simple shapes.

use glam::Vec2;
use navgrid_common::Aabb2;

/// A collider reported by an overlap query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColliderHit {
    /// Identifier of the collider within its source
    pub id: usize,
    /// Whether the collider never moves
    pub is_static: bool,
}

/// Scene and physics capabilities needed to rasterize obstacles
pub trait ObstacleQuery {
    /// Bounds encapsulating every static collider on a layer in `mask`
    fn static_bounds(&self, mask: u32) -> Option<Aabb2>;

    /// Colliders on a layer in `mask` overlapping the box
    fn overlap_box(&self, center: Vec2, half_extents: Vec2, mask: u32) -> Vec<ColliderHit>;
}

/// Collider geometry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum ColliderShape {
    /// Axis-aligned box
    Box(Aabb2),
    /// Circle
    Circle { center: Vec2, radius: f32 },
}

impl ColliderShape {
    /// Bounding box of the shape
    pub fn bounds(&self) -> Aabb2 {
        match *self {
            ColliderShape::Box(aabb) => aabb,
            ColliderShape::Circle { center, radius } => {
                Aabb2::from_center_half_extents(center, Vec2::splat(radius))
            }
        }
    }

    /// Whether the shape and the box share interior area
    pub fn overlaps_box(&self, query: &Aabb2) -> bool {
        match *self {
            ColliderShape::Box(aabb) => {
                aabb.min.x < query.max.x
                    && aabb.max.x > query.min.x
                    && aabb.min.y < query.max.y
                    && aabb.max.y > query.min.y
            }
            ColliderShape::Circle { center, radius } => {
                query.distance_to_point(center) < radius
            }
        }
    }
}

/// A collider with its filtering attributes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Layer bit the collider lives on
    pub layer: u32,
    pub is_static: bool,
}

/// In-memory obstacle collection
#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ObstacleSet {
    colliders: Vec<Collider>,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collider and returns its id
    pub fn add(&mut self, collider: Collider) -> usize {
        self.colliders.push(collider);
        self.colliders.len() - 1
    }

    /// Adds a static box on layer 1
    pub fn add_box(&mut self, min: Vec2, max: Vec2) -> usize {
        self.add(Collider {
            shape: ColliderShape::Box(Aabb2::new(min, max)),
            layer: 1,
            is_static: true,
        })
    }

    /// Adds a static circle on layer 1
    pub fn add_circle(&mut self, center: Vec2, radius: f32) -> usize {
        self.add(Collider {
            shape: ColliderShape::Circle { center, radius },
            layer: 1,
            is_static: true,
        })
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl ObstacleQuery for ObstacleSet {
    fn static_bounds(&self, mask: u32) -> Option<Aabb2> {
        let mut bounds: Option<Aabb2> = None;
        for collider in self
            .colliders
            .iter()
            .filter(|c| c.is_static && c.layer & mask != 0)
        {
            let shape_bounds = collider.shape.bounds();
            match bounds.as_mut() {
                Some(b) => b.expand(&shape_bounds),
                None => bounds = Some(shape_bounds),
            }
        }
        bounds
    }

    fn overlap_box(&self, center: Vec2, half_extents: Vec2, mask: u32) -> Vec<ColliderHit> {
        let query = Aabb2::from_center_half_extents(center, half_extents);
        self.colliders
            .iter()
            .enumerate()
            .filter(|(_, c)| c.layer & mask != 0 && c.shape.overlaps_box(&query))
            .map(|(id, c)| ColliderHit {
                id,
                is_static: c.is_static,
            })
            .collect()
    }
}
