//! Configuration for the navgrid bake process

use navgrid_common::{Aabb2, Error, Result};

/// Polyline simplification applied to traced contours
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum SimplificationMode {
    /// Contours pass through unchanged
    None,
    /// Ramer-Douglas-Peucker with an epsilon of one cell
    #[default]
    DouglasPeucker,
    /// Greedy vertex removal while the local deviation stays below `max_distance` (world units)
    Decimation { max_distance: f32 },
}

/// Cost model used by the polygon graph search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum PathMode {
    /// Edge cost and heuristic measured between polygon centroids
    #[default]
    PolygonCenter,
    /// Edge cost accumulated between shared-edge midpoints
    MidEdge,
}

/// Configuration parameters for navigation mesh baking
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NavMeshConfig {
    /// The width/depth resolution of the grid (cell size)
    pub cell_size: f32,
    /// Radius of the agent, used to grow obstacles
    pub agent_radius: f32,
    /// Collision layers considered obstacles
    pub layer_mask: u32,
    /// Explicit world bounds; `None` encapsulates every matching static obstacle
    pub bounds: Option<Aabb2>,
    /// Round grid dimensions up to the next power of two instead of the next even number
    pub power_of_two_grid: bool,
    /// Maximum number of regions the labeler may assign
    pub max_regions: u16,
    /// Contour simplification algorithm
    pub simplification: SimplificationMode,
    /// Upper bound on Delaunay refinement sweeps
    pub delaunay_max_iterations: usize,
    /// In-circle determinant (in cell units) an edge must exceed before it is flipped
    pub delaunay_flip_tolerance: f32,
    /// Depth of the per-region quadtree
    pub quadtree_depth: u32,
    /// Cost model used when planning paths
    pub path_mode: PathMode,
    /// Whether planned paths are string-pulled through their portals
    pub use_funnel: bool,
}

impl Default for NavMeshConfig {
    fn default() -> Self {
        Self {
            cell_size: 0.5,
            agent_radius: 0.5,
            layer_mask: u32::MAX,
            bounds: None,
            power_of_two_grid: false,
            max_regions: 255,
            simplification: SimplificationMode::default(),
            delaunay_max_iterations: 500,
            delaunay_flip_tolerance: 1.0,
            quadtree_depth: 3,
            path_mode: PathMode::default(),
            use_funnel: true,
        }
    }
}

impl NavMeshConfig {
    /// Creates a new NavMeshConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells the agent radius covers, rounded up
    pub fn agent_radius_cells(&self) -> usize {
        (self.agent_radius / self.cell_size).ceil().max(0.0) as usize
    }

    /// Calculates the grid size covering the given bounds
    pub fn calculate_grid_size(&self, bounds: &Aabb2) -> (usize, usize) {
        let size = bounds.size() / self.cell_size;
        let round = |v: f32| {
            let n = v.ceil().max(0.0) as usize;
            if n == 0 {
                0
            } else if self.power_of_two_grid {
                n.next_power_of_two()
            } else {
                n + n % 2
            }
        };
        (round(size.x), round(size.y))
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.cell_size <= 0.0 || !self.cell_size.is_finite() {
            return Err(Error::InvalidConfig("Invalid cell size".to_string()));
        }

        if self.agent_radius < 0.0 || !self.agent_radius.is_finite() {
            return Err(Error::InvalidConfig("Invalid agent radius".to_string()));
        }

        if self.max_regions == 0 || self.max_regions == u16::MAX {
            return Err(Error::InvalidConfig(format!(
                "Region capacity must be within 1..={}",
                u16::MAX - 1
            )));
        }

        if self.quadtree_depth > 8 {
            return Err(Error::InvalidConfig("Quadtree depth too large".to_string()));
        }

        if self.delaunay_flip_tolerance < 0.0 {
            return Err(Error::InvalidConfig(
                "Negative Delaunay flip tolerance".to_string(),
            ));
        }

        if let SimplificationMode::Decimation { max_distance } = self.simplification {
            if max_distance < 0.0 {
                return Err(Error::InvalidConfig(
                    "Negative decimation distance".to_string(),
                ));
            }
        }

        if let Some(bounds) = &self.bounds {
            if !bounds.is_valid() {
                return Err(Error::InvalidConfig("Invalid world bounds".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_default_config_is_valid() {
        let config = NavMeshConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_regions, 255);
        assert_eq!(config.delaunay_max_iterations, 500);
        assert_eq!(config.quadtree_depth, 3);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = NavMeshConfig {
            cell_size: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = NavMeshConfig {
            agent_radius: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = NavMeshConfig {
            simplification: SimplificationMode::Decimation { max_distance: -0.5 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_grid_size_is_forced_even() {
        let config = NavMeshConfig {
            cell_size: 1.0,
            ..Default::default()
        };
        let bounds = Aabb2::new(Vec2::ZERO, Vec2::new(9.2, 4.0));
        assert_eq!(config.calculate_grid_size(&bounds), (10, 4));

        let bounds = Aabb2::new(Vec2::ZERO, Vec2::new(7.0, 3.0));
        assert_eq!(config.calculate_grid_size(&bounds), (8, 4));
    }

    #[test]
    fn test_grid_size_power_of_two() {
        let config = NavMeshConfig {
            cell_size: 1.0,
            power_of_two_grid: true,
            ..Default::default()
        };
        let bounds = Aabb2::new(Vec2::ZERO, Vec2::new(9.0, 3.0));
        assert_eq!(config.calculate_grid_size(&bounds), (16, 4));
    }

    #[test]
    fn test_agent_radius_cells() {
        let config = NavMeshConfig {
            cell_size: 0.5,
            agent_radius: 0.6,
            ..Default::default()
        };
        assert_eq!(config.agent_radius_cells(), 2);

        let config = NavMeshConfig {
            agent_radius: 0.0,
            ..Default::default()
        };
        assert_eq!(config.agent_radius_cells(), 0);
    }
}
