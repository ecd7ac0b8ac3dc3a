//! Ray-vs-box queries against the static wall obstacles of a maze.
//!
//! Every query is a ray cast: an obstacle blocks when the nearest
//! intersection along the ray is strictly closer than the distance asked
//! about. Used for player/enemy wall constraints, health-indicator
//! occlusion and bullet path checks.

use glam::{Quat, Vec3};

use crate::domain::maze::MazeGrid;

/// Unrotated probe directions for the 4-way movement check
pub const CARDINAL_DIRECTIONS: [Vec3; 4] = [Vec3::NEG_Z, Vec3::Z, Vec3::NEG_X, Vec3::X];

/// Axis-aligned box obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

/// Nearest obstacle hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub obstacle: usize,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Distance along a unit ray to the box (slab method).
    /// A ray starting inside the box hits it at distance 0.
    pub fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < f32::EPSILON {
                // Parallel to this slab: must already be between its planes
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

/// Static obstacle set for one session
#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    obstacles: Vec<Aabb>,
}

impl CollisionWorld {
    pub fn new(obstacles: Vec<Aabb>) -> Self {
        Self { obstacles }
    }

    /// One box per wall cell
    pub fn from_maze(grid: &MazeGrid, cell_size: f32) -> Self {
        Self::new(grid.wall_boxes(cell_size))
    }

    pub fn obstacles(&self) -> &[Aabb] {
        &self.obstacles
    }

    /// Nearest obstacle strictly closer than `max_distance`
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }

        self.obstacles
            .iter()
            .enumerate()
            .filter_map(|(obstacle, aabb)| {
                aabb.ray_distance(origin, direction)
                    .filter(|distance| *distance < max_distance)
                    .map(|distance| RayHit { distance, obstacle })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    pub fn is_blocked(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> bool {
        self.raycast(origin, direction, max_distance).is_some()
    }

    /// 4-way probe used for movement: any blocked direction within `radius`
    pub fn probe_cardinal(&self, origin: Vec3, rotation: Quat, radius: f32) -> bool {
        CARDINAL_DIRECTIONS
            .iter()
            .any(|dir| self.is_blocked(origin, rotation * *dir, radius))
    }

    /// Occlusion test from a viewer to a target, stopping `margin` short of the target
    pub fn is_occluded(&self, viewer: Vec3, target: Vec3, margin: f32) -> bool {
        let to_target = target - viewer;
        let reach = to_target.length() - margin;
        reach > 0.0 && self.is_blocked(viewer, to_target, reach)
    }

    /// Path integrity over a travelled segment, padded past its end
    pub fn segment_blocked(&self, from: Vec3, to: Vec3, padding: f32) -> bool {
        let travel = to - from;
        self.is_blocked(from, travel, travel.length() + padding)
    }
}
