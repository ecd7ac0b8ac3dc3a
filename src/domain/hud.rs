use glam::Vec3;
use std::fmt;

use crate::domain::collision::CollisionWorld;
use crate::state::entities::{Arena, Enemy, EnemyId};
use crate::utils::config::Tuning;

/// Colour band for health bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBand {
    High,
    Medium,
    Low,
}

impl HealthBand {
    pub fn from_pct(pct: f32) -> Self {
        if pct < 30.0 {
            HealthBand::Low
        } else if pct < 60.0 {
            HealthBand::Medium
        } else {
            HealthBand::High
        }
    }

    pub fn from_health(health: u32, max: u32) -> Self {
        if max == 0 {
            return HealthBand::Low;
        }
        Self::from_pct(health as f32 / max as f32 * 100.0)
    }
}

/// `current/max` ammo readout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmmoReadout {
    pub current: u32,
    pub max: u32,
}

impl fmt::Display for AmmoReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.max)
    }
}

/// Floating health indicator for one enemy. `anchor` is the world position
/// the presentation layer projects to screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyIndicator {
    pub id: EnemyId,
    pub health_pct: f32,
    pub band: HealthBand,
    pub anchor: Vec3,
    pub visible: bool,
}

/// Indicator state for every live enemy as seen from `viewer`.
/// Hidden when a wall sits between viewer and enemy, when the enemy is
/// behind the viewer, or when it is beyond the indicator range.
pub fn enemy_indicators(
    enemies: &Arena<Enemy>,
    world: &CollisionWorld,
    viewer: Vec3,
    facing: Vec3,
    tuning: &Tuning,
) -> Vec<EnemyIndicator> {
    enemies
        .values()
        .map(|enemy| {
            let offset = enemy.position - viewer;
            let visible = !world.is_occluded(viewer, enemy.position, tuning.occlusion_margin)
                && offset.dot(facing) > 0.0
                && offset.length() <= tuning.indicator_max_distance;
            let health_pct = enemy.health_pct();
            EnemyIndicator {
                id: enemy.id,
                health_pct,
                band: HealthBand::from_pct(health_pct),
                anchor: enemy.position,
                visible,
            }
        })
        .collect()
}
