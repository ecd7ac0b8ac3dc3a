use glam::{EulerRot, Quat, Vec3};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::state::room::{ParticipantId, PlayerSnapshot};
use crate::utils::config::Tuning;

pub type EnemyId = u32;
pub type BulletId = u32;

/// Stable-id keyed storage. Ids increase monotonically and are never
/// reused; iteration is in ascending id (insertion) order.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: BTreeMap<u32, T>,
    next_id: u32,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with a freshly allocated id
    pub fn insert_with(&mut self, build: impl FnOnce(u32) -> T) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(id, build(id));
        id
    }

    /// Insert under an id chosen elsewhere (host-published state).
    /// Returns false, storing nothing, for an id the counter cannot pass.
    pub fn insert_at(&mut self, id: u32, item: T) -> bool {
        let Some(next) = id.checked_add(1) else {
            return false;
        };
        self.next_id = self.next_id.max(next);
        self.items.insert(id, item);
        true
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<T> {
        self.items.remove(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.items.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.items.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.items.iter().map(|(id, item)| (*id, item))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.values_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Weapon readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponState {
    Ready,
    Reloading { started: Instant },
}

/// Local player state
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub radius: f32,

    // Vertical physics
    pub vertical_velocity: f32,
    pub grounded: bool,
    pub ground_height: f32,

    // Health state
    pub health: u32,
    pub max_health: u32,
    pub last_damage: Option<Instant>,

    // Weapon and ammo state
    pub ammo: u32,
    pub max_ammo: u32,
    pub weapon: WeaponState,
    pub last_shot: Option<Instant>,

    // Scoreboard
    pub kills: u32,
    pub deaths: u32,
}

impl PlayerState {
    pub fn spawn(position: Vec3, tuning: &Tuning) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            radius: tuning.player_radius,
            vertical_velocity: 0.0,
            grounded: true,
            ground_height: tuning.player_height,
            health: tuning.max_health,
            max_health: tuning.max_health,
            last_damage: None,
            ammo: tuning.max_ammo,
            max_ammo: tuning.max_ammo,
            weapon: WeaponState::Ready,
            last_shot: None,
            kills: 0,
            deaths: 0,
        }
    }

    /// Yaw about +Y, then pitch about the local X axis
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// View direction (-Z in view space)
    pub fn facing(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn is_reloading(&self) -> bool {
        matches!(self.weapon, WeaponState::Reloading { .. })
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn to_snapshot(&self, id: &ParticipantId) -> PlayerSnapshot {
        PlayerSnapshot {
            id: id.clone(),
            health: self.health,
            ammo: self.ammo,
            position: self.position.to_array(),
            rotation: [self.pitch, self.yaw, 0.0],
            kills: self.kills,
            deaths: self.deaths,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EnemyId,
    pub position: Vec3,
    pub yaw: f32,
    pub health: i32,
    pub max_health: i32,
    pub radius: f32,
}

impl Enemy {
    pub fn new(id: EnemyId, position: Vec3, tuning: &Tuning) -> Self {
        Self {
            id,
            position,
            yaw: 0.0,
            health: tuning.enemy_health,
            max_health: tuning.enemy_health,
            radius: tuning.enemy_radius,
        }
    }

    /// Remaining health as 0..=100
    pub fn health_pct(&self) -> f32 {
        if self.max_health <= 0 {
            return 0.0;
        }
        (self.health as f32 / self.max_health as f32 * 100.0).clamp(0.0, 100.0)
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: BulletId,
    pub position: Vec3,
    /// Unit vector, fixed at spawn
    pub direction: Vec3,
    pub spawned: Instant,
    pub damage: i32,
    /// Set once the bullet has applied its damage
    pub resolved: bool,
}

impl Bullet {
    pub fn is_expired(&self, now: Instant, lifetime: std::time::Duration) -> bool {
        now.saturating_duration_since(self.spawned) > lifetime
    }
}
