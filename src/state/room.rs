use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::entities::{Bullet, Enemy, EnemyId};
use crate::utils::config::Tuning;

pub type RoomId = String;
pub type ParticipantId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomMode {
    #[serde(rename = "coop")]
    Cooperative,
    #[serde(rename = "competitive")]
    Competitive,
}

/// waiting -> playing -> finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

/// Per-participant state mirrored into the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: ParticipantId,
    pub health: u32,
    pub ammo: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub kills: u32,
    pub deaths: u32,
}

impl PlayerSnapshot {
    /// Full health and ammo, at the origin
    pub fn fresh(id: impl Into<ParticipantId>, tuning: &Tuning) -> Self {
        Self {
            id: id.into(),
            health: tuning.max_health,
            ammo: tuning.max_ammo,
            position: [0.0; 3],
            rotation: [0.0; 3],
            kills: 0,
            deaths: 0,
        }
    }
}

/// Host-owned enemy state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: EnemyId,
    pub position: [f32; 3],
    pub health: i32,
}

impl From<&Enemy> for EnemySnapshot {
    fn from(enemy: &Enemy) -> Self {
        Self {
            id: enemy.id,
            position: enemy.position.to_array(),
            health: enemy.health,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub position: [f32; 3],
    pub direction: [f32; 3],
}

impl From<&Bullet> for BulletSnapshot {
    fn from(bullet: &Bullet) -> Self {
        Self {
            position: bullet.position.to_array(),
            direction: bullet.direction.to_array(),
        }
    }
}

/// Shared room document as held by the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDocument {
    pub host_id: ParticipantId,
    pub mode: RoomMode,
    pub status: RoomStatus,
    #[serde(default)]
    pub players: BTreeMap<ParticipantId, PlayerSnapshot>,
    #[serde(default)]
    pub enemies: BTreeMap<EnemyId, EnemySnapshot>,
    #[serde(default)]
    pub bullets: BTreeMap<u32, BulletSnapshot>,
    /// Maze rows published by the host once generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maze: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Partial-merge operations accepted by the store
#[derive(Debug, Clone, PartialEq)]
pub enum RoomUpdate {
    SetStatus(RoomStatus),
    UpsertPlayer(PlayerSnapshot),
    RemovePlayer(ParticipantId),
    SetMaze(Vec<String>),
    SetEnemies(BTreeMap<EnemyId, EnemySnapshot>),
    SetBullets(BTreeMap<u32, BulletSnapshot>),
}

impl RoomDocument {
    /// New waiting room with the host as its first player
    pub fn new(host: PlayerSnapshot, mode: RoomMode) -> Self {
        let host_id = host.id.clone();
        let mut players = BTreeMap::new();
        players.insert(host_id.clone(), host);
        Self {
            host_id,
            mode,
            status: RoomStatus::Waiting,
            players,
            enemies: BTreeMap::new(),
            bullets: BTreeMap::new(),
            maze: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_joinable(&self) -> bool {
        self.status == RoomStatus::Waiting
    }

    pub fn is_host(&self, participant: &str) -> bool {
        self.host_id == participant
    }

    pub fn apply(&mut self, update: RoomUpdate) {
        match update {
            RoomUpdate::SetStatus(status) => self.status = status,
            RoomUpdate::UpsertPlayer(snapshot) => {
                self.players.insert(snapshot.id.clone(), snapshot);
            }
            RoomUpdate::RemovePlayer(id) => {
                self.players.remove(&id);
                // Host role passes to the lowest remaining participant id
                if self.host_id == id {
                    if let Some(next) = self.players.keys().next() {
                        self.host_id = next.clone();
                    }
                }
            }
            RoomUpdate::SetMaze(rows) => self.maze = Some(rows),
            RoomUpdate::SetEnemies(enemies) => self.enemies = enemies,
            RoomUpdate::SetBullets(bullets) => self.bullets = bullets,
        }
    }
}
