use glam::Vec3;
use smallvec::SmallVec;

use crate::state::entities::{BulletId, EnemyId};
use crate::state::room::{ParticipantId, PlayerSnapshot, RoomStatus};

/// Type alias for small collections that avoid allocations
pub type SmallEventVec = SmallVec<[PresentationEvent; 16]>;
pub type SmallSyncVec = SmallVec<[SyncEvent; 8]>;

/// Per-frame output consumed by the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    HealthChanged { health: u32, max: u32 },
    AmmoChanged { current: u32, max: u32 },
    ReloadStarted,
    ReloadFinished,
    ShotFired { bullet: BulletId, origin: Vec3 },
    PlayerHit { damage: u32 },
    EnemyDamaged { id: EnemyId, health_pct: f32 },
    /// The enemy is gone; its health indicator can be torn down
    IndicatorReleased { id: EnemyId },
    GameOver { reason: String },
}

/// Room-document changes seen by the synchronizer
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    RemoteJoined(PlayerSnapshot),
    RemoteUpdated(PlayerSnapshot),
    RemoteLeft(ParticipantId),
    StatusChanged(RoomStatus),
    MazePublished,
    EnemiesChanged,
    RoomClosed,
}
