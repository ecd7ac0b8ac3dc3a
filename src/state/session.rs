use glam::Vec3;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::domain::collision::CollisionWorld;
use crate::domain::combat::{resolve_bullets, spawn_bullet};
use crate::domain::hud::{enemy_indicators, EnemyIndicator};
use crate::domain::logic::{start_reload, take_damage, try_fire, update_reload, DamageOutcome, FireOutcome, ReloadOutcome};
use crate::domain::maze::{generate_with_rng, MazeGrid};
use crate::domain::movement::{in_contact, step_enemy, step_player};
use crate::domain::spawning::{player_spawn, spawn_enemies};
use crate::error::SessionError;
use crate::state::entities::{Arena, Bullet, Enemy, EnemyId, PlayerState};
use crate::state::input::FrameIntents;
use crate::state::room::{BulletSnapshot, EnemySnapshot, ParticipantId, PlayerSnapshot};
use crate::utils::buffers::{PresentationEvent, SmallEventVec};
use crate::utils::config::Tuning;

pub const DEFEAT_REASON: &str = "You were defeated!";

/// What one frame produced
#[derive(Debug, Default)]
pub struct FrameReport {
    pub events: SmallEventVec,
    pub player_collided: bool,
    pub kills: u32,
}

/// Everything one running game owns. Mutated only by `step` and the
/// synchronizer hooks, always from the frame loop.
#[derive(Debug)]
pub struct SessionState {
    pub tuning: Tuning,
    pub maze: MazeGrid,
    pub world: CollisionWorld,
    pub player: PlayerState,
    pub enemies: Arena<Enemy>,
    pub bullets: Arena<Bullet>,
    pub frame: u64,
    /// Whether this session moves enemies itself (single player or room host)
    pub host_authority: bool,
    game_over: Option<String>,
    /// Enemies removed from this session; host snapshots never bring them back
    defeated: BTreeSet<EnemyId>,

    // Last values reported to the presentation layer
    last_health: u32,
    last_ammo: u32,
}

impl SessionState {
    pub fn new(tuning: Tuning, maze: MazeGrid, enemies: Arena<Enemy>) -> Self {
        let world = CollisionWorld::from_maze(&maze, tuning.cell_size);
        let player = PlayerState::spawn(player_spawn(&maze, &tuning), &tuning);
        let (last_health, last_ammo) = (player.health, player.ammo);
        Self {
            tuning,
            maze,
            world,
            player,
            enemies,
            bullets: Arena::new(),
            frame: 0,
            host_authority: true,
            game_over: None,
            defeated: BTreeSet::new(),
            last_health,
            last_ammo,
        }
    }

    /// Generate maze and enemies locally. Reached through `Preflight`.
    pub(crate) fn new_single_player<R: Rng + ?Sized>(tuning: Tuning, rng: &mut R) -> Result<Self, SessionError> {
        let maze = generate_with_rng(
            tuning.maze_width,
            tuning.maze_height,
            tuning.extra_opening_chance,
            rng,
        )?;
        let enemies = spawn_enemies(&maze, rng, &tuning);
        log::info!(
            "Session started: {}x{} maze, {} enemies",
            maze.width(),
            maze.height(),
            enemies.len()
        );
        Ok(Self::new(tuning, maze, enemies))
    }

    /// Non-host session built from the maze and enemies the host published.
    /// Reached through `Preflight`.
    pub(crate) fn from_published(
        tuning: Tuning,
        maze_rows: Option<&[String]>,
        enemies: &BTreeMap<EnemyId, EnemySnapshot>,
    ) -> Result<Self, SessionError> {
        let rows = maze_rows.ok_or(SessionError::MazeNotPublished)?;
        let maze = MazeGrid::from_rows(rows)?;
        let mut session = Self::new(tuning, maze, Arena::new());
        session.host_authority = false;
        session.apply_enemy_snapshots(enemies);
        log::info!("Joined published session with {} enemies", session.enemies.len());
        Ok(session)
    }

    pub fn is_over(&self) -> bool {
        self.game_over.is_some()
    }

    pub fn game_over_reason(&self) -> Option<&str> {
        self.game_over.as_deref()
    }

    /// End the session from outside the simulation (leave, match finished).
    /// Returns the event to surface, or `None` if it already ended.
    pub fn end(&mut self, reason: impl Into<String>) -> Option<PresentationEvent> {
        if self.game_over.is_some() {
            return None;
        }
        let reason = reason.into();
        log::info!("Session over: {}", reason);
        self.game_over = Some(reason.clone());
        Some(PresentationEvent::GameOver { reason })
    }

    /// Run one frame: player, then enemies, then bullets.
    /// A finished session no longer changes.
    pub fn step(&mut self, intents: &FrameIntents, now: Instant) -> FrameReport {
        let mut report = FrameReport::default();
        if self.is_over() {
            return report;
        }
        self.frame += 1;

        // 1. Player movement and collision
        report.player_collided = step_player(&mut self.player, intents, &self.world, &self.tuning);

        // 2. Contact damage from enemies already touching the player
        if self.enemies.values().any(|enemy| in_contact(&self.player, enemy)) {
            self.hit_player(now, &mut report.events);
        }

        // 3. Reload timer, then reload and fire intents
        if update_reload(&mut self.player, &self.tuning, now) {
            report.events.push(PresentationEvent::ReloadFinished);
        }
        if self.player.is_alive() {
            self.handle_weapon(intents, now, &mut report.events);
        }

        // 4. Enemies chase the updated player position
        if self.host_authority {
            let target = self.player.position;
            for enemy in self.enemies.values_mut() {
                step_enemy(enemy, target, &self.world, &self.tuning);
            }
        }
        if self.enemies.values().any(|enemy| in_contact(&self.player, enemy)) {
            self.hit_player(now, &mut report.events);
        }

        // 5. Bullets
        report.kills = resolve_bullets(
            &mut self.bullets,
            &mut self.enemies,
            &self.world,
            &self.tuning,
            now,
            &mut report.events,
        );
        self.player.kills += report.kills;
        for event in &report.events {
            if let PresentationEvent::IndicatorReleased { id } = event {
                self.defeated.insert(*id);
            }
        }

        // 6. HUD deltas and game over
        self.push_hud_changes(&mut report.events);
        if !self.player.is_alive() {
            if let Some(event) = self.end(DEFEAT_REASON) {
                report.events.push(event);
            }
        }

        report
    }

    fn hit_player(&mut self, now: Instant, events: &mut SmallEventVec) {
        let damage = self.tuning.enemy_damage;
        match take_damage(&mut self.player, damage, &self.tuning, now) {
            DamageOutcome::Applied { .. } | DamageOutcome::Killed => {
                events.push(PresentationEvent::PlayerHit { damage });
            }
            DamageOutcome::CoolingDown | DamageOutcome::AlreadyDead => {}
        }
    }

    fn handle_weapon(&mut self, intents: &FrameIntents, now: Instant, events: &mut SmallEventVec) {
        if intents.reload && start_reload(&mut self.player, now) == ReloadOutcome::Started {
            events.push(PresentationEvent::ReloadStarted);
        }

        if intents.fire && try_fire(&mut self.player, &self.tuning, now) == FireOutcome::Fired {
            let bullet = spawn_bullet(&mut self.bullets, &self.player, &self.tuning, now);
            let origin = self.bullets.get(bullet).map(|b| b.position).unwrap_or(self.player.position);
            events.push(PresentationEvent::ShotFired { bullet, origin });
        }
    }

    fn push_hud_changes(&mut self, events: &mut SmallEventVec) {
        if self.player.health != self.last_health {
            self.last_health = self.player.health;
            events.push(PresentationEvent::HealthChanged {
                health: self.player.health,
                max: self.player.max_health,
            });
        }
        if self.player.ammo != self.last_ammo {
            self.last_ammo = self.player.ammo;
            events.push(PresentationEvent::AmmoChanged {
                current: self.player.ammo,
                max: self.player.max_ammo,
            });
        }
    }

    pub fn local_snapshot(&self, id: &ParticipantId) -> PlayerSnapshot {
        self.player.to_snapshot(id)
    }

    pub fn enemy_snapshots(&self) -> BTreeMap<EnemyId, EnemySnapshot> {
        self.enemies
            .iter()
            .map(|(id, enemy)| (id, EnemySnapshot::from(enemy)))
            .collect()
    }

    pub fn bullet_snapshots(&self) -> BTreeMap<u32, BulletSnapshot> {
        self.bullets
            .iter()
            .map(|(id, bullet)| (id, BulletSnapshot::from(bullet)))
            .collect()
    }

    /// Replace local enemies with the host's view. Enemies the host no
    /// longer lists are dropped and their indicators released; enemies
    /// this session already removed stay removed.
    pub fn apply_enemy_snapshots(&mut self, snapshots: &BTreeMap<EnemyId, EnemySnapshot>) -> SmallEventVec {
        let mut events = SmallEventVec::new();

        for id in self.enemies.ids() {
            if !snapshots.contains_key(&id) {
                self.enemies.remove(id);
                self.defeated.insert(id);
                events.push(PresentationEvent::IndicatorReleased { id });
            }
        }

        for (id, snapshot) in snapshots {
            if self.defeated.contains(id) {
                continue;
            }
            let position = Vec3::from_array(snapshot.position);
            match self.enemies.get_mut(*id) {
                Some(enemy) => {
                    enemy.position = position;
                    enemy.health = snapshot.health;
                }
                None => {
                    let mut enemy = Enemy::new(*id, position, &self.tuning);
                    enemy.health = snapshot.health;
                    if !self.enemies.insert_at(*id, enemy) {
                        log::warn!("Ignoring published enemy with unusable id {}", id);
                    }
                }
            }
        }

        events
    }

    pub fn enemy_indicators(&self) -> Vec<EnemyIndicator> {
        enemy_indicators(
            &self.enemies,
            &self.world,
            self.player.position,
            self.player.facing(),
            &self.tuning,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::maze::generate;
    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn empty_session(tuning: Tuning) -> SessionState {
        let maze = generate(tuning.maze_width, tuning.maze_height, Some(11)).unwrap();
        SessionState::new(tuning, maze, Arena::new())
    }

    #[test]
    fn test_single_player_setup() {
        let tuning = Tuning::default();
        let session = SessionState::new_single_player(tuning, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(session.player.position, Vec3::new(15.0, 5.0, 15.0));
        assert_eq!(session.world.obstacles().len(), session.maze.wall_cells().count());
        assert!(session.host_authority);
        assert!(!session.is_over());
    }

    #[test]
    fn test_idle_frame_is_quiet() {
        let mut session = empty_session(Tuning::default());
        let report = session.step(&FrameIntents::idle(), Instant::now());
        assert!(report.events.is_empty());
        assert!(!report.player_collided);
        assert_eq!(session.frame, 1);
    }

    #[test]
    fn test_fire_emits_shot_and_ammo() {
        let mut session = empty_session(Tuning::default());
        let report = session.step(&FrameIntents::firing(), Instant::now());

        assert_eq!(session.player.ammo, 29);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, PresentationEvent::ShotFired { bullet: 0, .. })));
        assert!(report
            .events
            .contains(&PresentationEvent::AmmoChanged { current: 29, max: 30 }));
    }

    #[test]
    fn test_reload_cycle_events() {
        let mut session = empty_session(Tuning::default());
        let t0 = Instant::now();
        session.player.ammo = 5;
        session.last_ammo = 5;

        let reload = FrameIntents {
            reload: true,
            ..FrameIntents::default()
        };
        let report = session.step(&reload, t0);
        assert!(report.events.contains(&PresentationEvent::ReloadStarted));

        let report = session.step(&FrameIntents::idle(), t0 + Duration::from_millis(1500));
        assert!(report.events.contains(&PresentationEvent::ReloadFinished));
        assert!(report
            .events
            .contains(&PresentationEvent::AmmoChanged { current: 30, max: 30 }));
    }

    #[test]
    fn test_game_over_exactly_once() {
        let tuning = Tuning {
            enemy_damage: 100,
            ..Tuning::default()
        };
        let mut session = empty_session(tuning.clone());
        let spot = session.player.position - Vec3::new(0.0, 1.0, 0.0);
        session.enemies.insert_with(|id| Enemy::new(id, spot, &tuning));

        let t0 = Instant::now();
        let report = session.step(&FrameIntents::idle(), t0);
        let game_overs = report
            .events
            .iter()
            .filter(|e| matches!(e, PresentationEvent::GameOver { .. }))
            .count();
        assert_eq!(game_overs, 1);
        assert!(report.events.contains(&PresentationEvent::HealthChanged { health: 0, max: 100 }));
        assert_eq!(session.game_over_reason(), Some(DEFEAT_REASON));
        assert_eq!(session.player.deaths, 1);

        // Finished sessions are frozen
        let report = session.step(&FrameIntents::moving(Vec2::Y), t0 + Duration::from_secs(5));
        assert!(report.events.is_empty());
        assert_eq!(session.frame, 1);
        assert!(session.end("left").is_none());
    }

    #[test]
    fn test_from_published_requires_maze() {
        let err = SessionState::from_published(Tuning::default(), None, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, SessionError::MazeNotPublished));

        let rows = vec!["#.#".to_string()];
        let err = SessionState::from_published(Tuning::default(), Some(&rows), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, SessionError::Maze(_)));
    }

    #[test]
    fn test_published_session_mirrors_host_enemies() {
        let tuning = Tuning::default();
        let host = SessionState::new_single_player(
            Tuning {
                enemy_spawn_chance: 0.5,
                ..tuning.clone()
            },
            &mut StdRng::seed_from_u64(8),
        )
        .unwrap();
        let rows = host.maze.to_rows();
        let published = host.enemy_snapshots();

        let mut client = SessionState::from_published(tuning, Some(&rows), &published).unwrap();
        assert!(!client.host_authority);
        assert_eq!(client.maze, host.maze);
        assert_eq!(client.enemy_snapshots(), published);

        // Host kills one enemy
        let mut next = published.clone();
        let gone = *next.keys().next().unwrap();
        next.remove(&gone);
        let events = client.apply_enemy_snapshots(&next);
        assert_eq!(events.as_slice(), &[PresentationEvent::IndicatorReleased { id: gone }]);
        assert!(!client.enemies.contains(gone));

        // A stale snapshot still listing it does not bring it back
        assert!(client.apply_enemy_snapshots(&published).is_empty());
        assert!(!client.enemies.contains(gone));
    }

    #[test]
    fn test_guest_kill_survives_host_snapshot() {
        let tuning = Tuning {
            enemy_health: 20,
            ..Tuning::default()
        };
        let rows: Vec<String> = ["###", "#.#", "#.#", "#.#", "#.#", "#.#", "###"]
            .into_iter()
            .map(String::from)
            .collect();
        let position = MazeGrid::cell_center(1, 4, tuning.cell_size, tuning.enemy_height);
        let published = BTreeMap::from([(
            0,
            EnemySnapshot {
                id: 0,
                position: position.to_array(),
                health: 20,
            },
        )]);

        let mut guest = SessionState::from_published(tuning, Some(&rows), &published).unwrap();
        guest.player.yaw = std::f32::consts::PI;
        let t0 = Instant::now();

        for round in 0..2u64 {
            let start = t0 + Duration::from_secs(round * 2);
            guest.step(&FrameIntents::firing(), start);
            for frame in 1..=4 {
                guest.step(&FrameIntents::idle(), start + Duration::from_millis(16 * frame));
            }
            // Host has not seen the kill yet and republishes the enemy
            guest.apply_enemy_snapshots(&published);
            assert!(!guest.enemies.contains(0));
        }
        assert_eq!(guest.player.kills, 1);
    }

    #[test]
    fn test_unusable_enemy_id_ignored() {
        let tuning = Tuning::default();
        let rows: Vec<String> = ["###", "#..", "###"].into_iter().map(String::from).collect();
        let published = BTreeMap::from([(
            u32::MAX,
            EnemySnapshot {
                id: u32::MAX,
                position: [15.0, 4.0, 15.0],
                health: 50,
            },
        )]);

        let session = SessionState::from_published(tuning, Some(&rows), &published).unwrap();
        assert!(session.enemies.is_empty());
    }
}
