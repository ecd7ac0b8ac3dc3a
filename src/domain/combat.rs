use std::time::Instant;

use crate::domain::collision::CollisionWorld;
use crate::state::entities::{Arena, Bullet, BulletId, Enemy, PlayerState};
use crate::utils::buffers::{PresentationEvent, SmallEventVec};
use crate::utils::config::Tuning;

/// Extra distance checked past each travelled segment
const PATH_PADDING: f32 = 0.1;

/// Spawn a bullet at the muzzle offset, travelling along the view direction
pub fn spawn_bullet(bullets: &mut Arena<Bullet>, player: &PlayerState, tuning: &Tuning, now: Instant) -> BulletId {
    let position = player.position + player.orientation() * tuning.bullet_spawn_offset();
    let direction = player.facing();
    bullets.insert_with(|id| Bullet {
        id,
        position,
        direction,
        spawned: now,
        damage: tuning.bullet_damage,
        resolved: false,
    })
}

/// Advance and resolve every live bullet for one frame.
///
/// Each bullet resolves at most once: lifetime expiry, wall impact, or
/// the first enemy (ascending id) within collision radius. Enemies whose
/// health reaches zero are removed and their indicators released.
/// Returns the number of enemies killed.
pub fn resolve_bullets(
    bullets: &mut Arena<Bullet>,
    enemies: &mut Arena<Enemy>,
    world: &CollisionWorld,
    tuning: &Tuning,
    now: Instant,
    events: &mut SmallEventVec,
) -> u32 {
    let lifetime = tuning.bullet_lifetime();
    let mut kills = 0;

    for id in bullets.ids() {
        let Some(bullet) = bullets.get_mut(id) else {
            continue;
        };

        if bullet.resolved || bullet.is_expired(now, lifetime) {
            bullets.remove(id);
            continue;
        }

        let from = bullet.position;
        bullet.position += bullet.direction * tuning.bullet_speed;

        if world.segment_blocked(from, bullet.position, PATH_PADDING) {
            bullet.resolved = true;
            bullets.remove(id);
            continue;
        }

        let position = bullet.position;
        let hit = enemies
            .iter()
            .find(|(_, enemy)| position.distance(enemy.position) < enemy.radius)
            .map(|(enemy_id, _)| enemy_id);

        let Some(enemy_id) = hit else {
            continue;
        };

        bullet.resolved = true;
        let damage = bullet.damage;
        bullets.remove(id);

        let Some(enemy) = enemies.get_mut(enemy_id) else {
            continue;
        };
        enemy.health -= damage;
        events.push(PresentationEvent::EnemyDamaged {
            id: enemy_id,
            health_pct: enemy.health_pct(),
        });

        if enemy.is_dead() {
            enemies.remove(enemy_id);
            events.push(PresentationEvent::IndicatorReleased { id: enemy_id });
            log::debug!("Enemy {} killed", enemy_id);
            kills += 1;
        }
    }

    kills
}
