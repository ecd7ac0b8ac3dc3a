use glam::{Quat, Vec2, Vec3};

use crate::domain::collision::CollisionWorld;
use crate::state::entities::{Enemy, PlayerState};
use crate::state::input::FrameIntents;
use crate::utils::config::Tuning;

/// Apply yaw/pitch deltas; pitch is clamped so the view never flips.
pub fn apply_look(player: &mut PlayerState, look: Vec2, pitch_limit: f32) {
    player.yaw += look.x;
    player.pitch = (player.pitch + look.y).clamp(-pitch_limit, pitch_limit);
}

/// Forward and right vectors on the ground plane for a given yaw
pub fn horizontal_basis(yaw: f32) -> (Vec3, Vec3) {
    let (sin, cos) = yaw.sin_cos();
    let forward = Vec3::new(-sin, 0.0, -cos);
    let right = Vec3::new(cos, 0.0, -sin);
    (forward, right)
}

/// Advance the local player one frame.
///
/// Horizontal movement and vertical physics are applied first; if any of
/// the four orientation-relative probes then hits a wall within the
/// player's radius, the whole update is discarded. Returns true on revert.
pub fn step_player(
    player: &mut PlayerState,
    intents: &FrameIntents,
    world: &CollisionWorld,
    tuning: &Tuning,
) -> bool {
    let previous = player.position;

    apply_look(player, intents.look, tuning.pitch_limit);

    // Horizontal
    let (forward, right) = horizontal_basis(player.yaw);
    let movement = intents.movement.clamp_length_max(1.0);
    let velocity = (forward * movement.y + right * movement.x) * tuning.player_speed;
    player.position += velocity;

    // Vertical
    if intents.jump && player.grounded {
        player.vertical_velocity = tuning.jump_force;
        player.grounded = false;
    }
    if !player.grounded {
        player.vertical_velocity -= tuning.gravity;
        player.position.y += player.vertical_velocity;
        if player.position.y <= player.ground_height {
            player.position.y = player.ground_height;
            player.vertical_velocity = 0.0;
            player.grounded = true;
        }
    }

    if world.probe_cardinal(player.position, player.orientation(), player.radius) {
        player.position = previous;
        return true;
    }
    false
}

/// Chase the target one frame: move along the horizontal part of the unit
/// vector toward it, face it, revert on wall contact. Returns true on revert.
pub fn step_enemy(enemy: &mut Enemy, target: Vec3, world: &CollisionWorld, tuning: &Tuning) -> bool {
    let previous = enemy.position;
    let toward = (target - enemy.position).normalize_or_zero();
    if toward == Vec3::ZERO {
        return false;
    }

    enemy.position.x += toward.x * tuning.enemy_speed;
    enemy.position.z += toward.z * tuning.enemy_speed;
    enemy.yaw = (-toward.x).atan2(-toward.z);

    if world.probe_cardinal(enemy.position, Quat::IDENTITY, enemy.radius) {
        enemy.position = previous;
        return true;
    }
    false
}

/// Bodies overlap when centres are closer than the sum of radii
pub fn in_contact(player: &PlayerState, enemy: &Enemy) -> bool {
    player.position.distance(enemy.position) < player.radius + enemy.radius
}
