use std::time::Instant;

use crate::state::entities::{PlayerState, WeaponState};
use crate::utils::config::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Fired,
    Reloading,
    Empty,
    CoolingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Started,
    AlreadyReloading,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Applied { health: u32 },
    /// Health reached zero on this hit
    Killed,
    CoolingDown,
    AlreadyDead,
}

/// Try to shoot - validates reload state, ammo and shot cooldown.
/// A successful shot consumes one round and restarts the cooldown.
pub fn try_fire(player: &mut PlayerState, tuning: &Tuning, now: Instant) -> FireOutcome {
    if player.is_reloading() {
        log::debug!("Fire ignored: weapon is reloading");
        return FireOutcome::Reloading;
    }

    if let Some(last) = player.last_shot {
        if now.saturating_duration_since(last) < tuning.shot_cooldown() {
            return FireOutcome::CoolingDown;
        }
    }

    if player.ammo == 0 {
        log::debug!("Fire ignored: out of ammo");
        return FireOutcome::Empty;
    }

    player.ammo -= 1;
    player.last_shot = Some(now);
    FireOutcome::Fired
}

/// Start a reload. Ignored while full or already reloading.
pub fn start_reload(player: &mut PlayerState, now: Instant) -> ReloadOutcome {
    if player.is_reloading() {
        log::debug!("Reload ignored: already reloading");
        return ReloadOutcome::AlreadyReloading;
    }

    if player.ammo >= player.max_ammo {
        log::debug!("Reload ignored: ammo full");
        return ReloadOutcome::Full;
    }

    player.weapon = WeaponState::Reloading { started: now };
    ReloadOutcome::Started
}

/// Complete a reload once its duration has elapsed.
/// Returns true on the frame the magazine is refilled.
pub fn update_reload(player: &mut PlayerState, tuning: &Tuning, now: Instant) -> bool {
    let WeaponState::Reloading { started } = player.weapon else {
        return false;
    };

    if now.saturating_duration_since(started) < tuning.reload_time() {
        return false;
    }

    player.ammo = player.max_ammo;
    player.weapon = WeaponState::Ready;
    true
}

/// Apply contact damage, at most once per damage cooldown.
/// Health floors at zero; `Killed` is returned only on the hit that reaches it.
pub fn take_damage(player: &mut PlayerState, amount: u32, tuning: &Tuning, now: Instant) -> DamageOutcome {
    if !player.is_alive() {
        return DamageOutcome::AlreadyDead;
    }

    if let Some(last) = player.last_damage {
        if now.saturating_duration_since(last) < tuning.damage_cooldown() {
            return DamageOutcome::CoolingDown;
        }
    }

    player.health = player.health.saturating_sub(amount);
    player.last_damage = Some(now);

    if player.health == 0 {
        player.deaths += 1;
        DamageOutcome::Killed
    } else {
        DamageOutcome::Applied { health: player.health }
    }
}
