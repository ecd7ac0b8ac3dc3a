use glam::Vec3;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an optional JSON config file
pub const CONFIG_ENV: &str = "MAZESHOOTER_CONFIG";

/// Gameplay constants - immutable for the lifetime of a session
/// Per-frame quantities (speeds, gravity) are applied once per tick
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // Maze
    pub maze_width: usize,
    pub maze_height: usize,
    pub cell_size: f32,
    pub extra_opening_chance: f64,

    // Player
    pub player_height: f32,
    pub player_radius: f32,
    pub player_speed: f32,
    pub gravity: f32,
    pub jump_force: f32,
    pub max_health: u32,
    pub damage_cooldown_ms: u64,
    pub pitch_limit: f32,

    // Weapon
    pub max_ammo: u32,
    pub shot_cooldown_ms: u64,
    pub reload_time_ms: u64,

    // Enemies
    pub enemy_spawn_chance: f64,
    pub enemy_speed: f32,
    pub enemy_health: i32,
    pub enemy_damage: u32,
    pub enemy_radius: f32,
    pub enemy_height: f32,

    // Bullets
    pub bullet_speed: f32,
    pub bullet_lifetime_ms: u64,
    pub bullet_damage: i32,
    pub bullet_spawn_offset: [f32; 3],

    // Health indicators
    pub indicator_max_distance: f32,
    pub occlusion_margin: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        let cell_size = 10.0;
        Self {
            maze_width: 25,
            maze_height: 25,
            cell_size,
            extra_opening_chance: 0.05,

            player_height: cell_size / 2.0,
            player_radius: cell_size * 0.1,
            player_speed: 0.15,
            gravity: 0.03,
            jump_force: 1.0,
            max_health: 100,
            damage_cooldown_ms: 1000,
            pitch_limit: std::f32::consts::FRAC_PI_2,

            max_ammo: 30,
            shot_cooldown_ms: 200,
            reload_time_ms: 1500,

            enemy_spawn_chance: 0.1,
            enemy_speed: 0.04,
            enemy_health: 50,
            enemy_damage: 10,
            enemy_radius: cell_size * 0.8,
            enemy_height: cell_size * 0.4,

            bullet_speed: 10.0,
            bullet_lifetime_ms: 1000,
            bullet_damage: 20,
            bullet_spawn_offset: [0.5, -0.2, 0.8],

            indicator_max_distance: 100.0,
            occlusion_margin: cell_size * 0.2,
        }
    }
}

impl Tuning {
    pub fn damage_cooldown(&self) -> Duration {
        Duration::from_millis(self.damage_cooldown_ms)
    }

    pub fn shot_cooldown(&self) -> Duration {
        Duration::from_millis(self.shot_cooldown_ms)
    }

    pub fn reload_time(&self) -> Duration {
        Duration::from_millis(self.reload_time_ms)
    }

    pub fn bullet_lifetime(&self) -> Duration {
        Duration::from_millis(self.bullet_lifetime_ms)
    }

    pub fn bullet_spawn_offset(&self) -> Vec3 {
        Vec3::from_array(self.bullet_spawn_offset)
    }
}

/// Process configuration - immutable after load
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http_port: u16,
    pub tick_rate_hz: u32,
    pub log_level: String,
    /// Frames between local snapshot pushes to the room document
    pub sync_interval_ticks: u32,
    pub tuning: Tuning,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            tick_rate_hz: 60,
            log_level: "info".to_string(),
            sync_interval_ticks: 6,
            tuning: Tuning::default(),
        }
    }
}

impl Config {
    /// Load from the file named by `MAZESHOOTER_CONFIG`, falling back to defaults
    pub fn load() -> Self {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path).unwrap_or_else(|e| {
                log::warn!("Ignoring config file {}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate_hz.max(1) as u64)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.tuning.max_ammo, 30);
        assert_eq!(config.tuning.maze_width, 25);
    }

    #[test]
    fn test_tick_interval() {
        let mut config = Config::default();
        config.tick_rate_hz = 50;
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_derived_dimensions() {
        let tuning = Tuning::default();
        assert_eq!(tuning.player_height, 5.0);
        assert_eq!(tuning.player_radius, 1.0);
        assert_eq!(tuning.enemy_radius, 8.0);
        assert_eq!(tuning.reload_time(), Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{ "http_port": 9000, "tuning": { "max_ammo": 12 } }"#).unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.tuning.max_ammo, 12);
        assert_eq!(config.tuning.reload_time_ms, 1500);
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    }
}
