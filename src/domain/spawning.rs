use glam::Vec3;
use rand::Rng;

use crate::domain::maze::MazeGrid;
use crate::state::entities::{Arena, Enemy};
use crate::utils::config::Tuning;

/// Player spawn point: centre of the start cell at eye height
pub fn player_spawn(grid: &MazeGrid, tuning: &Tuning) -> Vec3 {
    let (x, y) = grid.start_cell();
    MazeGrid::cell_center(x, y, tuning.cell_size, tuning.player_height)
}

/// Roll for an enemy on every open cell except the start cell.
/// Ids follow row-major spawn order.
pub fn spawn_enemies<R: Rng + ?Sized>(grid: &MazeGrid, rng: &mut R, tuning: &Tuning) -> Arena<Enemy> {
    let start = grid.start_cell();
    let chance = tuning.enemy_spawn_chance.clamp(0.0, 1.0);
    let mut enemies = Arena::new();

    for (x, y) in grid.open_cells() {
        if (x, y) == start || !rng.gen_bool(chance) {
            continue;
        }
        let position = MazeGrid::cell_center(x, y, tuning.cell_size, tuning.enemy_height);
        enemies.insert_with(|id| Enemy::new(id, position, tuning));
    }

    log::debug!("Spawned {} enemies", enemies.len());
    enemies
}
