pub mod collision;
pub mod combat;
pub mod hud;
pub mod lobbies;
pub mod logic;
pub mod maze;
pub mod movement;
pub mod preflight;
pub mod spawning;
