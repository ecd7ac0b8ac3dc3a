pub mod domain;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod tick;
pub mod utils;

pub use error::{MazeError, RoomError, SessionError, StoreError};
pub use state::session::{FrameReport, SessionState};
pub use utils::config::{Config, Tuning};
