use thiserror::Error;

use crate::state::room::RoomId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze dimensions {width}x{height} too small to carve (minimum 3x3)")]
    TooSmall { width: usize, height: usize },

    #[error("published maze is malformed: {reason}")]
    Malformed { reason: String },
}

/// Failures reported by the remote room store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Lobby-level outcomes for create/join/start/leave
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("room {0} no longer exists")]
    NotFound(RoomId),

    #[error("room {0} is not joinable")]
    NotJoinable(RoomId),

    #[error("participant {participant} is not the host of room {room}")]
    NotHost { room: RoomId, participant: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoomError {
    /// Missing rooms are a stale-room condition, not a store fault
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => RoomError::NotFound(id),
            other => RoomError::Store(other),
        }
    }

    /// Conditions that send the user back to the lobby with a timed notice
    pub fn is_stale(&self) -> bool {
        matches!(self, RoomError::NotFound(_) | RoomError::NotJoinable(_))
    }
}

/// Fatal errors while starting a session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to load model {url}: {reason}")]
    AssetLoad { url: String, reason: String },

    #[error("required UI elements missing: {}", .0.join(", "))]
    MissingUi(Vec<String>),

    #[error("host has not published the maze yet")]
    MazeNotPublished,

    #[error(transparent)]
    Maze(#[from] MazeError),
}
