use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::room::{ParticipantId, RoomDocument, RoomId, RoomMode, RoomStatus};

/// HTTP Request/Response DTOs

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateRoomRequest {
    pub participant_id: ParticipantId,
    pub mode: RoomMode,
}

/// Body of join/start/leave
#[derive(Serialize, Deserialize, Debug)]
pub struct ParticipantRequest {
    pub participant_id: ParticipantId,
}

/// Lobby list entry
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct RoomInfo {
    pub id: RoomId,
    pub host_id: ParticipantId,
    pub mode: RoomMode,
    pub status: RoomStatus,
    pub player_count: usize,
    pub players: Vec<ParticipantId>,
    pub created_at: DateTime<Utc>,
}

impl RoomInfo {
    pub fn new(id: RoomId, doc: &RoomDocument) -> Self {
        Self {
            id,
            host_id: doc.host_id.clone(),
            mode: doc.mode,
            status: doc.status,
            player_count: doc.players.len(),
            players: doc.players.keys().cloned().collect(),
            created_at: doc.created_at,
        }
    }
}

/// Full room document with its id
#[derive(Serialize, Deserialize, Debug)]
pub struct RoomDetail {
    pub id: RoomId,
    pub room: RoomDocument,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LeaveResponse {
    pub left: bool,
    pub room_deleted: bool,
}
