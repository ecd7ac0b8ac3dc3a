use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

use crate::domain::lobbies::{self, LeaveOutcome};
use crate::error::RoomError;
use crate::handlers::models::{CreateRoomRequest, LeaveResponse, ParticipantRequest, RoomDetail, RoomInfo};
use crate::state::room_store::{MemoryRoomStore, RoomStore};
use crate::utils::config::Config;

/// App state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryRoomStore>,
    pub config: Arc<Config>,
}

/// Lobby outcome to response status
fn status_for(err: &RoomError) -> StatusCode {
    match err {
        RoomError::NotFound(_) => StatusCode::NOT_FOUND,
        RoomError::NotJoinable(_) => StatusCode::CONFLICT,
        RoomError::NotHost { .. } => StatusCode::FORBIDDEN,
        RoomError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn reject(err: RoomError) -> StatusCode {
    if err.is_stale() {
        log::info!("Stale room request: {}", err);
    } else {
        log::warn!("Room request failed: {}", err);
    }
    status_for(&err)
}

/// Thin HTTP handler: Create room
pub async fn create_room(
    State(app_state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomDetail>, StatusCode> {
    let (id, room) = lobbies::create_room(
        app_state.store.as_ref(),
        &request.participant_id,
        request.mode,
        &app_state.config.tuning,
    )
    .await
    .map_err(reject)?;

    Ok(Json(RoomDetail { id, room }))
}

/// Thin HTTP handler: List all rooms
pub async fn list_rooms(State(app_state): State<AppState>) -> Result<Json<Vec<RoomInfo>>, StatusCode> {
    let rooms = lobbies::list_rooms(app_state.store.as_ref()).await.map_err(reject)?;
    Ok(Json(rooms.into_iter().map(|(id, doc)| RoomInfo::new(id, &doc)).collect()))
}

/// Thin HTTP handler: Get room document
pub async fn get_room(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoomDetail>, StatusCode> {
    let room = app_state
        .store
        .get(&id)
        .await
        .map_err(|e| reject(RoomError::from_store(e)))?;
    Ok(Json(RoomDetail { id, room }))
}

/// Thin HTTP handler: Join room
pub async fn join_room(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ParticipantRequest>,
) -> Result<Json<RoomDetail>, StatusCode> {
    let room = lobbies::join_room(
        app_state.store.as_ref(),
        &id,
        &request.participant_id,
        &app_state.config.tuning,
    )
    .await
    .map_err(reject)?;
    Ok(Json(RoomDetail { id, room }))
}

/// Thin HTTP handler: Start match (host only)
pub async fn start_room(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ParticipantRequest>,
) -> Result<Json<RoomDetail>, StatusCode> {
    let room = lobbies::start_match(app_state.store.as_ref(), &id, &request.participant_id)
        .await
        .map_err(reject)?;
    Ok(Json(RoomDetail { id, room }))
}

/// Thin HTTP handler: Finish match (host only)
pub async fn finish_room(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ParticipantRequest>,
) -> Result<Json<RoomDetail>, StatusCode> {
    let room = lobbies::finish_match(app_state.store.as_ref(), &id, &request.participant_id)
        .await
        .map_err(reject)?;
    Ok(Json(RoomDetail { id, room }))
}

/// Thin HTTP handler: Leave room
pub async fn leave_room(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ParticipantRequest>,
) -> Result<Json<LeaveResponse>, StatusCode> {
    let outcome = lobbies::leave_room(app_state.store.as_ref(), &id, &request.participant_id)
        .await
        .map_err(reject)?;

    let response = match outcome {
        LeaveOutcome::Left(_) => LeaveResponse { left: true, room_deleted: false },
        LeaveOutcome::RoomDeleted => LeaveResponse { left: true, room_deleted: true },
        LeaveOutcome::NotMember => LeaveResponse { left: false, room_deleted: false },
    };
    Ok(Json(response))
}
