use crate::error::{RoomError, StoreError};
use crate::state::room::{PlayerSnapshot, RoomDocument, RoomId, RoomMode, RoomStatus, RoomUpdate};
use crate::state::room_store::{Guarded, RoomStore};
use crate::utils::config::Tuning;

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left(RoomDocument),
    /// The last participant left and the room was removed
    RoomDeleted,
    NotMember,
}

/// Create a waiting room with the host as its first player
pub async fn create_room<S: RoomStore>(
    store: &S,
    host: &str,
    mode: RoomMode,
    tuning: &Tuning,
) -> Result<(RoomId, RoomDocument), RoomError> {
    let doc = RoomDocument::new(PlayerSnapshot::fresh(host, tuning), mode);
    let id = store.create(doc.clone()).await.map_err(RoomError::from_store)?;
    log::info!("Participant {} created {:?} room {}", host, mode, id);
    Ok((id, doc))
}

/// Add a participant to a waiting room.
/// Re-joining as an existing member succeeds without changes.
pub async fn join_room<S: RoomStore>(
    store: &S,
    room_id: &str,
    participant: &str,
    tuning: &Tuning,
) -> Result<RoomDocument, RoomError> {
    let snapshot = PlayerSnapshot::fresh(participant, tuning);
    let outcome = store
        .update_when(
            room_id,
            |doc| doc.is_joinable() && !doc.players.contains_key(participant),
            vec![RoomUpdate::UpsertPlayer(snapshot)],
        )
        .await
        .map_err(RoomError::from_store)?;

    match outcome {
        Guarded::Applied(doc) => {
            log::info!("Participant {} joined room {}", participant, room_id);
            Ok(doc)
        }
        Guarded::Refused(doc) if doc.players.contains_key(participant) => Ok(doc),
        Guarded::Refused(doc) => {
            log::warn!(
                "Participant {} refused from room {} ({:?})",
                participant,
                room_id,
                doc.status
            );
            Err(RoomError::NotJoinable(room_id.to_string()))
        }
    }
}

/// Host moves the room from waiting to playing
pub async fn start_match<S: RoomStore>(store: &S, room_id: &str, participant: &str) -> Result<RoomDocument, RoomError> {
    let outcome = store
        .update_when(
            room_id,
            |doc| doc.is_host(participant) && doc.status == RoomStatus::Waiting,
            vec![RoomUpdate::SetStatus(RoomStatus::Playing)],
        )
        .await
        .map_err(RoomError::from_store)?;

    match outcome {
        Guarded::Applied(doc) => {
            log::info!("Room {} started by {}", room_id, participant);
            Ok(doc)
        }
        Guarded::Refused(doc) if !doc.is_host(participant) => Err(RoomError::NotHost {
            room: room_id.to_string(),
            participant: participant.to_string(),
        }),
        Guarded::Refused(doc) if doc.status == RoomStatus::Playing => Ok(doc),
        Guarded::Refused(_) => Err(RoomError::NotJoinable(room_id.to_string())),
    }
}

/// Host moves the room from playing to finished.
/// Rooms that are not playing are returned unchanged.
pub async fn finish_match<S: RoomStore>(store: &S, room_id: &str, participant: &str) -> Result<RoomDocument, RoomError> {
    let outcome = store
        .update_when(
            room_id,
            |doc| doc.is_host(participant) && doc.status == RoomStatus::Playing,
            vec![RoomUpdate::SetStatus(RoomStatus::Finished)],
        )
        .await
        .map_err(RoomError::from_store)?;

    match outcome {
        Guarded::Applied(doc) => {
            log::info!("Room {} finished by {}", room_id, participant);
            Ok(doc)
        }
        Guarded::Refused(doc) if !doc.is_host(participant) => Err(RoomError::NotHost {
            room: room_id.to_string(),
            participant: participant.to_string(),
        }),
        Guarded::Refused(doc) => Ok(doc),
    }
}

/// Remove a participant; the room is deleted once nobody is left
pub async fn leave_room<S: RoomStore>(store: &S, room_id: &str, participant: &str) -> Result<LeaveOutcome, RoomError> {
    let outcome = store
        .update_when(
            room_id,
            |doc| doc.players.contains_key(participant),
            vec![RoomUpdate::RemovePlayer(participant.to_string())],
        )
        .await
        .map_err(RoomError::from_store)?;

    let doc = match outcome {
        Guarded::Applied(doc) => doc,
        Guarded::Refused(_) => return Ok(LeaveOutcome::NotMember),
    };
    log::info!("Participant {} left room {}", participant, room_id);

    if !doc.players.is_empty() {
        return Ok(LeaveOutcome::Left(doc));
    }

    match store.delete(room_id).await {
        // Someone else already removed it
        Ok(()) | Err(StoreError::NotFound(_)) => Ok(LeaveOutcome::RoomDeleted),
        Err(err) => Err(RoomError::Store(err)),
    }
}

/// All rooms, oldest first
pub async fn list_rooms<S: RoomStore>(store: &S) -> Result<Vec<(RoomId, RoomDocument)>, RoomError> {
    store.list().await.map_err(RoomError::from_store)
}
