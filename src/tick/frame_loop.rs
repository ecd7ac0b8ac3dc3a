use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::state::input::{InputCommand, IntentQueue};
use crate::state::room::RoomStatus;
use crate::state::room_store::RoomStore;
use crate::state::session::SessionState;
use crate::tick::sync::SessionSynchronizer;
use crate::utils::buffers::{PresentationEvent, SyncEvent};
use crate::utils::config::Config;

pub const ROOM_CLOSED_REASON: &str = "Room closed";
pub const MATCH_FINISHED_REASON: &str = "Match finished";

/// Everything the frame loop hands to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutput {
    Presentation(PresentationEvent),
    Room(SyncEvent),
}

/// Per-session frame loop - drains input, steps the simulation and keeps
/// the room document in sync. Runs at `tick_rate_hz` until input closes,
/// the presentation side goes away, or the game is over.
pub async fn run_frame_loop<S: RoomStore>(
    mut session: SessionState,
    mut input_rx: mpsc::Receiver<InputCommand>,
    events_tx: mpsc::Sender<LoopOutput>,
    mut sync: Option<SessionSynchronizer<S>>,
    config: Arc<Config>,
) -> SessionState {
    let mut tick_timer = interval(config.tick_interval());
    tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let sync_every = u64::from(config.sync_interval_ticks.max(1));
    let mut intents = IntentQueue::new();

    if let Some(sync) = sync.as_mut() {
        session.host_authority = sync.is_host();
        sync.publish_maze(session.maze.to_rows());
    }

    loop {
        tick_timer.tick().await;

        // 1. Drain intents (latest movement wins)
        let Some(frame_intents) = intents.drain(&mut input_rx) else {
            log::info!("Input closed after {} frames", session.frame);
            break;
        };

        // 2. Step the simulation synchronously
        let report = session.step(&frame_intents, Instant::now().into_std());

        // 3. Forward presentation events
        let mut attached = true;
        for event in report.events {
            attached &= forward(&events_tx, LoopOutput::Presentation(event));
        }

        // 4. Room sync - never awaited mid-frame
        if let Some(sync) = sync.as_mut() {
            for event in sync.poll() {
                for follow_up in apply_room_event(&mut session, sync, &event) {
                    attached &= forward(&events_tx, LoopOutput::Presentation(follow_up));
                }
                attached &= forward(&events_tx, LoopOutput::Room(event));
            }

            if session.frame % sync_every == 0 || session.is_over() {
                sync.publish_local(&session.local_snapshot(sync.local_id()));
                if session.host_authority {
                    sync.publish_world(session.enemy_snapshots(), session.bullet_snapshots());
                }
            }
        }

        if !attached {
            log::info!("Presentation detached, stopping frame loop");
            break;
        }
        if session.is_over() {
            break;
        }
    }

    // 5. Leave the room (deletes it when this was the last participant)
    if let Some(mut sync) = sync {
        if !sync.is_closed() {
            if let Err(err) = sync.leave().await {
                log::warn!("Failed to leave room {}: {}", sync.room_id(), err);
            }
        }
    }

    session
}

/// Drop-on-full delivery. Returns false once the receiver is gone.
fn forward(tx: &mpsc::Sender<LoopOutput>, output: LoopOutput) -> bool {
    match tx.try_send(output) {
        Ok(()) => true,
        Err(TrySendError::Full(output)) => {
            log::debug!("Presentation queue full, dropping {:?}", output);
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Session-side reaction to a room change
fn apply_room_event<S: RoomStore>(
    session: &mut SessionState,
    sync: &SessionSynchronizer<S>,
    event: &SyncEvent,
) -> Vec<PresentationEvent> {
    session.host_authority = sync.is_host();

    match event {
        SyncEvent::RoomClosed => session.end(ROOM_CLOSED_REASON).into_iter().collect(),
        SyncEvent::StatusChanged(RoomStatus::Finished) => session.end(MATCH_FINISHED_REASON).into_iter().collect(),
        SyncEvent::EnemiesChanged if !session.host_authority => session.apply_enemy_snapshots(sync.enemies()).into_vec(),
        _ => Vec::new(),
    }
}
