use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::domain::lobbies::{leave_room, LeaveOutcome};
use crate::error::RoomError;
use crate::state::entities::EnemyId;
use crate::state::room::{
    BulletSnapshot, EnemySnapshot, ParticipantId, PlayerSnapshot, RoomDocument, RoomId, RoomStatus, RoomUpdate,
};
use crate::state::room_store::{Guarded, RoomFeed, RoomStore};
use crate::utils::buffers::{SmallSyncVec, SyncEvent};

/// Bridges one local session to its shared room document.
///
/// Writes are fire-and-forget tasks whose failures are logged; reads come
/// in as full snapshots and are diffed against the last known state here.
pub struct SessionSynchronizer<S: RoomStore> {
    store: Arc<S>,
    room_id: RoomId,
    local_id: ParticipantId,
    feed: RoomFeed,

    // Last known remote state
    host_id: ParticipantId,
    status: RoomStatus,
    remote: BTreeMap<ParticipantId, PlayerSnapshot>,
    room_enemies: BTreeMap<EnemyId, EnemySnapshot>,
    room_maze: Option<Vec<String>>,
    closed: bool,

    // Last state this participant wrote
    last_published: Option<PlayerSnapshot>,
    maze_published: bool,
    last_enemies: Option<BTreeMap<EnemyId, EnemySnapshot>>,
    last_bullets: Option<BTreeMap<u32, BulletSnapshot>>,
}

impl<S: RoomStore> SessionSynchronizer<S> {
    /// Subscribe to a room the local participant has already joined
    pub fn attach(store: Arc<S>, room_id: impl Into<RoomId>, local_id: impl Into<ParticipantId>) -> Result<Self, RoomError> {
        let room_id = room_id.into();
        let mut feed = store.subscribe(&room_id).map_err(RoomError::from_store)?;
        let doc = feed
            .borrow_and_update()
            .clone()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let mut sync = Self {
            store,
            room_id,
            local_id: local_id.into(),
            feed,
            host_id: doc.host_id.clone(),
            status: doc.status,
            remote: BTreeMap::new(),
            room_enemies: BTreeMap::new(),
            room_maze: None,
            closed: false,
            last_published: None,
            maze_published: false,
            last_enemies: None,
            last_bullets: None,
        };
        sync.ingest(&doc);
        log::info!(
            "Attached {} to room {} (host: {})",
            sync.local_id,
            sync.room_id,
            sync.is_host()
        );
        Ok(sync)
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    /// The recorded host owns maze generation and enemy simulation
    pub fn is_host(&self) -> bool {
        self.host_id == self.local_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Latest snapshots of everyone but the local participant
    pub fn remote_players(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.remote.values()
    }

    /// Host-published enemies as last seen in the room
    pub fn enemies(&self) -> &BTreeMap<EnemyId, EnemySnapshot> {
        &self.room_enemies
    }

    pub fn maze_rows(&self) -> Option<&[String]> {
        self.room_maze.as_deref()
    }

    /// Fire-and-forget write, applied only while `precondition` holds
    fn spawn_update<P>(&self, precondition: P, updates: Vec<RoomUpdate>) -> JoinHandle<()>
    where
        P: FnOnce(&RoomDocument) -> bool + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let room_id = self.room_id.clone();
        tokio::spawn(async move {
            match store.update_when(&room_id, precondition, updates).await {
                Ok(Guarded::Applied(_)) => {}
                Ok(Guarded::Refused(_)) => log::debug!("Room {} update skipped", room_id),
                Err(err) => log::warn!("Room {} update failed: {}", room_id, err),
            }
        })
    }

    /// Writes from a participant that already left must not re-add it
    fn while_member(&self) -> impl FnOnce(&RoomDocument) -> bool + Send + 'static {
        let local_id = self.local_id.clone();
        move |doc| doc.players.contains_key(&local_id)
    }

    fn while_host(&self) -> impl FnOnce(&RoomDocument) -> bool + Send + 'static {
        let local_id = self.local_id.clone();
        move |doc| doc.is_host(&local_id)
    }

    /// Write the local snapshot unless it is unchanged since the last write
    pub fn publish_local(&mut self, snapshot: &PlayerSnapshot) -> Option<JoinHandle<()>> {
        if self.closed || self.last_published.as_ref() == Some(snapshot) {
            return None;
        }
        self.last_published = Some(snapshot.clone());
        Some(self.spawn_update(self.while_member(), vec![RoomUpdate::UpsertPlayer(snapshot.clone())]))
    }

    /// Host only, once per session
    pub fn publish_maze(&mut self, rows: Vec<String>) -> Option<JoinHandle<()>> {
        if self.closed || !self.is_host() || self.maze_published {
            return None;
        }
        self.maze_published = true;
        Some(self.spawn_update(self.while_host(), vec![RoomUpdate::SetMaze(rows)]))
    }

    /// Host only: push enemy and bullet state that changed since the last push
    pub fn publish_world(
        &mut self,
        enemies: BTreeMap<EnemyId, EnemySnapshot>,
        bullets: BTreeMap<u32, BulletSnapshot>,
    ) -> Option<JoinHandle<()>> {
        if self.closed || !self.is_host() {
            return None;
        }

        let mut updates = Vec::new();
        if self.last_enemies.as_ref() != Some(&enemies) {
            self.last_enemies = Some(enemies.clone());
            updates.push(RoomUpdate::SetEnemies(enemies));
        }
        if self.last_bullets.as_ref() != Some(&bullets) {
            self.last_bullets = Some(bullets.clone());
            updates.push(RoomUpdate::SetBullets(bullets));
        }

        if updates.is_empty() {
            return None;
        }
        Some(self.spawn_update(self.while_host(), updates))
    }

    /// Non-blocking check for a new room snapshot
    pub fn poll(&mut self) -> SmallSyncVec {
        if self.closed {
            return SmallSyncVec::new();
        }

        match self.feed.has_changed() {
            Ok(true) => {}
            Ok(false) => return SmallSyncVec::new(),
            // Sender dropped: the room is gone
            Err(_) => return self.close(),
        }

        let snapshot = self.feed.borrow_and_update().clone();
        match snapshot {
            Some(doc) => self.ingest(&doc),
            None => self.close(),
        }
    }

    fn close(&mut self) -> SmallSyncVec {
        let mut events = SmallSyncVec::new();
        if !self.closed {
            log::warn!("Room {} closed", self.room_id);
            self.closed = true;
            events.push(SyncEvent::RoomClosed);
        }
        events
    }

    /// Diff a full room snapshot against the last known state
    pub fn ingest(&mut self, doc: &RoomDocument) -> SmallSyncVec {
        let mut events = SmallSyncVec::new();

        if doc.status != self.status {
            self.status = doc.status;
            events.push(SyncEvent::StatusChanged(doc.status));
        }
        if doc.host_id != self.host_id {
            log::info!("Room {} host is now {}", self.room_id, doc.host_id);
            self.host_id = doc.host_id.clone();
        }

        // Remote players
        let departed: Vec<ParticipantId> = self
            .remote
            .keys()
            .filter(|id| !doc.players.contains_key(*id))
            .cloned()
            .collect();
        for id in departed {
            self.remote.remove(&id);
            events.push(SyncEvent::RemoteLeft(id));
        }

        for (id, snapshot) in doc.players.iter().filter(|(id, _)| **id != self.local_id) {
            match self.remote.get(id) {
                None => events.push(SyncEvent::RemoteJoined(snapshot.clone())),
                Some(known) if known != snapshot => events.push(SyncEvent::RemoteUpdated(snapshot.clone())),
                Some(_) => continue,
            }
            self.remote.insert(id.clone(), snapshot.clone());
        }

        // Host-owned world state
        if self.room_maze.is_none() && doc.maze.is_some() {
            self.room_maze = doc.maze.clone();
            events.push(SyncEvent::MazePublished);
        }
        if doc.enemies != self.room_enemies {
            self.room_enemies = doc.enemies.clone();
            events.push(SyncEvent::EnemiesChanged);
        }

        events
    }

    /// Remove the local participant; the room is deleted if it empties
    pub async fn leave(&mut self) -> Result<LeaveOutcome, RoomError> {
        let outcome = leave_room(self.store.as_ref(), &self.room_id, &self.local_id).await;
        self.closed = true;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lobbies::{create_room, join_room, start_match};
    use crate::error::StoreError;
    use crate::state::room::RoomMode;
    use crate::state::room_store::MemoryRoomStore;
    use crate::utils::config::Tuning;

    async fn two_player_room(store: &Arc<MemoryRoomStore>) -> RoomId {
        let tuning = Tuning::default();
        let (id, _) = create_room(store.as_ref(), "alice", RoomMode::Cooperative, &tuning).await.unwrap();
        join_room(store.as_ref(), &id, "bob", &tuning).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_attach_sees_existing_players() {
        let store = Arc::new(MemoryRoomStore::new());
        let id = two_player_room(&store).await;

        let host = SessionSynchronizer::attach(Arc::clone(&store), id.clone(), "alice").unwrap();
        let guest = SessionSynchronizer::attach(Arc::clone(&store), id, "bob").unwrap();

        assert!(host.is_host());
        assert!(!guest.is_host());
        let ids: Vec<_> = host.remote_players().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["bob"]);
    }

    #[tokio::test]
    async fn test_attach_missing_room() {
        let store = Arc::new(MemoryRoomStore::new());
        let err = SessionSynchronizer::attach(store, "gone", "alice").err().unwrap();
        assert_eq!(err, RoomError::NotFound("gone".to_string()));
    }

    #[tokio::test]
    async fn test_publish_and_poll() {
        let store = Arc::new(MemoryRoomStore::new());
        let id = two_player_room(&store).await;
        let mut host = SessionSynchronizer::attach(Arc::clone(&store), id.clone(), "alice").unwrap();
        let mut guest = SessionSynchronizer::attach(Arc::clone(&store), id, "bob").unwrap();

        let mut moved = PlayerSnapshot::fresh("bob", &Tuning::default());
        moved.position = [12.0, 5.0, 3.0];
        guest.publish_local(&moved).unwrap().await.unwrap();

        // Unchanged snapshot is not written again
        assert!(guest.publish_local(&moved).is_none());

        let events = host.poll();
        assert_eq!(events.as_slice(), &[SyncEvent::RemoteUpdated(moved.clone())]);
        assert!(host.poll().is_empty());
    }

    #[tokio::test]
    async fn test_host_publishes_world_once() {
        let store = Arc::new(MemoryRoomStore::new());
        let id = two_player_room(&store).await;
        let mut host = SessionSynchronizer::attach(Arc::clone(&store), id.clone(), "alice").unwrap();
        let mut guest = SessionSynchronizer::attach(Arc::clone(&store), id.clone(), "bob").unwrap();

        let rows = vec!["###".to_string(), "#..".to_string(), "###".to_string()];
        assert!(guest.publish_maze(rows.clone()).is_none());
        host.publish_maze(rows.clone()).unwrap().await.unwrap();
        assert!(host.publish_maze(rows.clone()).is_none());

        let mut enemies = BTreeMap::new();
        enemies.insert(3, EnemySnapshot { id: 3, position: [1.0, 4.0, 1.0], health: 50 });
        host.publish_world(enemies.clone(), BTreeMap::new()).unwrap().await.unwrap();
        assert!(host.publish_world(enemies.clone(), BTreeMap::new()).is_none());

        let events = guest.poll();
        assert!(events.contains(&SyncEvent::MazePublished));
        assert!(events.contains(&SyncEvent::EnemiesChanged));
        assert_eq!(guest.maze_rows(), Some(rows.as_slice()));
        assert_eq!(guest.enemies(), &enemies);
    }

    #[tokio::test]
    async fn test_status_leave_and_close() {
        let store = Arc::new(MemoryRoomStore::new());
        let id = two_player_room(&store).await;
        let mut host = SessionSynchronizer::attach(Arc::clone(&store), id.clone(), "alice").unwrap();
        let mut guest = SessionSynchronizer::attach(Arc::clone(&store), id.clone(), "bob").unwrap();

        start_match(store.as_ref(), &id, "alice").await.unwrap();
        assert_eq!(guest.poll().as_slice(), &[SyncEvent::StatusChanged(RoomStatus::Playing)]);
        assert_eq!(host.poll().as_slice(), &[SyncEvent::StatusChanged(RoomStatus::Playing)]);

        assert!(matches!(guest.leave().await.unwrap(), LeaveOutcome::Left(_)));
        assert_eq!(host.poll().as_slice(), &[SyncEvent::RemoteLeft("bob".to_string())]);

        assert_eq!(host.leave().await.unwrap(), LeaveOutcome::RoomDeleted);
        assert!(host.is_closed());
        assert!(host.publish_local(&PlayerSnapshot::fresh("alice", &Tuning::default())).is_none());
    }

    #[tokio::test]
    async fn test_guest_sees_room_closed() {
        let store = Arc::new(MemoryRoomStore::new());
        let id = two_player_room(&store).await;
        let mut guest = SessionSynchronizer::attach(Arc::clone(&store), id.clone(), "bob").unwrap();

        store.delete(&id).await.unwrap();
        assert_eq!(guest.poll().as_slice(), &[SyncEvent::RoomClosed]);
        assert!(guest.poll().is_empty());
    }

    /// Accepts subscriptions from an inner store but rejects every write
    struct RejectingStore(MemoryRoomStore);

    impl RoomStore for RejectingStore {
        async fn create(&self, doc: RoomDocument) -> Result<RoomId, StoreError> {
            self.0.create(doc).await
        }

        async fn get(&self, id: &str) -> Result<RoomDocument, StoreError> {
            self.0.get(id).await
        }

        async fn update(&self, _id: &str, _updates: Vec<RoomUpdate>) -> Result<RoomDocument, StoreError> {
            Err(StoreError::Rejected("permission denied".to_string()))
        }

        async fn update_when<P>(&self, _id: &str, _precondition: P, _updates: Vec<RoomUpdate>) -> Result<Guarded, StoreError>
        where
            P: FnOnce(&RoomDocument) -> bool + Send,
        {
            Err(StoreError::Rejected("permission denied".to_string()))
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            self.0.delete(id).await
        }

        fn subscribe(&self, id: &str) -> Result<RoomFeed, StoreError> {
            self.0.subscribe(id)
        }

        async fn list(&self) -> Result<Vec<(RoomId, RoomDocument)>, StoreError> {
            self.0.list().await
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_logged_not_fatal() {
        let inner = MemoryRoomStore::new();
        let doc = RoomDocument::new(PlayerSnapshot::fresh("alice", &Tuning::default()), RoomMode::Competitive);
        let id = inner.create(doc).await.unwrap();
        let store = Arc::new(RejectingStore(inner));

        let mut sync = SessionSynchronizer::attach(Arc::clone(&store), id.clone(), "alice").unwrap();
        let mut snapshot = PlayerSnapshot::fresh("alice", &Tuning::default());
        snapshot.kills = 4;

        // The write task completes without panicking
        sync.publish_local(&snapshot).unwrap().await.unwrap();
        assert!(sync.poll().is_empty());
        assert_eq!(store.get(&id).await.unwrap().players["alice"].kills, 0);
    }
}
