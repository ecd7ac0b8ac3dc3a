use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::error::StoreError;
use crate::state::room::{RoomDocument, RoomId, RoomUpdate};

/// Change feed for one room: full document snapshots, `None` once deleted
pub type RoomFeed = watch::Receiver<Option<RoomDocument>>;

/// Result of a guarded update
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded {
    Applied(RoomDocument),
    /// Precondition failed; the document is returned unchanged
    Refused(RoomDocument),
}

/// Remote key-value document store holding rooms
pub trait RoomStore: Send + Sync + 'static {
    fn create(&self, doc: RoomDocument) -> impl Future<Output = Result<RoomId, StoreError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<RoomDocument, StoreError>> + Send;

    /// Partial field merge
    fn update(&self, id: &str, updates: Vec<RoomUpdate>) -> impl Future<Output = Result<RoomDocument, StoreError>> + Send;

    /// Partial merge applied only if `precondition` holds, checked atomically
    fn update_when<P>(
        &self,
        id: &str,
        precondition: P,
        updates: Vec<RoomUpdate>,
    ) -> impl Future<Output = Result<Guarded, StoreError>> + Send
    where
        P: FnOnce(&RoomDocument) -> bool + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn subscribe(&self, id: &str) -> Result<RoomFeed, StoreError>;

    /// All rooms, oldest first
    fn list(&self) -> impl Future<Output = Result<Vec<(RoomId, RoomDocument)>, StoreError>> + Send;
}

struct RoomEntry {
    doc: RoomDocument,
    feed: watch::Sender<Option<RoomDocument>>,
}

/// In-process store. Rooms are partitioned in a `DashMap`; every write
/// publishes the new full snapshot to subscribers.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<RoomId, RoomEntry>,
    offline: AtomicBool,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request with `Unavailable` while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("room store offline".to_string()));
        }
        Ok(())
    }

    fn apply(&self, id: &str, precondition: impl FnOnce(&RoomDocument) -> bool, updates: Vec<RoomUpdate>) -> Result<Guarded, StoreError> {
        self.check_online()?;
        let mut entry = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !precondition(&entry.doc) {
            return Ok(Guarded::Refused(entry.doc.clone()));
        }

        for update in updates {
            entry.doc.apply(update);
        }
        let snapshot = entry.doc.clone();
        entry.feed.send_replace(Some(snapshot.clone()));
        Ok(Guarded::Applied(snapshot))
    }
}

impl RoomStore for MemoryRoomStore {
    async fn create(&self, doc: RoomDocument) -> Result<RoomId, StoreError> {
        self.check_online()?;
        let id = uuid::Uuid::new_v4().to_string();
        let (feed, _) = watch::channel(Some(doc.clone()));
        self.rooms.insert(id.clone(), RoomEntry { doc, feed });
        log::info!("Created room {}", id);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<RoomDocument, StoreError> {
        self.check_online()?;
        self.rooms
            .get(id)
            .map(|entry| entry.doc.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, updates: Vec<RoomUpdate>) -> Result<RoomDocument, StoreError> {
        match self.apply(id, |_| true, updates)? {
            Guarded::Applied(doc) | Guarded::Refused(doc) => Ok(doc),
        }
    }

    async fn update_when<P>(&self, id: &str, precondition: P, updates: Vec<RoomUpdate>) -> Result<Guarded, StoreError>
    where
        P: FnOnce(&RoomDocument) -> bool + Send,
    {
        self.apply(id, precondition, updates)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.check_online()?;
        let (_, entry) = self
            .rooms
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.feed.send_replace(None);
        log::info!("Deleted room {}", id);
        Ok(())
    }

    fn subscribe(&self, id: &str) -> Result<RoomFeed, StoreError> {
        self.check_online()?;
        self.rooms
            .get(id)
            .map(|entry| entry.feed.subscribe())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<(RoomId, RoomDocument)>, StoreError> {
        self.check_online()?;
        let mut rooms: Vec<(RoomId, RoomDocument)> = self
            .rooms
            .iter()
            .map(|entry| (entry.key().clone(), entry.doc.clone()))
            .collect();
        rooms.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at).then_with(|| a.0.cmp(&b.0)));
        Ok(rooms)
    }
}
