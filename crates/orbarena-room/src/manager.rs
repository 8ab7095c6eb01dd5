//! Room manager: the registry mapping room codes to running rooms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use orbarena_transport::ClientHandle;
use tokio::sync::{Mutex, mpsc};

use crate::room::{EmptyNotice, spawn_room_inner};
use crate::{RoomCode, RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Tracks every active room, keyed by code.
///
/// Shared as `Arc<RoomManager<C>>` between connection handlers. It talks to
/// rooms only through their handles and never touches match state.
///
/// Rooms that lose their last client, or that nobody joins within
/// [`RoomConfig::unjoined_grace`], are removed by a background reaper.
/// The reaper re-checks under the registry lock that the room is the same
/// instance and still empty, so a client that joined in the meantime keeps
/// its room.
pub struct RoomManager<C> {
    rooms: Mutex<HashMap<RoomCode, RoomHandle<C>>>,
    config: RoomConfig,
    empty_tx: mpsc::UnboundedSender<EmptyNotice>,
    /// Distinguishes successive rooms that reuse a code.
    next_instance: AtomicU64,
}

impl<C: ClientHandle> RoomManager<C> {
    /// Creates an empty manager and starts its reaper task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: RoomConfig) -> Arc<Self> {
        let (empty_tx, empty_rx) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            config,
            empty_tx,
            next_instance: AtomicU64::new(1),
        });
        tokio::spawn(reap_empty_rooms(Arc::downgrade(&manager), empty_rx));
        manager
    }

    /// Returns the room registered under `code`, creating it if absent.
    pub async fn get_or_create(&self, code: &RoomCode) -> RoomHandle<C> {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(code) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }
        let handle = self.spawn(code.clone());
        rooms.insert(code.clone(), handle.clone());
        handle
    }

    /// Creates a room under a fresh random code.
    pub async fn create_room(&self) -> RoomHandle<C> {
        let mut rooms = self.rooms.lock().await;
        let code = loop {
            let code = RoomCode::generate();
            if !rooms.contains_key(&code) {
                break code;
            }
        };
        let handle = self.spawn(code.clone());
        rooms.insert(code, handle.clone());
        handle
    }

    /// Looks up a room without creating it.
    pub async fn get(&self, code: &RoomCode) -> Option<RoomHandle<C>> {
        self.rooms.lock().await.get(code).cloned()
    }

    /// Unregisters and stops a room.
    pub async fn remove_room(&self, code: &RoomCode) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .lock()
            .await
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.stop();
        tracing::info!(%code, "room removed");
        Ok(())
    }

    /// Lists active rooms with their player counts, sorted by code.
    ///
    /// Rooms are queried outside the registry lock; rooms that fail to
    /// answer (already stopping) are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let handles: Vec<_> = self.rooms.lock().await.values().cloned().collect();

        let mut infos = Vec::with_capacity(handles.len());
        for handle in &handles {
            if let Ok(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| a.code.cmp(&b.code));
        infos
    }

    /// Returns the number of registered rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Stops every room and clears the registry.
    pub async fn shutdown(&self) {
        let mut rooms = self.rooms.lock().await;
        for (code, handle) in rooms.drain() {
            handle.stop();
            tracing::debug!(%code, "room stopped on shutdown");
        }
    }

    /// Starts a room and schedules an emptiness check after the grace
    /// period, for rooms nobody ever joins.
    fn spawn(&self, code: RoomCode) -> RoomHandle<C> {
        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        tracing::info!(%code, instance, "room created");

        let notice = EmptyNotice {
            code: code.clone(),
            instance,
        };
        let empty_tx = self.empty_tx.clone();
        let grace = self.config.unjoined_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = empty_tx.send(notice);
        });

        spawn_room_inner(code, instance, self.config.clone(), Some(self.empty_tx.clone()))
    }

    /// Removes the room named by `notice` if it is the same instance and
    /// still has no clients.
    async fn reap(&self, notice: EmptyNotice) {
        let mut rooms = self.rooms.lock().await;
        let Some(handle) = rooms.get(&notice.code) else {
            return;
        };
        if handle.instance() != notice.instance {
            return;
        }
        // The room never waits on the registry, so asking it while holding
        // the lock cannot deadlock.
        if let Ok(info) = handle.info().await {
            if info.player_count > 0 {
                return;
            }
        }
        if let Some(handle) = rooms.remove(&notice.code) {
            handle.stop();
            tracing::info!(code = %notice.code, "empty room removed");
        }
    }
}

async fn reap_empty_rooms<C: ClientHandle>(
    manager: Weak<RoomManager<C>>,
    mut empty_rx: mpsc::UnboundedReceiver<EmptyNotice>,
) {
    while let Some(notice) = empty_rx.recv().await {
        let Some(manager) = manager.upgrade() else {
            break;
        };
        manager.reap(notice).await;
    }
}
