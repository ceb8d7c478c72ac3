use std::{num::NonZeroUsize, sync::Arc};
use tokio::sync::{mpsc, oneshot, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::{
    error::SignalingError,
    registry::ConnectionRegistry,
    room::{Departure, RoomTable},
    signal::{ConnectionId, PeerInfo, ServerMessage},
};

/// Tunables for the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue. A connection whose queue fills up is dropped.
    pub queue_capacity: NonZeroUsize,
    /// Only relay `offer`/`answer`/`ice-candidate` between members of the same room.
    pub room_scoped_signals: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: NonZeroUsize::new(64).unwrap_or(NonZeroUsize::MIN),
            room_scoped_signals: false,
        }
    }
}

/// Connection registry and room table behind one lock.
#[derive(Debug, Default)]
pub(crate) struct HubState {
    pub registry: ConnectionRegistry,
    pub rooms: RoomTable,
}

/// The signaling hub, shared by every connection task.
#[derive(Debug, Clone, Default)]
pub struct Hub {
    state: Arc<RwLock<HubState>>,
    config: HubConfig,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            state: Arc::default(),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new transport connection.
    ///
    /// Returns its id, its outbound queue, and a receiver that resolves once
    /// the hub has dropped the connection.
    pub async fn connect(
        &self,
    ) -> (ConnectionId, mpsc::Receiver<String>, oneshot::Receiver<()>) {
        let (sender, receiver) = mpsc::channel(self.config.queue_capacity.get());
        let (closer, closed) = oneshot::channel();
        let id = self.state.write().await.registry.register(sender, closer);
        (id, receiver, closed)
    }

    /// Current members of a room.
    pub async fn members(&self, room: &str) -> Vec<PeerInfo> {
        self.state
            .read()
            .await
            .rooms
            .members(room)
            .map(|(id, name)| PeerInfo {
                id,
                name: name.to_string(),
            })
            .collect()
    }

    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.registry.len()
    }

    /// The room a connection currently belongs to.
    pub async fn room_of(&self, id: &ConnectionId) -> Option<String> {
        self.state.read().await.registry.room_of(id).map(str::to_string)
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, HubState> {
        self.state.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, HubState> {
        self.state.write().await
    }
}

impl HubState {
    /// Queue a message for one connection.
    pub fn send(&self, to: &ConnectionId, message: &ServerMessage) -> Result<(), SignalingError> {
        self.registry.try_send(to, message.to_string())
    }

    /// Queue a message for every member of a room except `skip`.
    ///
    /// Returns the members that could not take the message and must be evicted.
    pub fn broadcast(
        &self,
        room: &str,
        message: &ServerMessage,
        skip: Option<&ConnectionId>,
    ) -> Vec<ConnectionId> {
        let text = message.to_string();
        let mut failed = Vec::new();
        for (member, _) in self.rooms.members(room) {
            if Some(&member) == skip {
                continue;
            }
            match self.registry.try_send(&member, text.clone()) {
                Ok(()) => {}
                Err(e) if e.evicts() => {
                    warn!("{member} -> {room}: {e}");
                    failed.push(member);
                }
                // Room members always have a registry record
                Err(e) => debug!("{member} -> {room}: {e}"),
            }
        }
        failed
    }

    /// Take `id` out of `room` and tell the remaining members.
    ///
    /// Returns members that failed to receive the announcement.
    pub fn vacate(&mut self, room: &str, id: ConnectionId) -> Vec<ConnectionId> {
        match self.rooms.leave(room, &id) {
            Some(Departure::Closed) => {
                info!("Room {room:?} is empty, closing it");
                Vec::new()
            }
            Some(Departure::Left { remaining }) => {
                info!("{id} left {room:?}, {remaining} remaining");
                self.broadcast(room, &ServerMessage::Leave { id }, None)
            }
            None => Vec::new(),
        }
    }

    /// Drop connections from the hub, announcing each departure to its room.
    ///
    /// Members that cannot take the announcement are dropped as well.
    pub fn remove_connections(&mut self, ids: impl IntoIterator<Item = ConnectionId>) {
        let mut pending: Vec<ConnectionId> = ids.into_iter().collect();
        while let Some(id) = pending.pop() {
            let Some(mut connection) = self.registry.deregister(&id) else {
                continue;
            };
            debug!("Deregistered {id} ({})", connection.name);
            let room = connection.room.take();
            connection.close();
            if let Some(room) = room {
                let failed = self.vacate(&room, id);
                pending.extend(failed);
            }
        }
    }

    /// Evict connections whose outbound queues failed.
    pub fn evict(&mut self, ids: Vec<ConnectionId>) {
        if ids.is_empty() {
            return;
        }
        for id in &ids {
            warn!("Evicting {id}: outbound queue unavailable");
        }
        self.remove_connections(ids);
    }
}
