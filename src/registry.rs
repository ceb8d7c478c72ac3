use std::collections::HashMap;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};

use crate::{error::SignalingError, signal::ConnectionId};

/// Per-connection record held by the hub.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub name: String,
    pub room: Option<String>,
    /// Bounded outbound queue drained by the connection's writer task.
    pub sender: mpsc::Sender<String>,
    /// Fired when the hub drops the connection, so its socket tasks stop.
    pub closer: oneshot::Sender<()>,
}

impl Connection {
    /// Tell the connection's socket tasks to stop.
    pub fn close(self) {
        // The socket may already be gone
        let _ = self.closer.send(());
    }
}

/// All live connections, joined or not.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    /// Create an unjoined record for a fresh connection.
    pub fn register(
        &mut self,
        sender: mpsc::Sender<String>,
        closer: oneshot::Sender<()>,
    ) -> ConnectionId {
        let mut id = ConnectionId::new();
        while self.connections.contains_key(&id) {
            id = ConnectionId::new();
        }
        self.connections.insert(
            id,
            Connection {
                id,
                name: id.default_name(),
                room: None,
                sender,
                closer,
            },
        );
        id
    }

    /// Record the room and display name chosen by `join`.
    pub fn set_identity(&mut self, id: &ConnectionId, room: &str, name: &str) -> bool {
        match self.connections.get_mut(id) {
            Some(connection) => {
                connection.room = Some(room.to_string());
                connection.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Forget the connection's room, returning it.
    pub fn clear_room(&mut self, id: &ConnectionId) -> Option<String> {
        self.connections.get_mut(id)?.room.take()
    }

    /// Remove the record. Only the first call for an id returns it.
    #[must_use]
    pub fn deregister(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn room_of(&self, id: &ConnectionId) -> Option<&str> {
        self.connections.get(id)?.room.as_deref()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Queue a message for a connection without blocking.
    pub fn try_send(&self, id: &ConnectionId, text: String) -> Result<(), SignalingError> {
        let connection = self.connections.get(id).ok_or(SignalingError::UnknownPeer)?;
        connection.sender.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => SignalingError::QueueFull,
            TrySendError::Closed(_) => SignalingError::Disconnected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_creates_unjoined_record() {
        let mut registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::channel(4);

        let id = registry.register(tx, oneshot::channel().0);

        let connection = registry.get(&id).unwrap();
        assert_eq!(connection.room, None);
        assert_eq!(connection.name, id.default_name());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let mut registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::channel(4);
        let a = registry.register(tx.clone(), oneshot::channel().0);
        let b = registry.register(tx, oneshot::channel().0);
        assert_ne!(a, b);
    }

    #[test]
    fn set_identity_rehomes_connection() {
        let mut registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::channel(4);
        let id = registry.register(tx, oneshot::channel().0);

        assert!(registry.set_identity(&id, "demo", "Alice"));
        assert_eq!(registry.room_of(&id), Some("demo"));

        assert!(registry.set_identity(&id, "other", "Alice"));
        assert_eq!(registry.room_of(&id), Some("other"));

        assert!(!registry.set_identity(&ConnectionId::new(), "demo", "Eve"));
    }

    #[test]
    fn deregister_only_once() {
        let mut registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::channel(4);
        let id = registry.register(tx, oneshot::channel().0);

        assert!(registry.deregister(&id).is_some());
        assert!(registry.deregister(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn try_send_reports_full_and_closed_queues() {
        let mut registry = ConnectionRegistry::default();
        let (tx, mut rx) = mpsc::channel(1);
        let id = registry.register(tx, oneshot::channel().0);

        assert_eq!(registry.try_send(&id, "one".to_string()), Ok(()));
        assert_eq!(
            registry.try_send(&id, "two".to_string()),
            Err(SignalingError::QueueFull)
        );
        assert_eq!(rx.try_recv().unwrap(), "one");

        drop(rx);
        assert_eq!(
            registry.try_send(&id, "three".to_string()),
            Err(SignalingError::Disconnected)
        );
        assert_eq!(
            registry.try_send(&ConnectionId::new(), "four".to_string()),
            Err(SignalingError::UnknownPeer)
        );
    }

    #[tokio::test]
    async fn closing_a_removed_connection_fires_its_closer() {
        let mut registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::channel(1);
        let (closer, closed) = oneshot::channel();
        let id = registry.register(tx, closer);

        registry.deregister(&id).unwrap().close();

        assert_eq!(closed.await, Ok(()));
    }
}
