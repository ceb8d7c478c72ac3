//! Dispatch of client envelopes to the hub.
//!
//! Every handler is fire-and-forget: envelopes that cannot be acted on are
//! logged and dropped, and the sender is never told.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    hub::Hub,
    signal::{ClientMessage, ConnectionId, PeerInfo, ServerMessage},
};

/// Handle one decoded envelope from connection `id`.
pub async fn route(hub: &Hub, id: ConnectionId, request: ClientMessage) {
    debug!("{id} <- {}", request.kind());
    match request {
        ClientMessage::Join { room, name } => on_join(hub, id, &room, name.as_deref()).await,
        ClientMessage::Offer { to, sdp } => {
            on_signal(hub, id, to, ServerMessage::Offer { from: id, sdp }).await
        }
        ClientMessage::Answer { to, sdp } => {
            on_signal(hub, id, to, ServerMessage::Answer { from: id, sdp }).await
        }
        ClientMessage::IceCandidate { to, candidate } => {
            on_signal(
                hub,
                id,
                to,
                ServerMessage::IceCandidate {
                    from: id,
                    candidate,
                },
            )
            .await
        }
        ClientMessage::Text { message } => on_text(hub, id, message).await,
        ClientMessage::Leave => on_leave(hub, id).await,
    }
}

/// Put a connection into a room, leaving any room it was already in.
pub async fn on_join(hub: &Hub, id: ConnectionId, room: &str, name: Option<&str>) {
    let room = room.trim();
    if room.is_empty() {
        warn!("{id} tried to join without a room name, ignoring");
        return;
    }
    let name = match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => id.default_name(),
    };

    let mut state = hub.write().await;
    if state.registry.get(&id).is_none() {
        debug!("{id} is no longer connected, ignoring join");
        return;
    }

    let mut failed = Vec::new();
    if let Some(previous) = state.registry.clear_room(&id) {
        info!("{id} is switching from {previous:?} to {room:?}");
        failed.extend(state.vacate(&previous, id));
    }

    let peers = state.rooms.join(room, id, &name);
    state.registry.set_identity(&id, room, &name);
    info!("{id} ({name}) joined {room:?} with {} peer(s)", peers.len());

    let joined = ServerMessage::Joined { self_id: id, peers };
    if let Err(e) = state.send(&id, &joined) {
        if e.evicts() {
            failed.push(id);
        }
    }
    failed.extend(state.broadcast(room, &ServerMessage::NewPeer { id, name }, Some(&id)));

    state.evict(failed);
}

/// Relay a directed handshake message to its target.
pub async fn on_signal(hub: &Hub, from: ConnectionId, to: ConnectionId, event: ServerMessage) {
    let result = {
        let state = hub.read().await;
        if state.registry.get(&from).is_none() {
            debug!("{from} is no longer connected, dropping signal to {to}");
            return;
        }
        let Some(target_room) = state.registry.room_of(&to) else {
            debug!("{from} -> {to}: target unknown or not joined, dropping");
            return;
        };
        if hub.config().room_scoped_signals && state.registry.room_of(&from) != Some(target_room) {
            warn!("{from} -> {to}: not in the same room, dropping");
            return;
        }
        state.send(&to, &event)
    };

    match result {
        Ok(()) => debug!("{from} -> {to}"),
        Err(e) if e.evicts() => hub.write().await.evict(vec![to]),
        Err(e) => debug!("{from} -> {to}: {e}"),
    }
}

/// Broadcast a chat message to the sender's room, sender included.
pub async fn on_text(hub: &Hub, from: ConnectionId, message: String) {
    let mut state = hub.write().await;
    let Some(connection) = state.registry.get(&from) else {
        return;
    };
    let Some(room) = connection.room.clone() else {
        debug!("{from} sent text before joining, dropping");
        return;
    };
    let sender = PeerInfo {
        id: from,
        name: connection.name.clone(),
    };
    let Some(timestamp) = state.rooms.stamp(&room, Utc::now()) else {
        return;
    };

    let event = ServerMessage::Text {
        from: sender,
        message,
        timestamp,
    };
    let failed = state.broadcast(&room, &event, None);
    state.evict(failed);
}

/// Explicit `leave`: vacate the room but keep the connection open.
pub async fn on_leave(hub: &Hub, id: ConnectionId) {
    let mut state = hub.write().await;
    let mut failed = Vec::new();
    if let Some(room) = state.registry.clear_room(&id) {
        info!("{id} is leaving {room:?}");
        failed.extend(state.vacate(&room, id));
    }
    if let Err(e) = state.send(&id, &ServerMessage::Left) {
        if e.evicts() {
            failed.push(id);
        }
    }
    state.evict(failed);
}

/// Transport closed: forget the connection and announce its departure.
pub async fn on_disconnect(hub: &Hub, id: ConnectionId) {
    info!("Removing connection {id}");
    hub.write().await.remove_connections([id]);
}
