use axum::extract::ws::Message;

/// Errors that can occur in the lifetime of the signaling server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listening socket could not be bound.
    #[error("Unable to bind signaling server")]
    Bind(#[source] std::io::Error),

    /// The server stopped accepting connections.
    #[error("Signaling server failed")]
    Serve(#[source] std::io::Error),
}

/// An error derived from a client's websocket frame.
#[derive(Debug, thiserror::Error)]
pub enum ClientRequestError {
    #[error("Axum error")]
    Axum(#[from] axum::Error),
    #[error("Message is close")]
    Close,
    #[error("Json error")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported message type")]
    UnsupportedType(Message),
}

/// A delivery failure inside the hub. Never reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalingError {
    #[error("Unknown recipient")]
    UnknownPeer,
    #[error("Recipient outbound queue is full")]
    QueueFull,
    #[error("Recipient is disconnected")]
    Disconnected,
}

impl SignalingError {
    /// Whether the recipient should be dropped from the hub.
    pub fn evicts(&self) -> bool {
        matches!(self, SignalingError::QueueFull | SignalingError::Disconnected)
    }
}
