use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::error::ClientRequestError;

/// Server-assigned identity of one websocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Display name handed out when the client does not pick one.
    pub fn default_name(&self) -> String {
        format!("User-{}", &self.0.simple().to_string()[..5])
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A room member as seen by other members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: ConnectionId,
    pub name: String,
}

/// Envelopes sent by a browser client to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join {
        room: String,
        #[serde(default)]
        name: Option<String>,
    },
    Offer {
        to: ConnectionId,
        sdp: serde_json::Value,
    },
    Answer {
        to: ConnectionId,
        sdp: serde_json::Value,
    },
    IceCandidate {
        to: ConnectionId,
        candidate: serde_json::Value,
    },
    Text {
        message: String,
    },
    Leave,
}

/// Envelopes delivered by the hub to a browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Answer to `join`: the joiner's own id and everyone already in the room.
    Joined {
        #[serde(rename = "selfId")]
        self_id: ConnectionId,
        peers: Vec<PeerInfo>,
    },
    NewPeer {
        id: ConnectionId,
        name: String,
    },
    Offer {
        from: ConnectionId,
        sdp: serde_json::Value,
    },
    Answer {
        from: ConnectionId,
        sdp: serde_json::Value,
    },
    IceCandidate {
        from: ConnectionId,
        candidate: serde_json::Value,
    },
    Text {
        from: PeerInfo,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    Leave {
        id: ConnectionId,
    },
    /// Acknowledges an explicit `leave`.
    Left,
}

impl ClientMessage {
    /// The envelope's wire discriminator, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Offer { .. } => "offer",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::IceCandidate { .. } => "ice-candidate",
            ClientMessage::Text { .. } => "text",
            ClientMessage::Leave => "leave",
        }
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(self).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for ClientMessage {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(self).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for ServerMessage {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

/// Decode one websocket frame into a client envelope.
pub(crate) fn parse_request(
    request: Result<Message, axum::Error>,
) -> Result<ClientMessage, ClientRequestError> {
    match request? {
        Message::Text(text) => Ok(ClientMessage::from_str(&text)?),
        Message::Close(_) => Err(ClientRequestError::Close),
        m => Err(ClientRequestError::UnsupportedType(m)),
    }
}
