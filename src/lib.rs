#![forbid(unsafe_code)]
//! WebSocket signaling hub for voice rooms.
//!
//! Browsers join named rooms, learn about each other, and exchange the
//! session descriptions and ICE candidates needed to open direct audio
//! connections. The hub also relays short text chat to everyone in a room.
//! It never sees media.

mod error;
mod hub;
mod registry;
mod room;
mod router;
mod server;
mod signal;
mod ws;

pub use error::{ClientRequestError, Error, SignalingError};
pub use hub::{Hub, HubConfig};
pub use registry::{Connection, ConnectionRegistry};
pub use room::{Departure, Room, RoomTable};
pub use router::{on_disconnect, on_join, on_leave, on_signal, on_text, route};
pub use server::{app, health_handler, Health, Server};
pub use signal::{ClientMessage, ConnectionId, PeerInfo, ServerMessage};
