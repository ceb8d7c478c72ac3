use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    error::ClientRequestError,
    hub::Hub,
    router,
    signal::{parse_request, ConnectionId},
};

/// The handler for the HTTP request to upgrade to WebSockets.
/// This is the last point where we can extract metadata such as IP address of the client.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(origin): ConnectInfo<SocketAddr>,
    State(hub): State<Hub>,
) -> impl IntoResponse {
    info!("`{origin}` connected.");
    ws.on_upgrade(move |socket| handle_socket(socket, origin, hub))
}

/// Drain a connection's outbound queue into its socket, in order.
fn spawn_sender_task(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    id: ConnectionId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = sender.send(Message::Text(text)).await {
                debug!("{id}: socket write failed: {e}");
                break;
            }
        }
        if let Err(e) = sender.close().await {
            debug!("{id}: socket close failed: {e}");
        }
    })
}

/// Run one websocket connection to completion.
pub(crate) async fn handle_socket(socket: WebSocket, origin: SocketAddr, hub: Hub) {
    let (id, outbound, closed) = hub.connect().await;
    info!("`{origin}` registered as {id}");

    let (ws_sender, mut ws_receiver) = socket.split();
    let mut send_task = spawn_sender_task(ws_sender, outbound, id);

    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            let request = match parse_request(frame) {
                Ok(request) => request,
                Err(e) => match e {
                    ClientRequestError::Axum(_) => {
                        // Most likely a ConnectionReset or similar.
                        warn!("Unrecoverable error with {id}: {e:?}");
                        break;
                    }
                    ClientRequestError::Close => {
                        info!("Connection closed by {id}");
                        break;
                    }
                    ClientRequestError::Json(_) => {
                        error!("Dropping malformed envelope from {id}: {e:?}");
                        continue;
                    }
                    ClientRequestError::UnsupportedType(_) => {
                        debug!("Ignoring non-text frame from {id}");
                        continue;
                    }
                },
            };
            router::route(&recv_hub, id, request).await;
        }
    });

    // Any of these ends the connection: the reader on close, the writer on a
    // failed write, or the hub dropping us. A writer stuck on a client that
    // never reads only stops when aborted, which also drops the socket.
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut recv_task => {}
        _ = closed => info!("{id} was dropped by the hub, closing socket"),
    }
    send_task.abort();
    recv_task.abort();

    router::on_disconnect(&hub, id).await;
    info!("`{origin}` ({id}) disconnected");
}
