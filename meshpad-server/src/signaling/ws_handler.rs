use crate::signaling::{RelayConnection, RelayService};
use crate::transport::ConnectionHandle;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut connection = RelayConnection::new(service, ConnectionHandle::new(tx));
    let connection_id = connection.handle().id();
    info!("New WebSocket connection: {}", connection_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut send_task => break,

            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => connection.on_text(text.as_str()),
                Some(Ok(Message::Binary(_))) => {
                    warn!("Ignoring binary frame from connection {}", connection_id);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket error on connection {}: {}", connection_id, e);
                    break;
                }
            },
        }
    }

    send_task.abort();
    connection.close();
    info!("WebSocket disconnected: {}", connection_id);
}
