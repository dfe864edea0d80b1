use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// What a relay connection task reports back to its session.
/// `generation` identifies the connection attempt.
#[derive(Debug)]
pub(crate) enum RelayEvent {
    Opened { generation: u64 },
    Frame { generation: u64, text: String },
    Closed { generation: u64 },
}

/// Dials the relay and pumps frames until either side goes away.
///
/// Dropping every sender of `outbound` closes the connection.
pub(crate) async fn run_relay_connection(
    url: String,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<RelayEvent>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!("Failed to connect to relay {}: {}", url, e);
            let _ = events.send(RelayEvent::Closed { generation });
            return;
        }
    };
    info!("Connected to relay {}", url);
    let _ = events.send(RelayEvent::Opened { generation });

    let (mut sink, mut stream) = stream.split();
    loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        warn!("Failed to write to relay: {}", e);
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(RelayEvent::Frame {
                        generation,
                        text: text.as_str().to_owned(),
                    });
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Relay connection error: {}", e);
                    break;
                }
            },
        }
    }

    info!("Relay connection {} closed", generation);
    let _ = events.send(RelayEvent::Closed { generation });
}
