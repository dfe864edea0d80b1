use anyhow::{Context, Result, anyhow};
use futures::{SinkExt, StreamExt};
use meshpad_core::{Envelope, PeerId};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::relay_helpers::{QUIET_PERIOD_MS, RECV_TIMEOUT_MS};

/// A bare websocket participant that speaks the envelope protocol by hand.
pub struct TestClient {
    pub peer_id: PeerId,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        Ok(Self {
            peer_id: PeerId::new(),
            ws,
        })
    }

    /// Connects and joins `room`, consuming the occupancy broadcast the join triggers.
    pub async fn join(url: &str, room: &str) -> Result<Self> {
        let mut client = Self::connect(url).await?;
        client.send_join(room).await?;
        let envelope = client.recv_envelope().await?;
        if !matches!(envelope, Envelope::ActiveUsers { .. }) {
            return Err(anyhow!("expected active-users after join, got {:?}", envelope));
        }
        Ok(client)
    }

    pub async fn send_join(&mut self, room: &str) -> Result<()> {
        let join = json!({ "type": "join", "room": room, "peerId": self.peer_id.as_str() });
        self.send_json(&join).await
    }

    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.send_text(value.to_string()).await
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.ws
            .send(Message::Text(text.into().into()))
            .await
            .context("Failed to send frame")
    }

    pub async fn recv_text(&mut self) -> Result<String> {
        let deadline = Duration::from_millis(RECV_TIMEOUT_MS);
        loop {
            let frame = tokio::time::timeout(deadline, self.ws.next())
                .await
                .context("Timed out waiting for a frame")?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Close(_))) | None => return Err(anyhow!("connection closed")),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    pub async fn recv_envelope(&mut self) -> Result<Envelope> {
        let text = self.recv_text().await?;
        Envelope::from_json(&text).context("Relay sent an invalid envelope")
    }

    pub async fn recv_json(&mut self) -> Result<Value> {
        let text = self.recv_text().await?;
        serde_json::from_str(&text).context("Relay sent invalid JSON")
    }

    /// Succeeds if nothing arrives during the quiet period.
    pub async fn expect_silence(&mut self) -> Result<()> {
        match tokio::time::timeout(Duration::from_millis(QUIET_PERIOD_MS), self.ws.next()).await {
            Err(_) => Ok(()),
            Ok(frame) => Err(anyhow!("expected silence, got {:?}", frame)),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await.context("Failed to close")?;
        Ok(())
    }
}
