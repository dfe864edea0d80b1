use anyhow::{Context, Result, anyhow};
use futures::{SinkExt, StreamExt};
use meshpad_core::Envelope;
use serde_json::Value;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

/// A scripted stand-in for the relay: accepts websocket connections one at a
/// time and lets the test read and write raw frames.
pub struct FakeRelay {
    listener: TcpListener,
    pub url: String,
}

impl FakeRelay {
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("ws://{}", listener.local_addr()?);
        Ok(Self { listener, url })
    }

    pub async fn accept(&self, timeout_ms: u64) -> Result<FakeRelayConnection> {
        let (stream, _) =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.listener.accept())
                .await
                .context("No client connected in time")??;
        let ws = accept_async(stream).await?;
        Ok(FakeRelayConnection { ws })
    }
}

pub struct FakeRelayConnection {
    ws: WebSocketStream<TcpStream>,
}

impl FakeRelayConnection {
    pub async fn recv_envelope(&mut self, timeout_ms: u64) -> Result<Envelope> {
        loop {
            let frame = tokio::time::timeout(Duration::from_millis(timeout_ms), self.ws.next())
                .await
                .context("Timed out waiting for a frame")?;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    return Envelope::from_json(text.as_str()).context("Client sent bad JSON");
                }
                Some(Ok(Message::Close(_))) | None => return Err(anyhow!("client went away")),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.send_text(value.to_string()).await
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.ws.send(Message::Text(text.into().into())).await?;
        Ok(())
    }

    /// Waits for the client to close the connection.
    pub async fn wait_closed(&mut self, timeout_ms: u64) -> Result<()> {
        tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            while let Some(Ok(frame)) = self.ws.next().await {
                if let Message::Close(_) = frame {
                    break;
                }
            }
        })
        .await
        .context("Client did not close the connection")
    }
}
