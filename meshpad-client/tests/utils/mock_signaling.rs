use async_trait::async_trait;
use meshpad_client::SignalSink;
use meshpad_core::{Envelope, PeerId};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// SignalSink that captures every outgoing envelope.
#[derive(Clone)]
pub struct MockSignalSink {
    /// Channel to send captured envelopes.
    tx: mpsc::UnboundedSender<Envelope>,
    /// All captured envelopes (for verification).
    sent: Arc<Mutex<Vec<Envelope>>>,
}

impl MockSignalSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            sent: Arc::new(Mutex::new(Vec::new())),
        };
        (sink, rx)
    }

    /// Number of captured envelopes of the given wire kind addressed to `peer`.
    pub async fn count_for(&self, kind: &str, peer: &PeerId) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|e| e.kind() == kind)
            .filter(|e| e.route().is_some_and(|(_, to)| to == peer))
            .count()
    }
}

#[async_trait]
impl SignalSink for MockSignalSink {
    async fn send_signal(&self, envelope: Envelope) {
        tracing::debug!("[MockSignalSink] {}", envelope.kind());
        self.sent.lock().await.push(envelope.clone());
        let _ = self.tx.send(envelope);
    }
}
