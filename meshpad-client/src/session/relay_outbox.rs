use crate::signaling::SignalSink;
use async_trait::async_trait;
use meshpad_core::Envelope;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// The currently attached relay connection, if any.
#[derive(Default)]
pub(crate) struct RelayOutbox {
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl RelayOutbox {
    pub fn attach(&self, tx: mpsc::UnboundedSender<String>) {
        *self.tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }

    /// Drops the sender, which closes the connection it belonged to.
    pub fn detach(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn send_text(&self, text: String) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| tx.send(text).is_ok())
    }
}

#[async_trait]
impl SignalSink for RelayOutbox {
    async fn send_signal(&self, envelope: Envelope) {
        let json = match envelope.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {} envelope: {}", envelope.kind(), e);
                return;
            }
        };
        if !self.send_text(json) {
            debug!("Relay offline, dropping {} envelope", envelope.kind());
        }
    }
}
