use async_trait::async_trait;
use meshpad_core::Envelope;

/// Outbound half of the relay connection, as seen by peer links.
///
/// Sending never fails from the caller's perspective: while the relay is
/// unreachable the envelope is dropped and negotiation recovers through the
/// next `new-peer` announcement.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send_signal(&self, envelope: Envelope);
}
