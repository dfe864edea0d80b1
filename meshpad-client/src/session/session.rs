use crate::config::SessionConfig;
use crate::document::{DocumentEngine, DocumentUpdate};
use crate::error::SessionError;
use crate::link::{LinkContext, LinkEvent};
use crate::mesh::{MeshCoordinator, MeshEvent};
use crate::session::SessionState;
use crate::session::relay_connection::{RelayEvent, run_relay_connection};
use crate::session::relay_outbox::RelayOutbox;
use crate::session::session_handle::{SessionCommand, SessionHandle};
use meshpad_core::{Envelope, PeerId, RoomId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// One participant's membership in one room.
///
/// The session task owns the relay connection and the mesh. It keeps
/// rejoining the relay after drops until the [`SessionHandle`] leaves or is
/// dropped.
pub struct Session {
    config: SessionConfig,
    peer_id: PeerId,
    room: RoomId,
    state_tx: watch::Sender<SessionState>,
    events: mpsc::UnboundedSender<MeshEvent>,
    mesh: MeshCoordinator,
    outbox: Arc<RelayOutbox>,
    pending_outbound: Option<mpsc::UnboundedSender<String>>,
    relay_tx: mpsc::UnboundedSender<RelayEvent>,
    relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
    generation: u64,
    reconnect_at: Option<Instant>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    doc_rx: mpsc::UnboundedReceiver<DocumentUpdate>,
}

impl Session {
    /// Joins `room` under a fresh peer id and starts the session task.
    /// Must be called from within a Tokio runtime.
    pub fn join<D: DocumentEngine>(
        config: SessionConfig,
        room: impl Into<String>,
        document: Arc<D>,
    ) -> Result<SessionHandle, SessionError> {
        let room = RoomId::new(room)?;
        let peer_id = PeerId::new();
        let document: Arc<dyn DocumentEngine> = document;

        let (command_tx, commands) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (presence_tx, presence_rx) = watch::channel(0);
        let (events, events_rx) = mpsc::unbounded_channel();
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let doc_rx = document.subscribe();
        let outbox = Arc::new(RelayOutbox::default());

        let context = LinkContext {
            local: peer_id.clone(),
            room: room.clone(),
            ice_servers: config.ice_servers.clone(),
            signals: outbox.clone(),
            events: link_tx,
        };
        let mesh = MeshCoordinator::new(
            context,
            document,
            config.candidate_buffer_limit,
            presence_tx,
            events.clone(),
        );

        let session = Session {
            config,
            peer_id: peer_id.clone(),
            room: room.clone(),
            state_tx,
            events,
            mesh,
            outbox,
            pending_outbound: None,
            relay_tx,
            relay_rx,
            generation: 0,
            reconnect_at: None,
            commands,
            link_rx,
            doc_rx,
        };
        let task = tokio::spawn(session.run());

        Ok(SessionHandle::new(
            peer_id,
            room,
            command_tx,
            state_rx,
            presence_rx,
            events_rx,
            task,
        ))
    }

    async fn run(mut self) {
        info!("Peer {} joining room {}", self.peer_id, self.room);
        self.connect();

        loop {
            let reconnect_at = self.reconnect_at;

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Leave) | None => break,
                },
                Some(event) = self.relay_rx.recv() => self.handle_relay_event(event).await,
                Some(event) = self.link_rx.recv() => self.mesh.on_link_event(event).await,
                Some(update) = self.doc_rx.recv() => self.mesh.broadcast_local_update(&update).await,
                _ = sleep_until(reconnect_at.unwrap_or_else(Instant::now)), if reconnect_at.is_some() => {
                    self.reconnect_at = None;
                    self.connect();
                }
            }
        }

        self.shutdown().await;
        info!("Peer {} left room {}", self.peer_id, self.room);
    }

    fn connect(&mut self) {
        self.generation += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending_outbound = Some(tx);
        self.set_state(SessionState::Connecting);

        tokio::spawn(run_relay_connection(
            self.config.signaling_url.clone(),
            self.generation,
            rx,
            self.relay_tx.clone(),
        ));
    }

    async fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Opened { generation } if generation == self.generation => {
                let Some(tx) = self.pending_outbound.take() else {
                    return;
                };
                let join = Envelope::Join {
                    room: self.room.clone(),
                    peer_id: self.peer_id.clone(),
                };
                match join.to_json() {
                    Ok(text) => {
                        let _ = tx.send(text);
                    }
                    Err(e) => warn!("Failed to encode join: {}", e),
                }
                self.outbox.attach(tx);
                self.set_state(SessionState::Joined);
            }
            RelayEvent::Frame { generation, text } if generation == self.generation => {
                self.dispatch(&text).await;
            }
            RelayEvent::Closed { generation } if generation == self.generation => {
                self.outbox.detach();
                self.pending_outbound = None;
                self.set_state(SessionState::Reconnecting);
                self.reconnect_at = Some(Instant::now() + self.config.reconnect_delay);
                info!(
                    "Relay connection lost, retrying in {:?}",
                    self.config.reconnect_delay
                );
            }
            stale => debug!("Ignoring {:?} from an earlier relay connection", stale),
        }
    }

    async fn dispatch(&mut self, text: &str) {
        let envelope = match Envelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Discarding malformed relay frame: {}", e);
                return;
            }
        };

        if let Some((_, to)) = envelope.route()
            && *to != self.peer_id
        {
            debug!("Ignoring {} addressed to {}", envelope.kind(), to);
            return;
        }

        match envelope {
            Envelope::NewPeer { peer_id, .. } => self.mesh.on_new_peer(peer_id).await,
            Envelope::Offer { offer, from, .. } => self.mesh.on_offer(from, offer).await,
            Envelope::Answer { answer, from, .. } => self.mesh.on_answer(from, answer).await,
            Envelope::Candidate {
                candidate, from, ..
            } => self.mesh.on_candidate(from, candidate).await,
            Envelope::ActiveUsers { count, .. } => self.mesh.on_active_users(count),
            Envelope::Join { .. } => warn!("Relay sent an unexpected join envelope"),
        }
    }

    fn set_state(&mut self, next: SessionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!("Session state is now {}", next);
            let _ = self.events.send(MeshEvent::StateChanged(next));
        }
    }

    async fn shutdown(&mut self) {
        self.reconnect_at = None;
        self.pending_outbound = None;
        self.outbox.detach();
        self.mesh.close_all().await;
        self.set_state(SessionState::Disconnected);
    }
}
