use crate::document::{DocumentEngine, DocumentUpdate, UpdateOrigin};
use crate::error::LinkError;
use crate::link::{LinkContext, LinkEvent, LinkId, LinkState, PeerLink};
use crate::mesh::MeshEvent;
use bytes::Bytes;
use futures::future::join_all;
use meshpad_core::{IceCandidate, PeerId, SessionDescription};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Peers without a link whose candidates may be held at once.
pub const MAX_BUFFERED_PEERS: usize = 32;

/// Keeps one link per remote participant and moves document updates across them.
///
/// All methods are driven from a single task; link callbacks reach the
/// coordinator only as [`LinkEvent`]s.
pub struct MeshCoordinator {
    context: LinkContext,
    document: Arc<dyn DocumentEngine>,
    links: HashMap<PeerId, PeerLink>,
    early_candidates: HashMap<PeerId, Vec<IceCandidate>>,
    candidate_buffer_limit: usize,
    next_link_id: LinkId,
    presence: watch::Sender<usize>,
    events: mpsc::UnboundedSender<MeshEvent>,
}

impl MeshCoordinator {
    pub fn new(
        context: LinkContext,
        document: Arc<dyn DocumentEngine>,
        candidate_buffer_limit: usize,
        presence: watch::Sender<usize>,
        events: mpsc::UnboundedSender<MeshEvent>,
    ) -> Self {
        Self {
            context,
            document,
            links: HashMap::new(),
            early_candidates: HashMap::new(),
            candidate_buffer_limit,
            next_link_id: 0,
            presence,
            events,
        }
    }

    pub fn local(&self) -> &PeerId {
        &self.context.local
    }

    pub fn link(&self, peer: &PeerId) -> Option<&PeerLink> {
        self.links.get(peer)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn open_channel_count(&self) -> usize {
        self.links.values().filter(|l| l.is_channel_open()).count()
    }

    /// Number of peers with candidates held for a link that does not exist yet.
    pub fn buffered_candidate_peers(&self) -> usize {
        self.early_candidates.len()
    }

    pub fn active_users(&self) -> usize {
        *self.presence.borrow()
    }

    /// A participant joined the room: this side offers.
    pub async fn on_new_peer(&mut self, peer: PeerId) {
        if peer == self.context.local {
            return;
        }
        info!("New peer {} in room {}", peer, self.context.room);

        let link = match self.usable_link(&peer).await {
            Ok(link) => link,
            Err(e) => {
                warn!("Could not create link to {}: {}", peer, e);
                return;
            }
        };
        if let Err(e) = link.create_offer().await {
            log_link_error("create offer", &peer, &e);
        }
    }

    pub async fn on_offer(&mut self, from: PeerId, offer: SessionDescription) {
        if from == self.context.local {
            return;
        }
        let reused = self
            .links
            .get(&from)
            .is_some_and(|link| !link.state().is_terminal());

        let result = match self.usable_link(&from).await {
            Ok(link) => link.create_answer(&offer).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => debug!("Answered offer from {}", from),
            Err(LinkError::Transport(e)) if reused => {
                warn!(
                    "Renegotiation with {} failed ({}), starting a fresh link",
                    from, e
                );
                self.discard_link(&from).await;
                let retry = match self.usable_link(&from).await {
                    Ok(link) => link.create_answer(&offer).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = retry {
                    log_link_error("answer offer", &from, &e);
                }
            }
            Err(e) => log_link_error("answer offer", &from, &e),
        }
    }

    pub async fn on_answer(&mut self, from: PeerId, answer: SessionDescription) {
        let Some(link) = self.links.get(&from) else {
            warn!("Answer from {} without a link, ignoring", from);
            return;
        };
        if let Err(e) = link.apply_answer(&answer).await {
            log_link_error("apply answer", &from, &e);
        }
    }

    pub async fn on_candidate(&mut self, from: PeerId, candidate: IceCandidate) {
        if let Some(link) = self.links.get(&from) {
            if let Err(e) = link.add_candidate(candidate).await {
                log_link_error("add candidate", &from, &e);
            }
            return;
        }

        if !self.early_candidates.contains_key(&from)
            && self.early_candidates.len() >= MAX_BUFFERED_PEERS
        {
            debug!("Dropping candidate from {}: too many peers without a link", from);
            return;
        }
        let buffered = self.early_candidates.entry(from.clone()).or_default();
        if buffered.len() < self.candidate_buffer_limit {
            debug!("Holding candidate from {} until its link exists", from);
            buffered.push(candidate);
        } else {
            debug!("Dropping candidate from {}: no link and buffer full", from);
        }
        if buffered.is_empty() {
            self.early_candidates.remove(&from);
        }
    }

    pub fn on_active_users(&mut self, count: usize) {
        let changed = self.presence.send_if_modified(|current| {
            if *current == count {
                false
            } else {
                *current = count;
                true
            }
        });
        if changed {
            info!("{} participant(s) in room {}", count, self.context.room);
            let _ = self.events.send(MeshEvent::PresenceChanged(count));
        }
    }

    /// Sends a local update to every peer whose channel is open.
    pub async fn broadcast_local_update(&self, update: &DocumentUpdate) {
        if update.origin != UpdateOrigin::Local {
            return;
        }
        let sends = self
            .links
            .values()
            .filter(|link| link.is_channel_open())
            .map(|link| async move { (link.remote(), link.send(&update.payload).await) });

        for (peer, result) in join_all(sends).await {
            if let Err(e) = result {
                warn!("Failed to send update to {}: {}", peer, e);
            }
        }
    }

    pub async fn on_link_event(&mut self, event: LinkEvent) {
        let current = self
            .links
            .get(event.peer())
            .is_some_and(|link| link.id() == event.link());
        if !current {
            debug!("Ignoring event from stale link to {}", event.peer());
            return;
        }

        match event {
            LinkEvent::ChannelOpen { peer, .. } => self.on_channel_open(peer).await,
            LinkEvent::Payload { peer, data, .. } => self.on_payload(peer, data),
            LinkEvent::ChannelClosed { peer, .. } => {
                info!("Document channel with {} closed", peer);
                self.fail_link(&peer).await;
            }
            LinkEvent::IceStateChanged { peer, state, .. } => match state {
                RTCIceConnectionState::Disconnected => {
                    self.on_connectivity_lost(peer, false).await
                }
                RTCIceConnectionState::Failed => self.on_connectivity_lost(peer, true).await,
                _ => {}
            },
            LinkEvent::ConnectionStateChanged { peer, state, .. } => match state {
                RTCPeerConnectionState::Connected => {
                    if let Some(link) = self.links.get(&peer) {
                        link.advance(LinkState::Connected);
                    }
                }
                RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => {
                    warn!("Peer connection to {} is {}", peer, state);
                    self.fail_link(&peer).await
                }
                _ => {}
            },
        }
    }

    /// Closes every link and forgets all per-peer state.
    pub async fn close_all(&mut self) {
        let links: Vec<PeerLink> = self.links.drain().map(|(_, link)| link).collect();
        join_all(links.iter().map(|link| link.close())).await;
        self.early_candidates.clear();
    }

    async fn on_channel_open(&mut self, peer: PeerId) {
        let Some(link) = self.links.get(&peer) else {
            return;
        };
        link.advance(LinkState::Connected);

        let snapshot = Bytes::from(self.document.encode_full_state());
        if let Err(e) = link.send(&snapshot).await {
            warn!("Failed to send document state to {}: {}", peer, e);
        }
        let _ = self.events.send(MeshEvent::PeerConnected(peer));
    }

    fn on_payload(&mut self, peer: PeerId, data: Bytes) {
        match self.document.apply_remote_update(&data) {
            Ok(()) => {
                let _ = self.events.send(MeshEvent::DocumentChanged { from: peer });
            }
            Err(e) => warn!("Discarding bad update from {}: {}", peer, e),
        }
    }

    async fn on_connectivity_lost(&mut self, peer: PeerId, fatal: bool) {
        let Some(link) = self.links.get(&peer) else {
            return;
        };

        if link.begin_restart() {
            if link.is_offerer() {
                if let Err(e) = link.restart_ice().await {
                    log_link_error("restart ice", &peer, &e);
                }
            } else {
                debug!("Waiting for {} to restart ICE", peer);
            }
        } else if fatal {
            warn!("Link to {} failed after ICE restart", peer);
            self.fail_link(&peer).await;
        }
    }

    async fn fail_link(&mut self, peer: &PeerId) {
        if let Some(link) = self.links.remove(peer) {
            self.early_candidates.remove(peer);
            link.advance(LinkState::Failed);
            link.close().await;
            let _ = self.events.send(MeshEvent::PeerLost(peer.clone()));
        }
    }

    async fn discard_link(&mut self, peer: &PeerId) {
        if let Some(link) = self.links.remove(peer) {
            self.early_candidates.remove(peer);
            link.close().await;
        }
    }

    /// Returns the live link to `peer`, replacing a terminal one.
    async fn usable_link(&mut self, peer: &PeerId) -> Result<&PeerLink, LinkError> {
        let reusable = self
            .links
            .get(peer)
            .is_some_and(|link| !link.state().is_terminal() && !link.is_closed());
        if !reusable {
            self.discard_link(peer).await;
            self.next_link_id += 1;
            let link = PeerLink::new(self.next_link_id, peer.clone(), &self.context).await?;

            if let Some(buffered) = self.early_candidates.remove(peer) {
                for candidate in buffered {
                    if let Err(e) = link.add_candidate(candidate).await {
                        log_link_error("add buffered candidate", peer, &e);
                    }
                }
            }
            self.links.insert(peer.clone(), link);
        }

        self.links.get(peer).ok_or(LinkError::Closed)
    }
}

fn log_link_error(op: &str, peer: &PeerId, error: &LinkError) {
    match error {
        LinkError::Closed => debug!("Skipped {} for {}: link closed", op, peer),
        LinkError::UnexpectedState { .. } => warn!("Rejected {} for {}: {}", op, peer, error),
        _ => warn!("Failed to {} for {}: {}", op, peer, error),
    }
}
