use crate::error::LinkError;
use crate::link::convert::{
    from_rtc_candidate, from_rtc_description, ice_servers, to_rtc_candidate, to_rtc_description,
};
use crate::link::framing::{Reassembler, split_frames};
use crate::link::{LinkEvent, LinkId, LinkState};
use crate::signaling::SignalSink;
use bytes::Bytes;
use meshpad_core::utils::{DOC_CHANNEL_ID, DOC_CHANNEL_LABEL};
use meshpad_core::{Envelope, IceCandidate, IceServerConfig, PeerId, RoomId, SessionDescription};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

/// Everything a new link needs from the session that owns it.
#[derive(Clone)]
pub struct LinkContext {
    pub local: PeerId,
    pub room: RoomId,
    pub ice_servers: Vec<IceServerConfig>,
    pub signals: Arc<dyn SignalSink>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
}

/// A direct WebRTC connection to one remote participant.
///
/// Both sides create the document channel pre-negotiated with the same id, so
/// no in-band channel announcement is needed. Remote candidates that arrive
/// before the remote description are held back and applied once it is set.
/// Payloads are split into frames on the way out and joined on the way in.
pub struct PeerLink {
    id: LinkId,
    remote: PeerId,
    local: PeerId,
    room: RoomId,
    peer_connection: Arc<RTCPeerConnection>,
    data_channel: Arc<RTCDataChannel>,
    signals: Arc<dyn SignalSink>,
    state: Mutex<LinkState>,
    pending_candidates: tokio::sync::Mutex<Vec<RTCIceCandidateInit>>,
    remote_description_set: AtomicBool,
    offered: AtomicBool,
    restart_attempted: AtomicBool,
    closed: Arc<AtomicBool>,
    next_message_id: AtomicU32,
    send_lock: tokio::sync::Mutex<()>,
    reassembler: Arc<Mutex<Reassembler>>,
}

impl PeerLink {
    pub async fn new(id: LinkId, remote: PeerId, context: &LinkContext) -> Result<Self, LinkError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers(&context.ice_servers),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);
        let closed = Arc::new(AtomicBool::new(false));

        let state_tx = context.events.clone();
        let state_peer = remote.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let peer = state_peer.clone();

                Box::pin(async move {
                    info!("Peer connection to {} is now {}", peer, state);
                    let _ = tx.send(LinkEvent::ConnectionStateChanged {
                        peer,
                        link: id,
                        state,
                    });
                })
            },
        ));

        let ice_state_tx = context.events.clone();
        let ice_state_peer = remote.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |state: RTCIceConnectionState| {
                let tx = ice_state_tx.clone();
                let peer = ice_state_peer.clone();

                Box::pin(async move {
                    debug!("ICE connection to {} is now {}", peer, state);
                    let _ = tx.send(LinkEvent::IceStateChanged {
                        peer,
                        link: id,
                        state,
                    });
                })
            },
        ));

        let ice_signals = Arc::clone(&context.signals);
        let ice_closed = Arc::clone(&closed);
        let ice_route = (context.room.clone(), remote.clone(), context.local.clone());
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let signals = Arc::clone(&ice_signals);
            let closed = Arc::clone(&ice_closed);
            let (room, to, from) = ice_route.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                if closed.load(Ordering::SeqCst) {
                    return;
                }
                let candidate = match from_rtc_candidate(&candidate) {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        warn!("Failed to serialize local candidate for {}: {}", to, e);
                        return;
                    }
                };
                signals
                    .send_signal(Envelope::Candidate {
                        candidate,
                        room,
                        to,
                        from,
                    })
                    .await;
            })
        }));

        let data_channel = peer_connection
            .create_data_channel(
                DOC_CHANNEL_LABEL,
                Some(RTCDataChannelInit {
                    ordered: Some(true),
                    negotiated: Some(DOC_CHANNEL_ID),
                    ..Default::default()
                }),
            )
            .await?;

        let open_tx = context.events.clone();
        let open_peer = remote.clone();
        data_channel.on_open(Box::new(move || {
            let tx = open_tx.clone();
            let peer = open_peer.clone();

            Box::pin(async move {
                info!("Document channel open with {}", peer);
                let _ = tx.send(LinkEvent::ChannelOpen { peer, link: id });
            })
        }));

        let reassembler = Arc::new(Mutex::new(Reassembler::new()));
        let msg_tx = context.events.clone();
        let msg_peer = remote.clone();
        let msg_reassembler = Arc::clone(&reassembler);
        data_channel.on_message(Box::new(move |msg: DataChannelMessage| {
            let tx = msg_tx.clone();
            let peer = msg_peer.clone();
            let assembled = msg_reassembler
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(msg.data);

            Box::pin(async move {
                match assembled {
                    Ok(Some(data)) => {
                        let _ = tx.send(LinkEvent::Payload {
                            peer,
                            link: id,
                            data,
                        });
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Dropping partial message from {}: {}", peer, e),
                }
            })
        }));

        let close_tx = context.events.clone();
        let close_peer = remote.clone();
        data_channel.on_close(Box::new(move || {
            let tx = close_tx.clone();
            let peer = close_peer.clone();

            Box::pin(async move {
                debug!("Document channel with {} closed", peer);
                let _ = tx.send(LinkEvent::ChannelClosed { peer, link: id });
            })
        }));

        Ok(Self {
            id,
            remote,
            local: context.local.clone(),
            room: context.room.clone(),
            peer_connection,
            data_channel,
            signals: Arc::clone(&context.signals),
            state: Mutex::new(LinkState::New),
            pending_candidates: tokio::sync::Mutex::new(Vec::new()),
            remote_description_set: AtomicBool::new(false),
            offered: AtomicBool::new(false),
            restart_attempted: AtomicBool::new(false),
            closed,
            next_message_id: AtomicU32::new(0),
            send_lock: tokio::sync::Mutex::new(()),
            reassembler,
        })
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    pub fn state(&self) -> LinkState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True once this side has sent an offer on this link.
    pub fn is_offerer(&self) -> bool {
        self.offered.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_channel_open(&self) -> bool {
        self.data_channel.ready_state() == RTCDataChannelState::Open
    }

    /// Moves the link forward; backward transitions are ignored.
    pub fn advance(&self, next: LinkState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.can_advance_to(next) {
            debug!("Link to {} moves {} -> {}", self.remote, *state, next);
            *state = next;
            true
        } else {
            false
        }
    }

    /// Starts negotiation as the offering side and sends the offer to the peer.
    pub async fn create_offer(&self) -> Result<(), LinkError> {
        self.ensure_signaling_state("create offer", RTCSignalingState::Stable)?;

        let offer = self.peer_connection.create_offer(None).await?;
        self.ensure_open()?;
        self.peer_connection.set_local_description(offer).await?;
        self.offered.store(true, Ordering::SeqCst);
        self.advance(LinkState::HaveLocalOffer);

        let offer = self.local_description().await?;
        self.ensure_open()?;
        self.signals
            .send_signal(Envelope::Offer {
                offer,
                room: self.room.clone(),
                to: self.remote.clone(),
                from: self.local.clone(),
            })
            .await;
        Ok(())
    }

    /// Applies a remote offer and sends back an answer.
    pub async fn create_answer(&self, offer: &SessionDescription) -> Result<(), LinkError> {
        self.ensure_signaling_state("create answer", RTCSignalingState::Stable)?;
        let offer = to_rtc_description(offer)?;

        self.peer_connection.set_remote_description(offer).await?;
        self.remote_description_set.store(true, Ordering::SeqCst);
        self.advance(LinkState::HaveRemoteOffer);
        self.flush_pending_candidates().await;

        let answer = self.peer_connection.create_answer(None).await?;
        self.ensure_open()?;
        self.peer_connection.set_local_description(answer).await?;

        let answer = self.local_description().await?;
        self.ensure_open()?;
        self.signals
            .send_signal(Envelope::Answer {
                answer,
                room: self.room.clone(),
                to: self.remote.clone(),
                from: self.local.clone(),
            })
            .await;
        Ok(())
    }

    /// Completes negotiation on the offering side.
    pub async fn apply_answer(&self, answer: &SessionDescription) -> Result<(), LinkError> {
        self.ensure_signaling_state("apply answer", RTCSignalingState::HaveLocalOffer)?;
        let answer = to_rtc_description(answer)?;

        self.peer_connection.set_remote_description(answer).await?;
        self.remote_description_set.store(true, Ordering::SeqCst);
        self.flush_pending_candidates().await;
        Ok(())
    }

    /// Adds a remote candidate, or queues it until the remote description is known.
    pub async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), LinkError> {
        self.ensure_open()?;
        let candidate = to_rtc_candidate(candidate);

        if !self.remote_description_set.load(Ordering::SeqCst) {
            debug!("Queueing candidate from {} until remote description", self.remote);
            self.pending_candidates.lock().await.push(candidate);
            return Ok(());
        }

        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    /// Marks the single ICE restart this link is allowed.
    /// Returns false if it was already used.
    pub fn begin_restart(&self) -> bool {
        !self.restart_attempted.swap(true, Ordering::SeqCst)
    }

    /// Sends a fresh offer with new ICE credentials.
    pub async fn restart_ice(&self) -> Result<(), LinkError> {
        self.ensure_signaling_state("restart ice", RTCSignalingState::Stable)?;

        let offer = self
            .peer_connection
            .create_offer(Some(RTCOfferOptions {
                ice_restart: true,
                ..Default::default()
            }))
            .await?;
        self.ensure_open()?;
        self.peer_connection.set_local_description(offer).await?;

        let offer = self.local_description().await?;
        info!("Restarting ICE with {}", self.remote);
        self.signals
            .send_signal(Envelope::Offer {
                offer,
                room: self.room.clone(),
                to: self.remote.clone(),
                from: self.local.clone(),
            })
            .await;
        Ok(())
    }

    pub async fn send(&self, payload: &Bytes) -> Result<(), LinkError> {
        self.ensure_open()?;
        if !self.is_channel_open() {
            return Err(LinkError::ChannelNotOpen);
        }
        // Frames of two messages must not interleave on the channel.
        let _guard = self.send_lock.lock().await;
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        for frame in split_frames(message_id, payload) {
            self.data_channel.send(&frame).await?;
        }
        Ok(())
    }

    /// Closes the connection. Callbacks fired afterwards send nothing.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.advance(LinkState::Closed);
        self.pending_candidates.lock().await.clear();
        self.reassembler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        if let Err(e) = self.peer_connection.close().await {
            debug!("Error while closing link to {}: {}", self.remote, e);
        }
    }

    fn ensure_open(&self) -> Result<(), LinkError> {
        if self.is_closed() {
            Err(LinkError::Closed)
        } else {
            Ok(())
        }
    }

    fn ensure_signaling_state(
        &self,
        op: &'static str,
        expected: RTCSignalingState,
    ) -> Result<(), LinkError> {
        self.ensure_open()?;
        let state = self.peer_connection.signaling_state();
        if state != expected {
            return Err(LinkError::UnexpectedState {
                op,
                state: state.to_string(),
            });
        }
        Ok(())
    }

    async fn local_description(&self) -> Result<SessionDescription, LinkError> {
        let description = self
            .peer_connection
            .local_description()
            .await
            .ok_or_else(|| LinkError::Description("local description missing".to_string()))?;
        from_rtc_description(&description)
    }

    async fn flush_pending_candidates(&self) {
        let pending = std::mem::take(&mut *self.pending_candidates.lock().await);
        for candidate in pending {
            if let Err(e) = self.peer_connection.add_ice_candidate(candidate).await {
                warn!("Failed to apply queued candidate from {}: {}", self.remote, e);
            }
        }
    }
}
