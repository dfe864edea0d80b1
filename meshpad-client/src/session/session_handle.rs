use crate::error::SessionError;
use crate::mesh::MeshEvent;
use crate::session::SessionState;
use meshpad_core::{PeerId, RoomId};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub(crate) enum SessionCommand {
    Leave,
}

/// Caller's side of a running session. Dropping it leaves the room.
pub struct SessionHandle {
    peer_id: PeerId,
    room: RoomId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    presence: watch::Receiver<usize>,
    events: Option<mpsc::UnboundedReceiver<MeshEvent>>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub(crate) fn new(
        peer_id: PeerId,
        room: RoomId,
        commands: mpsc::UnboundedSender<SessionCommand>,
        state: watch::Receiver<SessionState>,
        presence: watch::Receiver<usize>,
        events: mpsc::UnboundedReceiver<MeshEvent>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            peer_id,
            room,
            commands,
            state,
            presence,
            events: Some(events),
            task: Some(task),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Participant count last reported by the relay.
    pub fn active_users(&self) -> usize {
        *self.presence.borrow()
    }

    pub fn presence_watch(&self) -> watch::Receiver<usize> {
        self.presence.clone()
    }

    /// Takes the event stream. Only the first call returns it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<MeshEvent>> {
        self.events.take()
    }

    /// Waits until the session reaches `target`, up to `timeout`.
    pub async fn wait_for_state(
        &self,
        target: SessionState,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let mut state = self.state.clone();
        tokio::time::timeout(timeout, state.wait_for(|s| *s == target))
            .await
            .map_err(|_| SessionError::Timeout)?
            .map_err(|_| SessionError::Closed)?;
        Ok(())
    }

    /// Leaves the room: closes every link and the relay connection, and stops
    /// reconnecting. Resolves once teardown finished.
    pub async fn leave(mut self) {
        let _ = self.commands.send(SessionCommand::Leave);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
