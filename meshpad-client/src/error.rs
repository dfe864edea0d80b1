use meshpad_core::ProtocolError;
use thiserror::Error;

/// Failure of a peer-link operation.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The operation is not valid in the link's current negotiation state.
    #[error("cannot {op} while signaling state is {state}")]
    UnexpectedState { op: &'static str, state: String },

    /// The link was torn down while the operation was in flight.
    #[error("peer link is closed")]
    Closed,

    #[error("webrtc error: {0}")]
    Transport(#[from] webrtc::Error),

    #[error("invalid session description: {0}")]
    Description(String),

    #[error("data channel is not open")]
    ChannelNotOpen,
}

/// A data-channel frame that cannot be joined into a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame of {0} bytes is shorter than its header")]
    Truncated(usize),

    #[error("frame {index} of message {message_id} arrived out of sequence")]
    OutOfSequence { message_id: u32, index: u32 },

    #[error("message of {0} bytes exceeds the size limit")]
    TooLarge(usize),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("session has already shut down")]
    Closed,

    #[error("timed out waiting for session state")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to decode document update: {0}")]
    Decode(String),

    #[error("failed to apply document update: {0}")]
    Apply(String),
}
