/// Public STUN server used when a session is not given any ICE servers.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Port the relay listens on unless configured otherwise.
pub const DEFAULT_RELAY_PORT: u16 = 5000;

/// Label of the single pre-negotiated data channel carried by every peer link.
pub const DOC_CHANNEL_LABEL: &str = "doc-sync";

/// SCTP stream id both sides use for the pre-negotiated channel.
pub const DOC_CHANNEL_ID: u16 = 0;
