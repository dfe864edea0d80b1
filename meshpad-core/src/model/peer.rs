use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const PEER_ID_LEN: usize = 13;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Ephemeral identifier of one participant within a room.
///
/// Generated once per client session and reused across relay reconnects.
/// Identifiers received from the wire are kept verbatim: the relay treats
/// them as opaque strings.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Fresh random id of 13 base-36 characters.
    pub fn new() -> Self {
        let mut bits = Uuid::new_v4().as_u128();
        let mut id = String::with_capacity(PEER_ID_LEN);
        for _ in 0..PEER_ID_LEN {
            id.push(ALPHABET[(bits % 36) as usize] as char);
            bits /= 36;
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
