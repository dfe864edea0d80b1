use crate::room::RoomRegistry;
use std::sync::Arc;

struct RelayInner {
    registry: RoomRegistry,
}

/// Shared state of the relay, cloned into every connection handler.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new() -> Self {
        Self::with_registry(RoomRegistry::new())
    }

    pub fn with_registry(registry: RoomRegistry) -> Self {
        Self {
            inner: Arc::new(RelayInner { registry }),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.inner.registry
    }
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}
