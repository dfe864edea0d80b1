use std::time::Duration;

use meshpad_client::{SessionConfig, YrsDocument};

/// Timeout for a relay frame to show up (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 5000;

/// Timeout for two peers to connect and converge (ms).
pub const CONVERGENCE_TIMEOUT_MS: u64 = 20000;

/// Session settings for loopback tests: no STUN, quick retries.
pub fn local_config(url: &str) -> SessionConfig {
    SessionConfig::new(url).with_ice_servers(vec![])
}

/// Polls `doc` until its text equals `expected`.
pub async fn wait_for_text(doc: &YrsDocument, expected: &str, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if doc.text() == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    doc.text() == expected
}
