/// Timeout for an expected envelope to arrive (ms).
pub const RECV_TIMEOUT_MS: u64 = 3000;

/// How long to wait before concluding nothing more will arrive (ms).
pub const QUIET_PERIOD_MS: u64 = 300;
