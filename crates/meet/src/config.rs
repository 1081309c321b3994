use std::time::Duration;

/// Tunables for the meet core. The web binary fills these from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Counter value issued numbers start above; the first chest number is `seed + 1`.
    pub chest_number_seed: i32,
    pub allocator_max_attempts: u32,
    /// Linear backoff step between contended allocation attempts.
    pub allocator_backoff: Duration,
    /// Upper bound on every individual storage call.
    pub store_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chest_number_seed: 100,
            allocator_max_attempts: 3,
            allocator_backoff: Duration::from_millis(10),
            store_timeout: Duration::from_secs(5),
        }
    }
}
