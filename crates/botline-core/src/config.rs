use std::path::{Path, PathBuf};
use std::time::Duration;

/// Knobs for the core. Everything has a sensible default; tests shrink the
/// timing values so the poll loop turns over quickly.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    /// Per-chat retention bound: oldest messages are evicted once a chat's
    /// log grows past this.
    pub message_cap: usize,
    /// Server-side long-poll wait passed to the provider.
    pub poll_wait: Duration,
    /// Fixed delay between poll attempts. Bounds busy-looping on persistent
    /// failure; the provider's long-poll wait already throttles the success
    /// path.
    pub poll_interval: Duration,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            message_cap: 500,
            poll_wait: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new("botline_data")
    }
}
