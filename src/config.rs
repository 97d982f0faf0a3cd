//! Process-level configuration.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Environment variable read by [`NetConfig::from_env`].
pub const MAX_THREADS_ENV: &str = "CNET_MAX_THREADS";

/// Knobs for the concurrent helpers around a network.
///
/// The network's own data structures are single-threaded; `max_threads`
/// bounds helpers such as camera construction during image binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    /// Upper bound on worker threads (at least 1).
    pub max_threads: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            max_threads: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

impl NetConfig {
    pub fn with_max_threads(max_threads: usize) -> Self {
        Self { max_threads: max_threads.max(1) }
    }

    /// Defaults overridden by `CNET_MAX_THREADS` when it holds a positive
    /// integer.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_THREADS_ENV) {
            config.apply_max_threads(&raw);
        }
        config
    }

    fn apply_max_threads(&mut self, raw: &str) {
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => self.max_threads = n,
            _ => tracing::warn!(value = raw, "ignoring invalid {MAX_THREADS_ENV}"),
        }
    }
}
