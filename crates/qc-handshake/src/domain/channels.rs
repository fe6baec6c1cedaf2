//! Shared per-channel counters.
//!
//! Each coordinator bumps the counter of its channel once when it is
//! created. Packet ids that opt into the shared counter embed its value at
//! send time, so concurrent handshakes on one channel never collide.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Increment-only map from channel name to counter.
#[derive(Debug, Default)]
pub struct ChannelCounters {
    counters: Mutex<HashMap<String, u64>>,
}

impl ChannelCounters {
    /// Create an empty counter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the channel's counter and return the new value.
    pub fn register(&self, channel: &str) -> u64 {
        let mut counters = self.counters.lock();
        let counter = counters.entry(channel.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Current value of the channel's counter (0 if never registered).
    pub fn current(&self, channel: &str) -> u64 {
        self.counters.lock().get(channel).copied().unwrap_or(0)
    }
}
