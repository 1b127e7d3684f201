//! Counter store: named, monotonically increasing u64 counters owned by one module instance.

use std::collections::HashMap;

pub const INVOCATIONS_INIT: &str = "invocations.init.times";
pub const INVOCATIONS_SUBSCRIPTIONS: &str = "invocations.subs.times";
pub const INVOCATIONS_CLOSE: &str = "invocations.close.times";
pub const INVOCATIONS_INFO: &str = "invocations.info.times";
pub const INVOCATIONS_PROCESS: &str = "invocations.process.times";

pub const PINGS_SENT: &str = "nginx.heartbeat.ping.sent";
pub const PINGS_RECEIVED: &str = "nginx.heartbeat.ping.recv";
pub const PONGS_SENT: &str = "nginx.heartbeat.pong.sent";
pub const PONGS_RECEIVED: &str = "nginx.heartbeat.pong.recv";

/// Every counter a module tracks. All start at zero.
pub const ALL: [&str; 9] = [
    INVOCATIONS_INIT,
    INVOCATIONS_SUBSCRIPTIONS,
    INVOCATIONS_CLOSE,
    INVOCATIONS_INFO,
    INVOCATIONS_PROCESS,
    PINGS_SENT,
    PINGS_RECEIVED,
    PONGS_SENT,
    PONGS_RECEIVED,
];

/// Per-instance counters. Never decremented or reset; a fresh module gets a fresh store.
#[derive(Debug, Clone, Default)]
pub struct CounterStore {
    values: HashMap<String, u64>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `name` (creating it at 1 if absent). Returns the new value.
    pub fn increment(&mut self, name: &str) -> u64 {
        let value = self.values.entry(name.to_string()).or_insert(0);
        *value = value.saturating_add(1);
        *value
    }

    /// Current value of `name`, or 0 if it was never incremented.
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    /// Snapshot of the well-known counters, in declaration order.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        ALL.iter().map(|&name| (name, self.get(name))).collect()
    }
}
