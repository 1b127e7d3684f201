//! Heartbeat protocol: topics, roles and the message shapes exchanged with the host.

use serde::{Deserialize, Serialize};

use crate::counters;

/// Published by the host once the agent is up. Kicks off the pinger.
pub const TOPIC_AGENT_STARTED: &str = "agent.started";
pub const TOPIC_PING: &str = "nginx.plugin.external.ping";
pub const TOPIC_PONG: &str = "nginx.plugin.external.pong";

/// Host bus channel and method every outbound event is published through.
pub const MESSAGE_BUS_CHANNEL: &str = "messagebus";
pub const PROCESS_METHOD: &str = "process__";

/// Which side of the exchange a module plays.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Role {
    /// Initiator. Answers every non-terminal event with a Ping and stops after `limit` Pongs.
    Pinger,
    /// Purely reactive. Answers each Ping with a Pong.
    Ponger,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Pinger => "pinger",
            Role::Ponger => "ponger",
        }
    }

    /// Topic whose arrival updates this role's receive counter.
    pub fn inspected_topic(&self) -> &'static str {
        match self {
            Role::Pinger => TOPIC_PONG,
            Role::Ponger => TOPIC_PING,
        }
    }

    /// Topic this role publishes.
    pub fn emitted_topic(&self) -> &'static str {
        match self {
            Role::Pinger => TOPIC_PING,
            Role::Ponger => TOPIC_PONG,
        }
    }

    pub fn received_counter(&self) -> &'static str {
        match self {
            Role::Pinger => counters::PONGS_RECEIVED,
            Role::Ponger => counters::PINGS_RECEIVED,
        }
    }

    pub fn sent_counter(&self) -> &'static str {
        match self {
            Role::Pinger => counters::PINGS_SENT,
            Role::Ponger => counters::PONGS_SENT,
        }
    }

    /// Counters reported in the status payload as (pings, pongs).
    pub fn status_counters(&self) -> (&'static str, &'static str) {
        match self {
            Role::Pinger => (counters::PINGS_SENT, counters::PONGS_RECEIVED),
            Role::Ponger => (counters::PINGS_RECEIVED, counters::PONGS_SENT),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Role::Ponger)
    }

    /// Topics advertised by `subscriptions_` unless the module overrides them.
    pub fn default_subscriptions(&self) -> &'static [&'static str] {
        match self {
            Role::Pinger => &[TOPIC_AGENT_STARTED],
            Role::Ponger => &[TOPIC_PING],
        }
    }
}

/// Name and version reported by `info_`. Fixed at build time.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModuleIdentity {
    pub name: String,
    pub version: String,
}

impl ModuleIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Event delivered to `process_`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Event {
    pub topic: String,
    pub data: Vec<u8>,
}

/// Event published on the host bus. Field order is part of the wire format.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub topic: String,
    pub data: String,
}

impl OutboundEvent {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            data: String::new(),
        }
    }
}

/// Reply to `process_`: the role's two tallies plus who answered.
/// Field order is part of the wire format.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub topic: String,
    pub pings: u64,
    pub pongs: u64,
    pub plugin: String,
    #[serde(rename = "async")]
    pub is_async: bool,
}
