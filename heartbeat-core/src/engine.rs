//! Protocol engine: decides, per inbound topic, whether to publish and which counters move.
//!
//! One engine serves both roles. The initiator (pinger) answers every event with a Ping
//! until it has received `limit` Pongs; the responder (ponger) answers Pings only.

use tracing::{debug, info};

use crate::counters::CounterStore;
use crate::gateway::{self, HostCallError, HostGateway};
use crate::protocol::Role;

/// What the engine did with one event.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Reaction {
    /// Emitted the role's topic; the sent counter moved.
    Published,
    /// Topic is not one this role reacts to. Nothing moved.
    Ignored,
    /// Pinger only: the receive counter reached the limit, so no Ping was sent.
    LimitReached,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProtocolEngine {
    role: Role,
    limit: u64,
    binding: String,
}

impl ProtocolEngine {
    pub fn new(role: Role, limit: u64, binding: impl Into<String>) -> Self {
        Self {
            role,
            limit,
            binding: binding.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Binding that outbound events are addressed to.
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// Run one event through the state machine. The limit is checked before any publish
    /// decision. A failed publish is returned as-is and leaves the sent counter untouched.
    pub fn evaluate<G: HostGateway + ?Sized>(
        &self,
        topic: &str,
        counters: &mut CounterStore,
        gateway: &mut G,
    ) -> Result<Reaction, HostCallError> {
        if topic == self.role.inspected_topic() {
            let received = counters.increment(self.role.received_counter());
            debug!(role = self.role.name(), topic, received, "inspected topic received");
            if self.role == Role::Pinger && received >= self.limit {
                info!(limit = self.limit, received, "limit reached, exchange complete");
                return Ok(Reaction::LimitReached);
            }
        } else if self.role == Role::Ponger {
            debug!(topic, "ponger ignores topic");
            return Ok(Reaction::Ignored);
        }

        let emitted = self.role.emitted_topic();
        gateway::publish_topic(gateway, &self.binding, emitted)?;
        let sent = counters.increment(self.role.sent_counter());
        info!(binding = %self.binding, topic = emitted, sent, "published");
        Ok(Reaction::Published)
    }
}
