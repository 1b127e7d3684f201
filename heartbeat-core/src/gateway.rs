//! Host call gateway: the one outbound operation a module performs.

use tracing::error;

use crate::protocol::{MESSAGE_BUS_CHANNEL, PROCESS_METHOD};
use crate::wire;

/// Blocking call into the host runtime. The hook that issues it is suspended until the host answers.
pub trait HostGateway {
    fn publish(
        &mut self,
        binding: &str,
        channel: &str,
        method: &str,
        payload: &[u8],
    ) -> Result<(), HostCallError>;
}

/// Publish a `{"topic":..,"data":""}` event on the host message bus, addressed to `binding`.
pub fn publish_topic<G: HostGateway + ?Sized>(
    gateway: &mut G,
    binding: &str,
    topic: &str,
) -> Result<(), HostCallError> {
    let payload = wire::encode_outbound(topic);
    gateway
        .publish(binding, MESSAGE_BUS_CHANNEL, PROCESS_METHOD, &payload)
        .inspect_err(|e| error!(binding, topic, code = e.code, error = %e.message, "host call failed"))
}

/// Non-success answer from the host, carried verbatim.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("host call failed ({code}): {message}")]
pub struct HostCallError {
    pub code: i32,
    pub message: String,
}

impl HostCallError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
