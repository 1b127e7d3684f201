//! Heartbeat guest modules: the ping/pong exchange run by two sandboxed plugins over the host bus.
//! Host-driven: no I/O; the host invokes hooks and the module answers, publishing through a gateway.

pub mod config;
pub mod counters;
pub mod engine;
pub mod gateway;
pub mod logging;
pub mod protocol;
pub mod wire;

pub use config::{Config, ConfigError, DEFAULT_LIMIT};
pub use counters::CounterStore;
pub use engine::{ProtocolEngine, Reaction};
pub use gateway::{HostCallError, HostGateway};
pub use protocol::{Event, ModuleIdentity, Role, StatusPayload};
pub use wire::DecodeError;
pub use crate::core::{Module, ModuleError};

pub mod core;
pub mod ffi;
