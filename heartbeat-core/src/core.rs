//! Lifecycle dispatcher: `Module` answers the five host hooks for one guest instance.
//! Host-driven: the host passes operation name and payload, the module returns bytes or an error.

use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::counters::{self, CounterStore};
use crate::engine::ProtocolEngine;
use crate::gateway::{HostCallError, HostGateway};
use crate::protocol::{ModuleIdentity, Role};
use crate::wire::{self, DecodeError};

pub const OP_INIT: &str = "init_";
pub const OP_CLOSE: &str = "close_";
pub const OP_SUBSCRIPTIONS: &str = "subscriptions_";
pub const OP_INFO: &str = "info_";
pub const OP_PROCESS: &str = "process_";

/// One guest instance: identity, configuration, counters and the engine for its role.
/// All state is owned here and handed to the engine explicitly on every event.
pub struct Module {
    identity: ModuleIdentity,
    role: Role,
    subscriptions: Vec<String>,
    config: Config,
    engine: ProtocolEngine,
    counters: CounterStore,
}

impl Module {
    pub fn new(role: Role, identity: ModuleIdentity) -> Self {
        let config = Config::default();
        Self {
            identity,
            role,
            subscriptions: role
                .default_subscriptions()
                .iter()
                .map(|t| t.to_string())
                .collect(),
            engine: engine_for(role, &config),
            config,
            counters: CounterStore::new(),
        }
    }

    /// Replace the advertised subscription list. Independent of the topics `process_` inspects.
    pub fn with_subscriptions<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscriptions = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }

    /// Binding name used in host calls and reported as `plugin` in status payloads.
    pub fn binding(&self) -> &str {
        self.engine.binding()
    }

    /// Route a host invocation by operation name.
    pub fn handle<G: HostGateway + ?Sized>(
        &mut self,
        operation: &str,
        payload: &[u8],
        gateway: &mut G,
    ) -> Result<Vec<u8>, ModuleError> {
        match operation {
            OP_INIT => self.init(payload).map(|()| Vec::new()),
            OP_CLOSE => self.close().map(|()| Vec::new()),
            OP_SUBSCRIPTIONS => Ok(self.subscriptions()),
            OP_INFO => Ok(self.info()),
            OP_PROCESS => self.process(payload, gateway),
            other => Err(ModuleError::UnknownOperation(other.to_string())),
        }
    }

    /// Load configuration. On error the previous configuration stays active.
    pub fn init(&mut self, payload: &[u8]) -> Result<(), ModuleError> {
        let invoked = self.counters.increment(counters::INVOCATIONS_INIT);
        debug!(invoked, "init_ guest: entry");
        let config = Config::parse(payload)?;
        self.engine = engine_for(self.role, &config);
        self.config = config;
        debug!(binding = self.binding(), limit = self.config.limit, "init_ guest: exit");
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ModuleError> {
        let invoked = self.counters.increment(counters::INVOCATIONS_CLOSE);
        debug!(invoked, "close_ guest: exit");
        Ok(())
    }

    pub fn subscriptions(&mut self) -> Vec<u8> {
        let invoked = self.counters.increment(counters::INVOCATIONS_SUBSCRIPTIONS);
        debug!(invoked, topics = ?self.subscriptions, "subscriptions_ guest");
        wire::encode_subscriptions(&self.subscriptions)
    }

    pub fn info(&mut self) -> Vec<u8> {
        let invoked = self.counters.increment(counters::INVOCATIONS_INFO);
        debug!(invoked, "info_ guest");
        wire::encode_info(&self.identity)
    }

    /// Decode the event, run it through the engine and report the role's tallies.
    /// The invocation counter moves on entry, before anything can fail.
    pub fn process<G: HostGateway + ?Sized>(
        &mut self,
        payload: &[u8],
        gateway: &mut G,
    ) -> Result<Vec<u8>, ModuleError> {
        let invoked = self.counters.increment(counters::INVOCATIONS_PROCESS);
        debug!(invoked, "process_ guest: entry");

        let event = wire::decode_event(payload)?;
        let reaction = self.engine.evaluate(&event.topic, &mut self.counters, gateway)?;

        let (ping_counter, pong_counter) = self.role.status_counters();
        let out = wire::encode_status(
            &self.counters,
            self.engine.binding(),
            &event.topic,
            self.role.is_async(),
            ping_counter,
            pong_counter,
        );
        debug!(
            topic = %event.topic,
            ?reaction,
            output = %String::from_utf8_lossy(&out),
            "process_ guest: exit"
        );
        Ok(out)
    }

    /// Whether the pinger has received as many Pongs as its limit allows.
    pub fn is_complete(&self) -> bool {
        self.role == Role::Pinger
            && self.counters.get(self.role.received_counter()) >= self.engine.limit()
    }
}

fn engine_for(role: Role, config: &Config) -> ProtocolEngine {
    let binding = config.plugin_name.as_deref().unwrap_or(role.name());
    ProtocolEngine::new(role, config.limit, binding)
}

/// Any hook failure, surfaced to the host verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    HostCall(#[from] HostCallError),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Reaction;
    use crate::gateway::fakes::RecordingGateway;
    use crate::logging::capture::with_captured_logs;
    use crate::protocol::{TOPIC_AGENT_STARTED, TOPIC_PING, TOPIC_PONG};
    use std::collections::VecDeque;

    fn pinger() -> Module {
        Module::new(Role::Pinger, ModuleIdentity::new("heartbeat-pinger", "0.1.0"))
    }

    fn ponger() -> Module {
        Module::new(Role::Ponger, ModuleIdentity::new("heartbeat-ponger", "0.1.0"))
    }

    fn event(topic: &str) -> Vec<u8> {
        format!(r#"{{"topic":"{topic}","data":""}}"#).into_bytes()
    }

    #[test]
    fn scenario_limit_three() {
        let mut m = pinger();
        m.init(br#"{"plugin-name":"pinger","limit":"3"}"#).unwrap();
        let mut gw = RecordingGateway::default();
        let mut last = Vec::new();
        for _ in 0..3 {
            last = m.process(&event(TOPIC_PONG), &mut gw).unwrap();
        }
        assert_eq!(gw.calls.len(), 2);
        let status = wire::decode_status(&last).unwrap();
        assert_eq!(status.pongs, 3);
        assert_eq!(status.pings, 2);
        assert_eq!(status.plugin, "pinger");
        assert!(!status.is_async);
        assert!(m.is_complete());
    }

    #[test]
    fn scenario_ponger_answers_ping() {
        let mut m = ponger();
        m.init(br#"{"plugin-name":"ponger"}"#).unwrap();
        let mut gw = RecordingGateway::default();
        let out = m
            .process(br#"{"topic":"nginx.plugin.external.ping"}"#, &mut gw)
            .unwrap();
        assert_eq!(gw.calls.len(), 1);
        assert_eq!(gw.calls[0].0, "ponger");
        assert_eq!(gw.calls[0].3, br#"{"topic":"nginx.plugin.external.pong","data":""}"#);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"topic":"nginx.plugin.external.ping","pings":1,"pongs":1,"plugin":"ponger","async":true}"#
        );
    }

    #[test]
    fn scenario_empty_topic_only_counts_invocation() {
        let mut m = pinger();
        let mut gw = RecordingGateway::default();
        let err = m.process(br#"{"topic":""}"#, &mut gw).unwrap_err();
        assert!(matches!(err, ModuleError::Decode(DecodeError::MissingTopic)));
        assert!(gw.calls.is_empty());
        for (name, value) in m.counters().snapshot() {
            let expected = if name == counters::INVOCATIONS_PROCESS { 1 } else { 0 };
            assert_eq!(value, expected, "{name}");
        }
    }

    #[test]
    fn scenario_bad_limit_falls_back_and_logs() {
        let mut m = pinger();
        let (result, lines) = with_captured_logs(|| m.init(br#"{"limit":"lots"}"#));
        assert!(result.is_ok());
        assert_eq!(m.config().limit, crate::config::DEFAULT_LIMIT);
        assert!(lines
            .iter()
            .any(|l| l.contains("WARN") && l.contains("unparsable limit")));
    }

    #[test]
    fn malformed_init_fails_and_keeps_previous_config() {
        let mut m = ponger();
        m.init(br#"{"plugin-name":"custom","limit":"4"}"#).unwrap();
        let err = m.init(b"{not json").unwrap_err();
        assert!(matches!(err, ModuleError::Config(ConfigError::Malformed(_))));
        assert_eq!(m.binding(), "custom");
        assert_eq!(m.config().limit, 4);
        assert_eq!(m.counters().get(counters::INVOCATIONS_INIT), 2);
    }

    #[test]
    fn binding_defaults_to_role_name() {
        assert_eq!(pinger().binding(), "pinger");
        assert_eq!(ponger().binding(), "ponger");
    }

    #[test]
    fn configured_plugin_name_addresses_publishes() {
        let mut m = pinger();
        m.init(br#"{"plugin-name":"heartbeat-a","limit":"3"}"#).unwrap();
        let mut gw = RecordingGateway::default();
        let out = m.process(&event(TOPIC_AGENT_STARTED), &mut gw).unwrap();
        assert_eq!(gw.calls.len(), 1);
        assert_eq!(gw.calls[0].0, "heartbeat-a");
        assert_eq!(wire::decode_status(&out).unwrap().plugin, "heartbeat-a");

        m.init(br#"{"plugin-name":""}"#).unwrap();
        assert_eq!(m.binding(), "pinger");
    }

    #[test]
    fn malformed_event_only_counts_invocation() {
        let mut m = pinger();
        let mut gw = RecordingGateway::default();
        let err = m.process(b"not json", &mut gw).unwrap_err();
        assert!(matches!(err, ModuleError::Decode(DecodeError::Malformed(_))));
        assert!(gw.calls.is_empty());
        for (name, value) in m.counters().snapshot() {
            let expected = if name == counters::INVOCATIONS_PROCESS { 1 } else { 0 };
            assert_eq!(value, expected, "{name}");
        }
    }

    #[test]
    fn host_call_failure_surfaces() {
        let mut m = ponger();
        let mut gw = RecordingGateway::failing(5, "bus unavailable");
        let err = m.process(&event(TOPIC_PING), &mut gw).unwrap_err();
        match err {
            ModuleError::HostCall(e) => {
                assert_eq!(e.code, 5);
                assert_eq!(e.message, "bus unavailable");
            }
            other => panic!("expected HostCall, got {other:?}"),
        }
        assert_eq!(m.counters().get(counters::PONGS_SENT), 0);
    }

    #[test]
    fn info_is_stable() {
        let mut m = pinger();
        let first = m.info();
        for _ in 0..3 {
            assert_eq!(m.info(), first);
        }
        assert_eq!(first, br#"{"name":"heartbeat-pinger","version":"0.1.0"}"#);
        assert_eq!(m.counters().get(counters::INVOCATIONS_INFO), 4);
    }

    #[test]
    fn subscriptions_are_independent_of_inspected_topic() {
        let mut m = pinger();
        assert_eq!(m.subscriptions(), br#"["agent.started"]"#);
        let mut m = pinger().with_subscriptions([TOPIC_AGENT_STARTED, TOPIC_PONG]);
        assert_eq!(
            m.subscriptions(),
            br#"["agent.started","nginx.plugin.external.pong"]"#
        );
        assert_eq!(ponger().subscriptions(), br#"["nginx.plugin.external.ping"]"#);
    }

    #[test]
    fn handle_routes_operations() {
        let mut m = pinger();
        let mut gw = RecordingGateway::default();
        assert!(m.handle(OP_INIT, br#"{"limit":"2"}"#, &mut gw).unwrap().is_empty());
        assert_eq!(m.handle(OP_INFO, b"", &mut gw).unwrap(), m.info());
        assert_eq!(
            m.handle(OP_SUBSCRIPTIONS, b"", &mut gw).unwrap(),
            br#"["agent.started"]"#
        );
        assert!(!m.handle(OP_PROCESS, &event(TOPIC_AGENT_STARTED), &mut gw).unwrap().is_empty());
        assert!(m.handle(OP_CLOSE, b"", &mut gw).unwrap().is_empty());
        assert!(matches!(
            m.handle("reset_", b"", &mut gw),
            Err(ModuleError::UnknownOperation(op)) if op == "reset_"
        ));
        assert_eq!(m.counters().get(counters::INVOCATIONS_CLOSE), 1);
        assert_eq!(m.counters().get(counters::INVOCATIONS_SUBSCRIPTIONS), 1);
        assert_eq!(m.counters().get(counters::INVOCATIONS_PROCESS), 1);
    }

    /// Routes every publish to the other module and queues its events.
    #[derive(Default)]
    struct Bus {
        queue: VecDeque<(String, Vec<u8>)>,
    }

    impl HostGateway for Bus {
        fn publish(
            &mut self,
            binding: &str,
            _channel: &str,
            _method: &str,
            payload: &[u8],
        ) -> Result<(), HostCallError> {
            self.queue.push_back((binding.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn full_exchange_terminates_at_limit() {
        let mut ping = pinger();
        let mut pong = ponger();
        ping.init(br#"{"plugin-name":"pinger","limit":"5"}"#).unwrap();
        pong.init(br#"{"plugin-name":"ponger"}"#).unwrap();

        let mut bus = Bus::default();
        ping.process(&event(TOPIC_AGENT_STARTED), &mut bus).unwrap();
        let mut deliveries = 0;
        while let Some((from, payload)) = bus.queue.pop_front() {
            deliveries += 1;
            assert!(deliveries < 100, "exchange did not terminate");
            let target = if from == "pinger" { &mut pong } else { &mut ping };
            target.process(&payload, &mut bus).unwrap();
        }

        assert!(ping.is_complete());
        assert_eq!(ping.counters().get(counters::PINGS_SENT), 5);
        assert_eq!(ping.counters().get(counters::PONGS_RECEIVED), 5);
        assert_eq!(pong.counters().get(counters::PINGS_RECEIVED), 5);
        assert_eq!(pong.counters().get(counters::PONGS_SENT), 5);
        assert!(matches!(
            ping.engine.evaluate(TOPIC_PONG, &mut ping.counters, &mut bus),
            Ok(Reaction::LimitReached)
        ));
    }
}
