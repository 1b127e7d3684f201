//! waPC guest boundary. Each guest crate calls [`register`] from its `wapc_init` export;
//! the waPC guest SDK routes every host invocation of a registered hook to [`dispatch`].

use crate::core::Module;
use crate::gateway::HostGateway;

/// Run one host invocation against the sandbox's single instance, building it with
/// `factory` on first use. Failures are rendered with `Display` for the host.
pub fn dispatch<G: HostGateway + ?Sized>(
    slot: &mut Option<Module>,
    factory: fn() -> Module,
    operation: &str,
    payload: &[u8],
    gateway: &mut G,
) -> Result<Vec<u8>, String> {
    let module = slot.get_or_insert_with(factory);
    module
        .handle(operation, payload, gateway)
        .map_err(|e| e.to_string())
}

#[cfg(target_arch = "wasm32")]
pub use self::wapc::{register, WapcHost};

#[cfg(target_arch = "wasm32")]
mod wapc {
    use std::sync::{Mutex, OnceLock, PoisonError};

    use wapc_guest::{console_log, host_call, register_function, CallResult};

    use super::dispatch;
    use crate::core::{Module, OP_CLOSE, OP_INFO, OP_INIT, OP_PROCESS, OP_SUBSCRIPTIONS};
    use crate::gateway::{HostCallError, HostGateway};
    use crate::logging;

    /// Code reported for a failed host call; waPC signals failure without a code of its own.
    const HOST_CALL_FAILED: i32 = 0;

    /// The single instance for this sandbox. The host never re-enters, but access is still serialised.
    static MODULE: Mutex<Option<Module>> = Mutex::new(None);
    static FACTORY: OnceLock<fn() -> Module> = OnceLock::new();

    /// Gateway over the SDK's `host_call`.
    pub struct WapcHost;

    impl HostGateway for WapcHost {
        fn publish(
            &mut self,
            binding: &str,
            channel: &str,
            method: &str,
            payload: &[u8],
        ) -> Result<(), HostCallError> {
            host_call(binding, channel, method, payload)
                .map(|_| ())
                .map_err(|e| HostCallError::new(HOST_CALL_FAILED, e.to_string()))
        }
    }

    /// Install console logging and register the five hooks. Call once from `wapc_init`.
    pub fn register(factory: fn() -> Module) {
        logging::init(console_log);
        let _ = FACTORY.set(factory);
        register_function(OP_INIT, init);
        register_function(OP_CLOSE, close);
        register_function(OP_SUBSCRIPTIONS, subscriptions);
        register_function(OP_INFO, info);
        register_function(OP_PROCESS, process);
    }

    fn init(payload: &[u8]) -> CallResult {
        call(OP_INIT, payload)
    }

    fn close(payload: &[u8]) -> CallResult {
        call(OP_CLOSE, payload)
    }

    fn subscriptions(payload: &[u8]) -> CallResult {
        call(OP_SUBSCRIPTIONS, payload)
    }

    fn info(payload: &[u8]) -> CallResult {
        call(OP_INFO, payload)
    }

    fn process(payload: &[u8]) -> CallResult {
        call(OP_PROCESS, payload)
    }

    fn call(operation: &str, payload: &[u8]) -> CallResult {
        let Some(factory) = FACTORY.get().copied() else {
            return Err("guest module not registered".into());
        };
        let mut slot = MODULE.lock().unwrap_or_else(PoisonError::into_inner);
        dispatch(&mut slot, factory, operation, payload, &mut WapcHost).map_err(Into::into)
    }
}
