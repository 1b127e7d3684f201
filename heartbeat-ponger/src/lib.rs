//! Ponger guest: answers every Ping with a Pong. Has no stop condition of its own.

use heartbeat_core::{Module, ModuleIdentity, Role};

/// Fresh ponger instance, identified by this crate's name and version.
pub fn module() -> Module {
    Module::new(
        Role::Ponger,
        ModuleIdentity::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    )
}

#[cfg(target_arch = "wasm32")]
#[no_mangle]
pub fn wapc_init() {
    heartbeat_core::ffi::register(module);
}
