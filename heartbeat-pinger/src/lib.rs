//! Pinger guest: opens the heartbeat exchange and goes silent after `limit` Pongs.

use heartbeat_core::{Module, ModuleIdentity, Role};

/// Fresh pinger instance, identified by this crate's name and version.
pub fn module() -> Module {
    Module::new(
        Role::Pinger,
        ModuleIdentity::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    )
}

#[cfg(target_arch = "wasm32")]
#[no_mangle]
pub fn wapc_init() {
    heartbeat_core::ffi::register(module);
}
