//! WASM bindings for the Shift equilibration engine.

mod session;

pub use session::WasmReactionSession;
