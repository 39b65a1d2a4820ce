//! Privileged host core for a printing desktop shell.
//!
//! The UI process talks to the host only through [`bridge::MessageBridge`]:
//! update control and print dispatch go in, update status, download
//! progress and print failures come out. The update lifecycle lives in
//! [`update::UpdateController`]; print requests are forwarded by
//! [`print::PrintDispatcher`]. With the `desktop` feature, [`desktop`] wires
//! everything into a Tauri application.

pub mod bridge;
pub mod print;
pub mod update;

#[cfg(feature = "desktop")]
pub mod desktop;

pub use bridge::{BridgeError, EventEmitter, HostEvent, MessageBridge, Subscriptions, UiSurface};
pub use print::{PrintDispatcher, PrintError, PrintRequest, PrintSubsystem};
pub use update::{UpdateConfig, UpdateController, UpdateError, UpdateService, UpdateState};
