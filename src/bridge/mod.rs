// Message Bridge between the privileged host and the UI process
// Only the channels declared in `protocol` cross the boundary, and only as
// plain data.

mod protocol;
mod router;
mod surface;

pub use protocol::{
    BridgeError, CommandChannel, EventChannel, HostEvent, PrintFailure, UiCommand, MAX_COPIES,
};
pub use router::MessageBridge;
pub use surface::{EventEmitter, SubscriptionId, Subscriptions, UiSurface};
