// Message Bridge
// Entry point for every UI -> host message. Decodes against the declared
// channel table and routes to the update controller or print dispatcher.

use std::sync::Arc;

use serde_json::Value;

use crate::bridge::{BridgeError, EventEmitter, UiCommand, UiSurface};
use crate::print::PrintDispatcher;
use crate::update::UpdateController;

pub struct MessageBridge {
    emitter: Arc<EventEmitter>,
    updates: Arc<UpdateController>,
    printer: Arc<PrintDispatcher>,
}

impl MessageBridge {
    pub fn new(
        emitter: Arc<EventEmitter>,
        updates: Arc<UpdateController>,
        printer: Arc<PrintDispatcher>,
    ) -> Self {
        Self {
            emitter,
            updates,
            printer,
        }
    }

    /// Attach the UI surface that receives host events
    pub fn attach(&self, surface: Arc<dyn UiSurface>) {
        self.emitter.attach(surface);
    }

    pub fn detach(&self) {
        self.emitter.detach();
    }

    pub fn updates(&self) -> &Arc<UpdateController> {
        &self.updates
    }

    /// Handle a raw message from the UI.
    ///
    /// Invalid messages are logged and rejected before any handler sees
    /// them. Accepted commands are fire-and-forget; their outcome reaches the
    /// UI later as events.
    pub fn dispatch(&self, channel: &str, payload: &Value) -> Result<(), BridgeError> {
        let command = UiCommand::decode(channel, payload).map_err(|e| {
            log::warn!("[MessageBridge] Rejected message: {}", e);
            e
        })?;
        self.handle(command);
        Ok(())
    }

    /// Route a decoded command to its handler
    pub fn handle(&self, command: UiCommand) {
        match command {
            UiCommand::CheckForUpdates => {
                if let Err(e) = self.updates.request_check() {
                    log::info!("[MessageBridge] check-for-updates ignored: {}", e);
                }
            }
            UiCommand::Print(request) => {
                // failures are reported on print-error by the dispatcher
                let _ = self.printer.dispatch(request);
            }
        }
    }
}
