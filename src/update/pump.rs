// Update event pump
// Queues service events and prompt answers and feeds them to the controller
// one at a time from a single tokio task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::update::{PromptAnswer, ServiceEvent, UpdateController, UpdatePrompt};

/// Message consumed by the pump
#[derive(Debug, Clone)]
pub enum PumpMessage {
    Service(ServiceEvent),
    Answer(UpdatePrompt, PromptAnswer),
}

/// Cloneable producer side of the pump queue
#[derive(Debug, Clone)]
pub struct PumpSender {
    tx: UnboundedSender<PumpMessage>,
}

impl PumpSender {
    /// Queue an update service event. Returns `false` once the pump is gone.
    pub fn service_event(&self, event: ServiceEvent) -> bool {
        self.tx.send(PumpMessage::Service(event)).is_ok()
    }

    /// Queue the user's answer to a prompt
    pub fn answer(&self, prompt: UpdatePrompt, answer: PromptAnswer) -> bool {
        self.tx.send(PumpMessage::Answer(prompt, answer)).is_ok()
    }
}

/// Create the pump queue
pub fn pump_channel() -> (PumpSender, UnboundedReceiver<PumpMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PumpSender { tx }, rx)
}

/// Drain the queue into the controller until every sender is dropped
pub async fn run_pump(controller: Arc<UpdateController>, mut rx: UnboundedReceiver<PumpMessage>) {
    while let Some(message) = rx.recv().await {
        match message {
            PumpMessage::Service(event) => controller.handle_service_event(event),
            PumpMessage::Answer(prompt, answer) => {
                if let Err(e) = controller.resolve_prompt(&prompt, answer) {
                    log::warn!("[UpdatePump] Prompt answer not applied: {}", e);
                }
            }
        }
    }
    log::info!("[UpdatePump] Queue closed, pump stopped");
}

/// Spawn `run_pump` on the current tokio runtime
pub fn spawn_pump(
    controller: Arc<UpdateController>,
    rx: UnboundedReceiver<PumpMessage>,
) -> JoinHandle<()> {
    tokio::spawn(run_pump(controller, rx))
}

/// Request the first update check after the configured startup delay
pub async fn startup_check(controller: Arc<UpdateController>) {
    let delay = Duration::from_secs(controller.config().startup_check_delay_secs);
    tokio::time::sleep(delay).await;
    if let Err(e) = controller.request_check() {
        log::warn!("[UpdatePump] Startup check not started: {}", e);
    }
}

/// Spawn `startup_check` on the current tokio runtime
pub fn schedule_startup_check(controller: Arc<UpdateController>) -> JoinHandle<()> {
    tokio::spawn(startup_check(controller))
}
