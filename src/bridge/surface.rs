// UI surface attachment and event delivery
// The host broadcasts to the single attached surface; the UI side fans
// events out to its own subscribers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bridge::{BridgeError, EventChannel, HostEvent};

/// Receives host events on the UI side of the boundary
pub trait UiSurface: Send + Sync {
    fn deliver(&self, event: &HostEvent) -> Result<(), BridgeError>;
}

/// Host-side sender for host → UI events.
///
/// Holds at most one attached surface. Events emitted while nothing is
/// attached are dropped.
///
/// Events are queued and delivered outside the lock, so a listener may send
/// bridge commands (and cause further events) from inside its callback.
/// Whichever caller finds the queue idle drains it; everyone else only
/// enqueues. Delivery order is emission order.
#[derive(Default)]
pub struct EventEmitter {
    outbox: Mutex<Outbox>,
}

#[derive(Default)]
struct Outbox {
    surface: Option<Arc<dyn UiSurface>>,
    queue: VecDeque<HostEvent>,
    draining: bool,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a surface, replacing any previous one
    pub fn attach(&self, surface: Arc<dyn UiSurface>) {
        let mut outbox = self.lock();
        if outbox.surface.is_some() {
            log::info!("[MessageBridge] Replacing attached UI surface");
        }
        outbox.surface = Some(surface);
    }

    pub fn detach(&self) {
        let mut outbox = self.lock();
        outbox.surface = None;
        outbox.queue.clear();
        log::info!("[MessageBridge] UI surface detached");
    }

    pub fn is_attached(&self) -> bool {
        self.lock().surface.is_some()
    }

    /// Send an event to the attached surface.
    /// Returns `true` if a surface was attached to take it.
    pub fn emit(&self, event: HostEvent) -> bool {
        let mut outbox = self.lock();
        if outbox.surface.is_none() {
            log::debug!(
                "[MessageBridge] No surface attached, dropping {} event",
                event.channel().name()
            );
            return false;
        }

        outbox.queue.push_back(event);
        if outbox.draining {
            return true;
        }

        outbox.draining = true;
        let mut reset = DrainReset {
            emitter: self,
            armed: true,
        };
        loop {
            let Some(event) = outbox.queue.pop_front() else {
                break;
            };
            // detach() clears the queue, so a surface is present here
            let Some(surface) = outbox.surface.clone() else {
                break;
            };
            drop(outbox);

            if let Err(e) = surface.deliver(&event) {
                log::warn!(
                    "[MessageBridge] Failed to deliver {} event: {}",
                    event.channel().name(),
                    e
                );
            }
            outbox = self.lock();
        }
        outbox.draining = false;
        reset.armed = false;
        true
    }
}

/// Clears the draining flag if a listener panics mid-delivery
struct DrainReset<'a> {
    emitter: &'a EventEmitter,
    armed: bool,
}

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.emitter.lock().draining = false;
        }
    }
}

/// Handle returned by `Subscriptions::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// UI-side listener registry.
///
/// Any number of listeners may subscribe to one channel; they are called in
/// registration order, once per event, in the order events arrive.
#[derive(Default)]
pub struct Subscriptions {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, EventChannel, Listener)>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, channel: EventChannel, listener: F) -> SubscriptionId
    where
        F: Fn(&HostEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, channel, listener));
        id
    }

    /// Remove a listener. Returns `false` if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self, channel: EventChannel) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, subscribed, _)| *subscribed == channel)
            .count()
    }
}

impl UiSurface for Subscriptions {
    fn deliver(&self, event: &HostEvent) -> Result<(), BridgeError> {
        let channel = event.channel();
        // Snapshot so listeners may unsubscribe while being called
        let matching: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, subscribed, _)| *subscribed == channel)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();

        for listener in matching {
            listener(event);
        }
        Ok(())
    }
}
