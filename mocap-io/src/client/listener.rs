//! Scene observers
//!
//! Observers are told about two kinds of change:
//!
//! - [`SceneEvent::StructureChanged`]: actors or devices were replaced by a new
//!   model definition. Cached indices or references must be looked up again.
//! - [`SceneEvent::DataUpdated`]: a frame updated positions, rotations and
//!   channel values in place.
//!
//! Callbacks run on whichever thread decoded the packet (the caller of
//! `connect()`/`update()` or the stream receiver) while the scene lock is
//! held. They must return quickly and must not call back into the client.
//! Consumers that want to do more work can [`subscribe`](ListenerRegistry::subscribe)
//! to a channel instead.

use crate::scene::{Actor, Device, NamePattern, Scene};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use std::sync::Arc;

/// Kind of scene change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEvent {
    StructureChanged,
    DataUpdated,
}

/// Observer of scene changes
pub trait SceneListener: Send + Sync {
    fn on_scene_event(&self, event: SceneEvent, scene: &Scene);
}

impl<F> SceneListener for F
where
    F: Fn(SceneEvent, &Scene) + Send + Sync,
{
    fn on_scene_event(&self, event: SceneEvent, scene: &Scene) {
        self(event, scene)
    }
}

/// Registered observers and channel subscribers
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn SceneListener>>,
    subscribers: Vec<Sender<SceneEvent>>,
}

#[inline]
fn same_listener(a: &Arc<dyn SceneListener>, b: &Arc<dyn SceneListener>) -> bool {
    // Compare data pointers only; vtable pointers are not unique
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; false if this exact listener is already registered
    pub fn add(&mut self, listener: Arc<dyn SceneListener>) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Remove a listener; false if it was not registered
    pub fn remove(&mut self, listener: &Arc<dyn SceneListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !same_listener(l, listener));
        self.listeners.len() != before
    }

    pub fn contains(&self, listener: &Arc<dyn SceneListener>) -> bool {
        self.listeners.iter().any(|l| same_listener(l, listener))
    }

    /// Channel receiving every event; events are dropped while it is full
    pub fn subscribe(&mut self, capacity: usize) -> Receiver<SceneEvent> {
        let (tx, rx) = bounded(capacity.max(1));
        self.subscribers.push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver an event to every listener and subscriber
    pub fn notify(&mut self, event: SceneEvent, scene: &Scene) {
        for listener in &self.listeners {
            listener.on_scene_event(event, scene);
        }

        self.subscribers.retain(|tx| match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("Subscriber queue full, dropping {:?}", event);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

// ============================================================================
// Named entity adapters
// ============================================================================

/// Observer of a single actor
pub trait ActorListener: Send + Sync {
    /// Scene structure changed; `None` if no actor matches any more
    fn actor_changed(&self, actor: Option<&Actor>);
    /// New frame data for the actor
    fn actor_updated(&self, actor: &Actor);
}

/// Binds an [`ActorListener`] to the actor matching a name pattern
///
/// The pattern is resolved again on every structure change, so the listener
/// follows an actor across model definition reloads.
pub struct ActorWatch<L> {
    pattern: NamePattern,
    resolved: Mutex<Option<usize>>,
    listener: L,
}

impl<L: ActorListener> ActorWatch<L> {
    pub fn new(actor_name: &str, listener: L) -> Self {
        Self {
            pattern: NamePattern::lenient(actor_name),
            resolved: Mutex::new(None),
            listener,
        }
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }
}

impl<L: ActorListener> SceneListener for ActorWatch<L> {
    fn on_scene_event(&self, event: SceneEvent, scene: &Scene) {
        match event {
            SceneEvent::StructureChanged => {
                let idx = scene.actor_index_matching(&self.pattern);
                *self.resolved.lock() = idx;
                self.listener.actor_changed(idx.map(|i| &scene.actors[i]));
            }
            SceneEvent::DataUpdated => {
                let idx = *self.resolved.lock();
                if let Some(actor) = idx.and_then(|i| scene.actors.get(i)) {
                    self.listener.actor_updated(actor);
                }
            }
        }
    }
}

/// Observer of a single device
pub trait DeviceListener: Send + Sync {
    fn device_changed(&self, device: Option<&Device>);
    fn device_updated(&self, device: &Device);
}

/// Binds a [`DeviceListener`] to the device matching a name pattern
pub struct DeviceWatch<L> {
    pattern: NamePattern,
    resolved: Mutex<Option<usize>>,
    listener: L,
}

impl<L: DeviceListener> DeviceWatch<L> {
    pub fn new(device_name: &str, listener: L) -> Self {
        Self {
            pattern: NamePattern::lenient(device_name),
            resolved: Mutex::new(None),
            listener,
        }
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }
}

impl<L: DeviceListener> SceneListener for DeviceWatch<L> {
    fn on_scene_event(&self, event: SceneEvent, scene: &Scene) {
        match event {
            SceneEvent::StructureChanged => {
                let idx = scene.device_index_matching(&self.pattern);
                *self.resolved.lock() = idx;
                self.listener.device_changed(idx.map(|i| &scene.devices[i]));
            }
            SceneEvent::DataUpdated => {
                let idx = *self.resolved.lock();
                if let Some(device) = idx.and_then(|i| scene.devices.get(i)) {
                    self.listener.device_updated(device);
                }
            }
        }
    }
}
