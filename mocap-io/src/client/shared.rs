//! Scene state shared between the foreground client and the stream receiver.
//!
//! Lock order is always scene, then listeners.

use super::listener::{ListenerRegistry, SceneEvent, SceneListener};
use crate::error::Result;
use crate::protocol::{Codec, FrameOutcome, Response};
use crate::scene::Scene;
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Capacity of event channels handed out by `subscribe`
const SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Default)]
pub struct SharedScene {
    scene: Mutex<Scene>,
    listeners: Mutex<ListenerRegistry>,
}

impl SharedScene {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, Scene> {
        self.scene.lock()
    }

    /// Register a listener and immediately send it the current structure
    pub fn add_listener(&self, listener: Arc<dyn SceneListener>) -> bool {
        let scene = self.scene.lock();
        let mut listeners = self.listeners.lock();
        if !listeners.add(Arc::clone(&listener)) {
            return false;
        }
        listener.on_scene_event(SceneEvent::StructureChanged, &scene);
        true
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SceneListener>) -> bool {
        self.listeners.lock().remove(listener)
    }

    pub fn subscribe(&self) -> Receiver<SceneEvent> {
        self.listeners.lock().subscribe(SUBSCRIBER_CAPACITY)
    }

    /// Decode a datagram into the scene and notify listeners of the result
    ///
    /// Listeners run inside the same critical section as the mutation, so
    /// no other packet can change the scene between the two.
    pub fn dispatch(&self, codec: &mut Codec, datagram: &[u8]) -> Result<Response> {
        let response = codec.decode_with(datagram, &self.scene, |response, scene| {
            let event = match response {
                Response::ModelDefinition { .. } => SceneEvent::StructureChanged,
                Response::Frame(FrameOutcome::Applied) => SceneEvent::DataUpdated,
                _ => return,
            };
            self.listeners.lock().notify(event, scene);
        })?;

        match &response {
            Response::ModelDefinition { actors, devices } => {
                log::info!("Scene structure: {} actor(s), {} device(s)", actors, devices);
            }
            Response::Frame(FrameOutcome::Stale { frame, current }) => {
                log::trace!("Stale frame {} (current {})", frame, current);
            }
            _ => {}
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::*;
    use crate::protocol::testing::PayloadBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_new_listener_gets_structure_event() {
        let shared = SharedScene::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let listener: Arc<dyn SceneListener> = Arc::new(move |event: SceneEvent, _: &Scene| {
            assert_eq!(event, SceneEvent::StructureChanged);
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(shared.add_listener(Arc::clone(&listener)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Second registration is rejected and not notified
        assert!(!shared.add_listener(Arc::clone(&listener)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(shared.remove_listener(&listener));
    }

    #[test]
    fn test_dispatch_emits_events() {
        let shared = SharedScene::new();
        let events = shared.subscribe();
        let mut codec = Codec::default();

        let modeldef = PayloadBuilder::new()
            .i32(1)
            .i32(DATASET_MARKERSET)
            .string("Wand")
            .i32(0)
            .packet(NAT_MODELDEF);
        shared.dispatch(&mut codec, &modeldef).unwrap();

        let frame = PayloadBuilder::new()
            .i32(10)
            .i32(0)
            .i32(0)
            .i32(0)
            .i32(0)
            .i32(0)
            .i32(0)
            .f32(0.0)
            .packet(NAT_FRAMEOFDATA);
        shared.dispatch(&mut codec, &frame).unwrap();

        // Stale repeat: no event
        let stale = PayloadBuilder::new().i32(9).packet(NAT_FRAMEOFDATA);
        shared.dispatch(&mut codec, &stale).unwrap();

        assert_eq!(events.try_recv().unwrap(), SceneEvent::StructureChanged);
        assert_eq!(events.try_recv().unwrap(), SceneEvent::DataUpdated);
        assert!(events.try_recv().is_err());
        assert_eq!(shared.lock().frame_number, 10);
    }

    #[test]
    fn test_listeners_notified_while_scene_locked() {
        let shared = Arc::new(SharedScene::new());
        let weak = Arc::downgrade(&shared);
        let frames = Arc::new(Mutex::new(Vec::new()));
        let f = Arc::clone(&frames);
        let listener: Arc<dyn SceneListener> = Arc::new(move |event: SceneEvent, scene: &Scene| {
            if event == SceneEvent::DataUpdated {
                let shared = weak.upgrade().unwrap();
                assert!(shared.scene.is_locked());
                f.lock().push(scene.frame_number);
            }
        });
        shared.add_listener(listener);

        let mut codec = Codec::default();
        for n in [3, 4] {
            let frame = PayloadBuilder::new()
                .i32(n)
                .i32(0)
                .i32(0)
                .i32(0)
                .i32(0)
                .i32(0)
                .i32(0)
                .f32(0.0)
                .packet(NAT_FRAMEOFDATA);
            shared.dispatch(&mut codec, &frame).unwrap();
        }

        assert_eq!(*frames.lock(), vec![3, 4]);
        assert!(!shared.scene.is_locked());
    }
}
