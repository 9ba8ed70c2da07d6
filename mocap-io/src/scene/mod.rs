//! Scene model
//!
//! The scene is the single mutable graph the protocol decoder writes into:
//!
//! ```text
//! Scene ─┬─ Actor* ─┬─ Marker*
//!        │          └─ Bone*   (flat table, parent/children/chain by index)
//!        └─ Device* ─── Channel*
//! ```
//!
//! Actor and device tables are replaced wholesale when a model definition
//! arrives; frame data then updates positions, rotations and channel values
//! in place. All lookups return the first match in table order.

mod actor;
mod device;
mod math;
mod pattern;

pub use actor::{Actor, Bone, Marker};
pub use device::{Channel, Device};
pub use math::{Quaternion, Vector3};
pub use pattern::NamePattern;

/// Complete motion capture scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Server frame counter; wraps back when a recording loops
    pub frame_number: i32,
    /// Server timestamp in seconds
    pub timestamp: f64,
    /// Capture-to-output latency in milliseconds
    pub latency_ms: i32,
    pub actors: Vec<Actor>,
    pub devices: Vec<Device>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// First actor whose name matches `pattern`
    pub fn find_actor(&self, pattern: &str) -> Option<&Actor> {
        self.find_actor_matching(&NamePattern::lenient(pattern))
    }

    pub fn find_actor_matching(&self, pattern: &NamePattern) -> Option<&Actor> {
        self.actor_index_matching(pattern).map(|i| &self.actors[i])
    }

    pub fn actor_index_matching(&self, pattern: &NamePattern) -> Option<usize> {
        self.actors.iter().position(|a| pattern.matches(&a.name))
    }

    /// First actor with the given id
    pub fn find_actor_by_id(&self, id: i32) -> Option<&Actor> {
        self.actor_index_by_id(id).map(|i| &self.actors[i])
    }

    #[inline]
    pub fn actor_index_by_id(&self, id: i32) -> Option<usize> {
        self.actors.iter().position(|a| a.id == id)
    }

    /// First device whose name matches `pattern`
    pub fn find_device(&self, pattern: &str) -> Option<&Device> {
        self.find_device_matching(&NamePattern::lenient(pattern))
    }

    pub fn find_device_matching(&self, pattern: &NamePattern) -> Option<&Device> {
        self.device_index_matching(pattern).map(|i| &self.devices[i])
    }

    pub fn device_index_matching(&self, pattern: &NamePattern) -> Option<usize> {
        self.devices.iter().position(|d| pattern.matches(&d.name))
    }

    /// First device with the given id
    pub fn find_device_by_id(&self, id: i32) -> Option<&Device> {
        self.device_index_by_id(id).map(|i| &self.devices[i])
    }

    #[inline]
    pub fn device_index_by_id(&self, id: i32) -> Option<usize> {
        self.devices.iter().position(|d| d.id == id)
    }
}
