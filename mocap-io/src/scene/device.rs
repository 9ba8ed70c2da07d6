//! Interaction devices (force plates) and their analog channels.

use super::pattern::NamePattern;

/// Single analog channel of a device
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Channel {
    pub name: String,
    /// Most recent sample
    pub value: f32,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: 0.0,
        }
    }
}

/// Device with named channels
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: i32,
    pub name: String,
    pub channels: Vec<Channel>,
}

impl Device {
    pub fn new(name: impl Into<String>, id: i32) -> Self {
        Self {
            id,
            name: name.into(),
            channels: Vec::new(),
        }
    }

    /// First channel whose name matches `pattern`
    pub fn find_channel(&self, pattern: &str) -> Option<&Channel> {
        let pattern = NamePattern::lenient(pattern);
        self.channels.iter().find(|c| pattern.matches(&c.name))
    }
}
