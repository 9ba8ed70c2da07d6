//! Protocol version and the optional fields it unlocks.

use std::fmt;

/// Four-part version number (major.minor.revision.build)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
    pub build: u8,
}

impl Version {
    #[inline]
    pub const fn new(major: u8, minor: u8, revision: u8, build: u8) -> Self {
        Self {
            major,
            minor,
            revision,
            build,
        }
    }

    #[inline]
    pub const fn from_bytes(b: [u8; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.major, self.minor, self.revision, self.build]
    }

    /// Version 2.x with x >= minor, or any later major
    #[inline]
    pub const fn at_least(&self, major: u8, minor: u8) -> bool {
        (self.major == major && self.minor >= minor) || self.major > major
    }

    // ========================================================================
    // Feature gates
    // ========================================================================

    /// Bone names in skeleton definitions
    #[inline]
    pub const fn has_bone_names(&self) -> bool {
        self.major >= 2
    }

    /// Marker ids, sizes and mean error in rigid body and skeleton frame data
    #[inline]
    pub const fn has_marker_details(&self) -> bool {
        self.major >= 2
    }

    /// Skeleton block in frame data
    #[inline]
    pub const fn has_skeletons(&self) -> bool {
        self.at_least(2, 1)
    }

    /// Labelled marker block in frame data
    #[inline]
    pub const fn has_labeled_markers(&self) -> bool {
        self.at_least(2, 3)
    }

    /// Tracking state bitmask and labelled marker flags
    #[inline]
    pub const fn has_tracking_state(&self) -> bool {
        self.at_least(2, 6)
    }

    /// Timestamp sent as f64 instead of f32
    #[inline]
    pub const fn has_double_timestamp(&self) -> bool {
        self.at_least(2, 7)
    }

    /// Force plate block in frame data
    #[inline]
    pub const fn has_force_plates(&self) -> bool {
        self.at_least(2, 9)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.revision, self.build
        )
    }
}
