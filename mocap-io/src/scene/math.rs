//! Vector and rotation types for scene entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Threshold below which a quaternion's vector part counts as zero
pub const AXIS_EPSILON: f32 = 1e-9;

/// 3D position or offset (meters)
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// True if any coordinate is non-zero
    ///
    /// The server reports lost markers and bodies at the origin, so this
    /// doubles as the tracking heuristic for older protocol versions.
    #[inline]
    pub fn is_nonzero(&self) -> bool {
        self.x != 0.0 || self.y != 0.0 || self.z != 0.0
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Add for Vector3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Vector3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Rotation quaternion (x, y, z, w)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Convert to axis-angle representation
    ///
    /// Returns the normalized rotation axis and the angle in radians. A
    /// quaternion without a usable vector part yields the X axis and a zero
    /// angle.
    pub fn to_axis_angle(&self) -> (Vector3, f32) {
        let sqr_length = self.x * self.x + self.y * self.y + self.z * self.z;
        if sqr_length.abs() < AXIS_EPSILON {
            return (Vector3::new(1.0, 0.0, 0.0), 0.0);
        }

        let inv_length = 1.0 / sqr_length.sqrt();
        let axis = Vector3::new(
            self.x * inv_length,
            self.y * inv_length,
            self.z * inv_length,
        );
        // acos is undefined outside [-1, 1]; slightly denormalized input is common
        let angle = 2.0 * self.w.clamp(-1.0, 1.0).acos();
        (axis, angle)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}, {:.3})",
            self.x, self.y, self.z, self.w
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_nonzero() {
        assert!(!Vector3::ZERO.is_nonzero());
        assert!(Vector3::new(0.0, 0.0, -0.001).is_nonzero());
    }

    #[test]
    fn test_identity_axis_angle() {
        let (axis, angle) = Quaternion::IDENTITY.to_axis_angle();
        assert_eq!(axis, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(angle, 0.0);
    }

    #[test]
    fn test_axis_angle_about_y() {
        // 90 degrees about +Y
        let half = FRAC_PI_2 / 2.0;
        let q = Quaternion::new(0.0, half.sin(), 0.0, half.cos());
        let (axis, angle) = q.to_axis_angle();

        assert!((axis.y - 1.0).abs() < 1e-6);
        assert!(axis.x.abs() < 1e-6);
        assert!((angle - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_vector_ops() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Vector3::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Vector3::new(0.5, 1.5, 2.5));
        assert_eq!(Vector3::new(3.0, 4.0, 0.0).length(), 5.0);
    }
}
