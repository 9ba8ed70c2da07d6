//! Frame of data (NAT_FRAMEOFDATA) decoding
//!
//! Frames are applied directly to the scene while the caller holds the scene
//! lock. Blocks appear in this order, optional ones gated on the server's
//! protocol version:
//!
//! | Block              | Since | Handling                                      |
//! |--------------------|-------|-----------------------------------------------|
//! | frame number       |       | stale check, then stored                      |
//! | markersets         |       | positions into the actor with the same name   |
//! | unidentified       |       | skipped                                       |
//! | rigid bodies       |       | pose into the actor's first bone              |
//! | skeletons          | 2.1   | pose + length into bones matched by id        |
//! | labelled markers   | 2.3   | skipped (20 bytes each, 22 from 2.6)          |
//! | force plates       | 2.9   | last sample of each channel                   |
//! | latency            |       | seconds, stored as whole milliseconds         |
//! | timecode/timestamp |       | optional trailer, timestamp f64 from 2.7      |
//!
//! Anything the scene does not know about (unnamed markersets, unknown ids,
//! surplus markers) is written into sentinel entities owned by the decoder so
//! the byte cursor stays aligned.

use super::constants::*;
use super::reader::PayloadReader;
use super::version::Version;
use crate::error::Result;
use crate::scene::{Bone, Device, Marker, Scene};

/// What happened to a decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame applied to the scene
    Applied,
    /// Frame arrived out of order and was ignored
    Stale { frame: i32, current: i32 },
    /// Skeleton id unknown to the scene; the rest of the frame was dropped
    Aborted { skeleton_id: i32 },
}

/// Discard targets for data that has no home in the scene
#[derive(Debug, Clone)]
pub struct Sentinels {
    pub marker: Marker,
    pub bone: Bone,
    pub device: Device,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            marker: Marker::new("dummy"),
            bone: Bone::new(-1, "dummy"),
            device: Device::new("dummy", -1),
        }
    }
}

/// True if `incoming` is an out-of-order frame relative to `current`
///
/// Small backwards steps are stale packets. Large backwards jumps are a
/// recording that looped and are accepted.
#[inline]
pub fn is_stale(current: i32, incoming: i32) -> bool {
    let delta = incoming.wrapping_sub(current);
    delta < 0 && delta > -STALE_FRAME_WINDOW
}

/// Decode a frame payload into `scene`
pub fn apply_frame(
    r: &mut PayloadReader<'_>,
    version: Version,
    scene: &mut Scene,
    sentinels: &mut Sentinels,
) -> Result<FrameOutcome> {
    let frame = r.read_i32()?;
    if is_stale(scene.frame_number, frame) {
        return Ok(FrameOutcome::Stale {
            frame,
            current: scene.frame_number,
        });
    }
    scene.frame_number = frame;

    read_markersets(r, scene, sentinels)?;

    let unidentified = r.read_count_of(MARKER_POSITION_SIZE)?;
    r.skip_markers(unidentified)?;

    read_rigid_bodies(r, version, scene, sentinels)?;

    if version.has_skeletons() {
        if let Some(skeleton_id) = read_skeletons(r, version, scene, sentinels)? {
            return Ok(FrameOutcome::Aborted { skeleton_id });
        }
    }

    if version.has_labeled_markers() {
        let stride = if version.has_tracking_state() {
            LABELED_MARKER_SIZE + LABELED_MARKER_PARAMS_SIZE
        } else {
            LABELED_MARKER_SIZE
        };
        let count = r.read_count_of(stride)?;
        r.skip(count * stride)?;
    }

    if version.has_force_plates() {
        read_force_plates(r, scene, sentinels)?;
    }

    let latency = r.read_f32()?;
    scene.latency_ms = (latency * 1000.0) as i32;

    let timestamp_size = if version.has_double_timestamp() { 8 } else { 4 };
    if r.remaining() >= TIMECODE_SIZE + timestamp_size {
        r.skip(TIMECODE_SIZE)?;
        scene.timestamp = if version.has_double_timestamp() {
            r.read_f64()?
        } else {
            f64::from(r.read_f32()?)
        };
    }

    Ok(FrameOutcome::Applied)
}

fn read_markersets(
    r: &mut PayloadReader<'_>,
    scene: &mut Scene,
    sentinels: &mut Sentinels,
) -> Result<()> {
    let count = r.read_count()?;
    for _ in 0..count {
        let name = r.read_string()?;
        let actor = scene.actors.iter().position(|a| a.name == name);
        if actor.is_none() {
            log::trace!("Markerset '{}' not in scene", name);
        }

        let marker_count = r.read_count_of(MARKER_POSITION_SIZE)?;
        for m in 0..marker_count {
            let position = r.read_vector3()?;
            let marker = match actor.and_then(|a| scene.actors[a].markers.get_mut(m)) {
                Some(marker) => marker,
                None => &mut sentinels.marker,
            };
            marker.set_position(position);
        }
    }
    Ok(())
}

fn read_rigid_bodies(
    r: &mut PayloadReader<'_>,
    version: Version,
    scene: &mut Scene,
    sentinels: &mut Sentinels,
) -> Result<()> {
    let count = r.read_count()?;
    for _ in 0..count {
        let id = r.read_i32()?;
        let position = r.read_vector3()?;
        let rotation = r.read_quaternion()?;

        let marker_count = r.read_count_of(MARKER_POSITION_SIZE)?;
        r.skip_markers(marker_count)?;
        if version.has_marker_details() {
            r.skip(marker_count * 4)?; // ids
            r.skip(marker_count * 4)?; // sizes
            let _mean_error = r.read_f32()?;
        }

        let tracked = if version.has_tracking_state() {
            r.read_u16()? & FLAG_TRACKING_VALID != 0
        } else {
            position.is_nonzero()
        };

        let bone = match rigid_body_actor(scene, id) {
            Some(idx) => {
                let actor = &mut scene.actors[idx];
                if actor.bones.is_empty() {
                    let name = actor.name.clone();
                    actor.add_bone(Bone::new(id, name), None);
                }
                &mut actor.bones[0]
            }
            None => {
                log::trace!("Rigid body {} not in scene", id);
                &mut sentinels.bone
            }
        };
        bone.position = position;
        bone.rotation = rotation;
        bone.tracked = tracked;
    }
    Ok(())
}

/// Actor for a rigid body id: by id, else by position in the actor table
fn rigid_body_actor(scene: &Scene, id: i32) -> Option<usize> {
    scene.actor_index_by_id(id).or_else(|| {
        usize::try_from(id)
            .ok()
            .filter(|&idx| idx < scene.actors.len())
    })
}

/// Returns the unknown skeleton id if the frame has to be abandoned
fn read_skeletons(
    r: &mut PayloadReader<'_>,
    version: Version,
    scene: &mut Scene,
    sentinels: &mut Sentinels,
) -> Result<Option<i32>> {
    let count = r.read_count()?;
    for _ in 0..count {
        let skeleton_id = r.read_i32()?;
        let Some(actor_idx) = scene.actor_index_by_id(skeleton_id) else {
            log::debug!(
                "Frame {}: skeleton {} not in scene, dropping rest of frame",
                scene.frame_number,
                skeleton_id
            );
            return Ok(Some(skeleton_id));
        };

        let bone_count = r.read_count()?;
        for _ in 0..bone_count {
            let bone_id = r.read_i32()?;
            let position = r.read_vector3()?;
            let rotation = r.read_quaternion()?;

            let marker_count = r.read_count_of(MARKER_POSITION_SIZE)?;
            r.skip_markers(marker_count)?;
            r.skip(marker_count * 4)?; // ids
            r.skip(marker_count * 4)?; // sizes

            // Sent as mean marker error; servers use it for the bone length
            let length = r.read_f32()?;

            let tracked = if version.has_tracking_state() {
                r.read_u16()? & FLAG_TRACKING_VALID != 0
            } else {
                position.is_nonzero()
            };

            let actor = &mut scene.actors[actor_idx];
            let bone = match actor.bone_index(bone_id) {
                Some(b) => &mut actor.bones[b],
                None => &mut sentinels.bone,
            };
            bone.position = position;
            bone.rotation = rotation;
            bone.length = length;
            bone.tracked = tracked;
        }
    }
    Ok(None)
}

fn read_force_plates(
    r: &mut PayloadReader<'_>,
    scene: &mut Scene,
    sentinels: &mut Sentinels,
) -> Result<()> {
    let count = r.read_count()?;
    for _ in 0..count {
        let id = r.read_i32()?;
        let device = match scene.device_index_by_id(id) {
            Some(idx) => &mut scene.devices[idx],
            None => &mut sentinels.device,
        };

        let channel_count = r.read_count_of(4)?;
        for ch in 0..channel_count {
            let sample_count = r.read_count_of(4)?;
            let mut last = None;
            for _ in 0..sample_count {
                last = Some(r.read_f32()?);
            }
            // Only the newest sample of a burst is kept
            if let (Some(value), Some(channel)) = (last, device.channels.get_mut(ch)) {
                channel.value = value;
            }
        }
    }
    Ok(())
}
