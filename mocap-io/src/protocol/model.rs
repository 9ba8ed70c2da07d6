//! Model definition (NAT_MODELDEF) decoding
//!
//! A model definition describes the whole scene structure: which actors
//! exist, the markers they carry, their bone hierarchies and the force plate
//! devices. It is decoded into a detached [`ModelDefinition`] and only then
//! swapped into the shared scene, so a truncated packet never leaves a half
//! rebuilt scene behind.
//!
//! | Dataset     | Layout                                                       |
//! |-------------|--------------------------------------------------------------|
//! | Markerset   | name, count, count x name                                    |
//! | Rigid body  | name, id, parent id, offset (3 x f32)                        |
//! | Skeleton    | name, id, count, count x ([name 2.0+], id, parent, offset)   |
//! | Force plate | id, name, 652 reserved bytes, count, count x channel name    |
//!
//! Rigid bodies and skeletons attach to an actor created by an earlier
//! markerset: first by exact name, then by using their id as a position in
//! the actor list. When neither works a new actor is synthesized and a
//! warning is logged.

use super::constants::*;
use super::reader::PayloadReader;
use super::version::Version;
use crate::error::Result;
use crate::scene::{Actor, Bone, Channel, Device, Marker};

/// Decoded scene structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDefinition {
    pub actors: Vec<Actor>,
    pub devices: Vec<Device>,
    /// Names of actors created because no markerset matched
    pub synthesized: Vec<String>,
}

impl ModelDefinition {
    /// Find or create the actor a rigid body / skeleton belongs to
    fn resolve_actor(&mut self, kind: &str, name: &str, id: i32) -> usize {
        if let Some(idx) = self.actors.iter().position(|a| a.name == name) {
            return idx;
        }

        if let Ok(idx) = usize::try_from(id) {
            if idx < self.actors.len() {
                return idx;
            }
        }

        log::warn!("{} '{}' (id {}) could not be matched to an actor", kind, name, id);
        self.synthesized.push(name.to_string());
        self.actors.push(Actor::new(name, id));
        self.actors.len() - 1
    }
}

/// Decode a model definition payload
pub fn decode_model_definition(
    r: &mut PayloadReader<'_>,
    version: Version,
) -> Result<ModelDefinition> {
    let mut def = ModelDefinition::default();

    let dataset_count = r.read_count()?;
    for index in 0..dataset_count {
        let dataset = r.read_i32()?;
        match dataset {
            DATASET_MARKERSET => decode_markerset(r, &mut def)?,
            DATASET_RIGIDBODY => decode_rigid_body(r, &mut def)?,
            DATASET_SKELETON => decode_skeleton(r, version, &mut def)?,
            DATASET_FORCEPLATE => decode_force_plate(r, &mut def)?,
            other => {
                // Size unknown: nothing after this can be located
                log::warn!(
                    "Invalid dataset type {} in model definition, dropping {} remaining dataset(s)",
                    other,
                    dataset_count - index - 1
                );
                break;
            }
        }
    }

    log::debug!(
        "Model definition: {} actor(s), {} device(s)",
        def.actors.len(),
        def.devices.len()
    );
    Ok(def)
}

fn decode_markerset(r: &mut PayloadReader<'_>, def: &mut ModelDefinition) -> Result<()> {
    // Markersets carry no id
    let mut actor = Actor::new(r.read_string()?, 0);

    let marker_count = r.read_count_of(1)?;
    actor.markers.reserve(marker_count);
    for _ in 0..marker_count {
        actor.markers.push(Marker::new(r.read_string()?));
    }

    def.actors.push(actor);
    Ok(())
}

fn decode_rigid_body(r: &mut PayloadReader<'_>, def: &mut ModelDefinition) -> Result<()> {
    let name = r.read_string()?;
    let id = r.read_i32()?;
    let _parent_id = r.read_i32()?; // rigid bodies are always roots
    let offset = r.read_vector3()?;

    let mut bone = Bone::new(id, name.as_str());
    bone.offset = offset;

    let idx = def.resolve_actor("Rigid body", &name, id);
    let actor = &mut def.actors[idx];
    actor.set_single_bone(bone);
    actor.id = id;
    Ok(())
}

fn decode_skeleton(
    r: &mut PayloadReader<'_>,
    version: Version,
    def: &mut ModelDefinition,
) -> Result<()> {
    let name = r.read_string()?;
    let id = r.read_i32()?;

    let idx = def.resolve_actor("Skeleton", &name, id);
    let actor = &mut def.actors[idx];
    actor.id = id;
    actor.bones.clear();

    let bone_count = r.read_count_of(1)?;
    actor.bones.reserve(bone_count);
    for _ in 0..bone_count {
        let bone_name = if version.has_bone_names() {
            r.read_string()?
        } else {
            String::new()
        };
        let bone_id = r.read_i32()?;
        let parent_id = r.read_i32()?;

        let mut bone = Bone::new(bone_id, bone_name);
        bone.offset = r.read_vector3()?;

        // Parents precede their children in the definition
        let parent = actor.bone_index(parent_id);
        actor.add_bone(bone, parent);
    }
    Ok(())
}

fn decode_force_plate(r: &mut PayloadReader<'_>, def: &mut ModelDefinition) -> Result<()> {
    let id = r.read_i32()?;
    let mut device = Device::new(r.read_string()?, id);

    r.skip(FORCEPLATE_RESERVED_SIZE)?;

    let channel_count = r.read_count_of(1)?;
    device.channels.reserve(channel_count);
    for _ in 0..channel_count {
        device.channels.push(Channel::new(r.read_string()?));
    }

    def.devices.push(device);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::PayloadBuilder;

    const V2_9: Version = Version::new(2, 9, 0, 0);

    fn decode(payload: &[u8], version: Version) -> ModelDefinition {
        decode_model_definition(&mut PayloadReader::new(payload), version).unwrap()
    }

    #[test]
    fn test_markerset() {
        let payload = PayloadBuilder::new()
            .i32(1)
            .i32(DATASET_MARKERSET)
            .string("Wand")
            .i32(2)
            .string("Wand_1")
            .string("Wand_2")
            .build();

        let def = decode(&payload, V2_9);
        assert_eq!(def.actors.len(), 1);
        let wand = &def.actors[0];
        assert_eq!(wand.name, "Wand");
        assert_eq!(wand.id, 0);
        assert_eq!(wand.markers.len(), 2);
        assert_eq!(wand.markers[1].name, "Wand_2");
        assert!(!wand.markers[0].tracked);
    }

    #[test]
    fn test_rigid_body_attaches_by_name() {
        let payload = PayloadBuilder::new()
            .i32(2)
            .i32(DATASET_MARKERSET)
            .string("Head")
            .i32(0)
            .i32(DATASET_RIGIDBODY)
            .string("Head")
            .i32(7)
            .i32(-1)
            .f32(0.1)
            .f32(0.2)
            .f32(0.3)
            .build();

        let def = decode(&payload, V2_9);
        assert_eq!(def.actors.len(), 1);
        let head = &def.actors[0];
        assert_eq!(head.id, 7);
        assert_eq!(head.bones.len(), 1);
        assert_eq!(head.bones[0].id, 7);
        assert_eq!(head.bones[0].name, "Head");
        assert_eq!(head.bones[0].offset.z, 0.3);
        assert_eq!(head.bones[0].parent, None);
        assert!(def.synthesized.is_empty());
    }

    #[test]
    fn test_rigid_body_attaches_by_index() {
        let payload = PayloadBuilder::new()
            .i32(2)
            .i32(DATASET_MARKERSET)
            .string("Markers")
            .i32(0)
            .i32(DATASET_RIGIDBODY)
            .string("RigidBody")
            .i32(0) // index 0 -> "Markers"
            .i32(-1)
            .f32(0.0)
            .f32(0.0)
            .f32(0.0)
            .build();

        let def = decode(&payload, V2_9);
        assert_eq!(def.actors.len(), 1);
        assert_eq!(def.actors[0].name, "Markers");
        assert_eq!(def.actors[0].bones[0].name, "RigidBody");
    }

    #[test]
    fn test_unmatched_rigid_body_synthesizes_actor() {
        let payload = PayloadBuilder::new()
            .i32(1)
            .i32(DATASET_RIGIDBODY)
            .string("Orphan")
            .i32(42)
            .i32(-1)
            .f32(0.0)
            .f32(0.0)
            .f32(0.0)
            .build();

        let def = decode(&payload, V2_9);
        assert_eq!(def.actors.len(), 1);
        assert_eq!(def.actors[0].name, "Orphan");
        assert_eq!(def.actors[0].id, 42);
        assert_eq!(def.synthesized, vec!["Orphan".to_string()]);
    }

    fn skeleton_payload(version_has_names: bool) -> Vec<u8> {
        let mut b = PayloadBuilder::new()
            .i32(2)
            .i32(DATASET_MARKERSET)
            .string("Alice")
            .i32(0)
            .i32(DATASET_SKELETON)
            .string("Alice")
            .i32(5)
            .i32(3);
        // (name, id, parent)
        for (name, id, parent) in [("Hip", 1, 0), ("Spine", 2, 1), ("Head", 3, 2)] {
            if version_has_names {
                b = b.string(name);
            }
            b = b.i32(id).i32(parent).f32(0.0).f32(0.1).f32(0.0);
        }
        b.build()
    }

    #[test]
    fn test_skeleton_hierarchy() {
        let def = decode(&skeleton_payload(true), V2_9);
        let alice = &def.actors[0];

        assert_eq!(alice.id, 5);
        assert_eq!(alice.bones.len(), 3);
        assert_eq!(alice.bones[0].parent, None);
        assert_eq!(alice.bones[1].parent, Some(0));
        assert_eq!(alice.bones[2].chain, vec![0, 1, 2]);
        assert_eq!(alice.bones[1].children, vec![2]);
        assert_eq!(alice.find_bone("Head").unwrap().id, 3);
    }

    #[test]
    fn test_skeleton_without_bone_names() {
        let def = decode(&skeleton_payload(false), Version::new(1, 4, 0, 0));
        let alice = &def.actors[0];
        assert_eq!(alice.bones.len(), 3);
        assert!(alice.bones.iter().all(|b| b.name.is_empty()));
        assert_eq!(alice.bones[2].chain, vec![0, 1, 2]);
    }

    #[test]
    fn test_force_plate() {
        let payload = PayloadBuilder::new()
            .i32(1)
            .i32(DATASET_FORCEPLATE)
            .i32(1)
            .string("FP-0001")
            .zeros(FORCEPLATE_RESERVED_SIZE)
            .i32(3)
            .string("Fx")
            .string("Fy")
            .string("Fz")
            .build();

        let def = decode(&payload, V2_9);
        assert_eq!(def.devices.len(), 1);
        assert_eq!(def.devices[0].id, 1);
        assert_eq!(def.devices[0].name, "FP-0001");
        assert_eq!(def.devices[0].channels.len(), 3);
        assert_eq!(def.devices[0].channels[2].name, "Fz");
    }

    #[test]
    fn test_unknown_dataset_keeps_earlier_datasets() {
        let payload = PayloadBuilder::new()
            .i32(3)
            .i32(DATASET_MARKERSET)
            .string("Wand")
            .i32(0)
            .i32(17)
            .bytes(&[1, 2, 3])
            .build();

        let def = decode(&payload, V2_9);
        assert_eq!(def.actors.len(), 1);
        assert_eq!(def.actors[0].name, "Wand");
    }

    #[test]
    fn test_truncated_definition_fails() {
        let payload = PayloadBuilder::new()
            .i32(1)
            .i32(DATASET_RIGIDBODY)
            .string("Body")
            .i32(1)
            .build();
        assert!(decode_model_definition(&mut PayloadReader::new(&payload), V2_9).is_err());
    }
}
