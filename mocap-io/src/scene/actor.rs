//! Actors and their markers and bones.
//!
//! Bones live in a flat table owned by the actor. Hierarchy links (`parent`,
//! `children`, `chain`) are indices into that table, so an actor can be
//! cloned or swapped without fixing up references.

use super::math::{Quaternion, Vector3};
use super::pattern::NamePattern;

/// Single named marker
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Marker {
    pub name: String,
    pub position: Vector3,
    /// True iff the last reported position was non-zero
    pub tracked: bool,
}

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Store a new position and derive the tracking flag from it
    #[inline]
    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
        self.tracked = position.is_nonzero();
    }
}

/// Single bone of a rigid body or skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub id: i32,
    pub name: String,
    /// Index of the parent bone in the owning actor's table
    pub parent: Option<usize>,
    /// Offset to the parent bone (or to the origin for roots)
    pub offset: Vector3,
    pub position: Vector3,
    pub rotation: Quaternion,
    pub length: f32,
    pub tracked: bool,
    /// Indices of direct children
    pub children: Vec<usize>,
    /// Indices from the root of the hierarchy down to this bone (inclusive)
    pub chain: Vec<usize>,
}

impl Bone {
    /// Create a detached bone; links are filled in by [`Actor::add_bone`]
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            offset: Vector3::ZERO,
            position: Vector3::ZERO,
            rotation: Quaternion::IDENTITY,
            length: 0.0,
            tracked: false,
            children: Vec::new(),
            chain: Vec::new(),
        }
    }

    /// Rotation as (axis, angle in radians)
    #[inline]
    pub fn axis_angle(&self) -> (Vector3, f32) {
        self.rotation.to_axis_angle()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Tracked entity: a markerset, rigid body or skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    /// Reassigned when a rigid body or skeleton definition claims the actor
    pub id: i32,
    pub name: String,
    pub markers: Vec<Marker>,
    pub bones: Vec<Bone>,
}

impl Actor {
    pub fn new(name: impl Into<String>, id: i32) -> Self {
        Self {
            id,
            name: name.into(),
            markers: Vec::new(),
            bones: Vec::new(),
        }
    }

    /// Append a bone and link it below `parent`
    ///
    /// Parents must already be in the table; an index that is not (including
    /// the new bone's own slot) leaves the bone as a root. Returns the index of
    /// the new bone.
    pub fn add_bone(&mut self, mut bone: Bone, parent: Option<usize>) -> usize {
        let index = self.bones.len();
        let parent = parent.filter(|&p| p < index);

        bone.parent = parent;
        bone.children.clear();
        bone.chain = match parent {
            Some(p) => {
                let parent_bone = &mut self.bones[p];
                parent_bone.children.push(index);
                let mut chain = Vec::with_capacity(parent_bone.chain.len() + 1);
                chain.extend_from_slice(&parent_bone.chain);
                chain.push(index);
                chain
            }
            None => vec![index],
        };

        self.bones.push(bone);
        index
    }

    /// Replace all bones with a single root bone
    pub fn set_single_bone(&mut self, bone: Bone) {
        self.bones.clear();
        self.add_bone(bone, None);
    }

    /// First marker whose name matches `pattern`
    pub fn find_marker(&self, pattern: &str) -> Option<&Marker> {
        let pattern = NamePattern::lenient(pattern);
        self.markers.iter().find(|m| pattern.matches(&m.name))
    }

    /// First bone whose name matches `pattern`
    pub fn find_bone(&self, pattern: &str) -> Option<&Bone> {
        let pattern = NamePattern::lenient(pattern);
        self.bones.iter().find(|b| pattern.matches(&b.name))
    }

    /// First bone with the given id
    pub fn find_bone_by_id(&self, id: i32) -> Option<&Bone> {
        self.bone_index(id).map(|i| &self.bones[i])
    }

    /// Table index of the first bone with the given id
    #[inline]
    pub fn bone_index(&self, id: i32) -> Option<usize> {
        self.bones.iter().position(|b| b.id == id)
    }

    pub fn parent_of(&self, bone: &Bone) -> Option<&Bone> {
        bone.parent.and_then(|p| self.bones.get(p))
    }

    /// Bones from the root down to `bone`
    pub fn chain_of<'a>(&'a self, bone: &'a Bone) -> impl Iterator<Item = &'a Bone> + 'a {
        bone.chain.iter().filter_map(move |&i| self.bones.get(i))
    }

    pub fn root_bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.is_root())
    }
}
