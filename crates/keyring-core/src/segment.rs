//! Segments: the rigid bodies that make up a keyring.

use rapier2d::prelude::{Group, InteractionGroups, RigidBody, RigidBodyBuilder, Vector};
use serde::{Deserialize, Serialize};

use crate::error::AssemblyId;
use crate::material::Material;
use crate::shape::Shape;

/// Index of a segment inside its assembly: ring `0`, links `1..=n`, body `n + 1`.
pub type SegmentId = u32;

/// Position of a segment in the ring → chain → body order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum SegmentRole {
    Ring,
    ChainLink { index: u32 },
    Body,
}

/// One physical node of an assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub role: SegmentRole,
    pub shape: Shape,
    pub material: Material,
    /// World position of the segment origin.
    pub position: [f32; 2],
    /// Size of the (non-physical) sprite drawn for this segment.
    pub visual_size: [f32; 2],
    pub is_kinematic: bool,
    pub collision_group: u32,
    /// Draw order; the assembly layer sits in the upper 32 bits.
    pub z_order: u64,
    /// True if the segment was built from fallback geometry.
    pub fallback: bool,
}

impl Segment {
    /// Membership and filter both set to this segment's collision group.
    pub fn interaction_groups(&self) -> InteractionGroups {
        let group = Group::from_bits_truncate(self.collision_group);
        InteractionGroups::all()
            .with_memberships(group)
            .with_filter(group)
    }

    /// Kinematic rigid body at the segment's position. Activation switches it
    /// to dynamic later.
    pub(crate) fn rigid_body(&self, user_data: u128) -> RigidBody {
        RigidBodyBuilder::kinematic_position_based()
            .translation(Vector::new(self.position[0], self.position[1]))
            .linear_damping(self.material.linear_damping)
            .angular_damping(self.material.angular_damping)
            .user_data(user_data)
            .build()
    }
}

/// Type tag stored in the high bits of a segment body's `user_data`.
pub const USER_DATA_SEGMENT: u64 = 1;
/// Type tag for the static body a free-mounted ring hangs from.
pub const USER_DATA_MOUNT: u64 = 2;

/// Encodes a type tag, assembly id and segment id into rapier `user_data`.
pub fn encode_user_data(type_tag: u64, assembly: AssemblyId, segment: SegmentId) -> u128 {
    (u128::from(type_tag) << 64) | (u128::from(assembly) << 32) | u128::from(segment)
}

/// Decodes `user_data` into (type tag, assembly id, segment id).
#[allow(clippy::cast_possible_truncation)]
pub fn decode_user_data(user_data: u128) -> (u64, AssemblyId, SegmentId) {
    let type_tag = (user_data >> 64) as u64;
    let assembly = (user_data >> 32) as u32;
    let segment = user_data as u32;
    (type_tag, assembly, segment)
}
