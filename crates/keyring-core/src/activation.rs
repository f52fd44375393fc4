//! Promotes a frozen assembly to live physics.

use rapier2d::prelude::{RevoluteJointBuilder, Vector};
use serde::{Deserialize, Serialize};

use crate::assembly::Assembly;
use crate::config::{MountType, PhysicsTuning};
use crate::error::JointError;
use crate::physics::PhysicsWorld;
use crate::segment::SegmentRole;

/// Physics lifecycle of an inserted assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationState {
    /// Bodies exist but are kinematic; no joint is in the world.
    Frozen,
    Activating,
    Live,
    /// Removed from the world.
    Detached,
}

/// Inserts an assembly's joints and switches its bodies to dynamic.
#[derive(Debug, Clone)]
pub struct PhysicsActivationController {
    tuning: PhysicsTuning,
}

impl PhysicsActivationController {
    pub fn new(tuning: PhysicsTuning) -> Self {
        Self { tuning }
    }

    /// Activates a frozen assembly. Every joint (and the mount pin of a free
    /// mount) enters the world before any body turns dynamic; bodies switch
    /// ring first, then links, then the terminal body. A fixed-mount ring
    /// stays kinematic.
    ///
    /// Activating a non-frozen assembly is a no-op.
    pub fn activate(&self, assembly: &mut Assembly, world: &mut PhysicsWorld) -> Result<(), JointError> {
        if assembly.activation != ActivationState::Frozen {
            return Ok(());
        }
        assembly.activation = ActivationState::Activating;

        for segment in &assembly.segments {
            let present = assembly
                .body_handle(segment.id)
                .is_some_and(|handle| world.get_rigid_body(handle).is_some());
            if !present {
                return Err(JointError::MissingBody(segment.id));
            }
        }

        for joint in &assembly.joints {
            let (a, b) = joint.endpoints();
            let (Some(seg_a), Some(seg_b)) = (assembly.segment(a), assembly.segment(b)) else {
                return Err(JointError::MissingBody(a.max(b)));
            };
            let (Some(h_a), Some(h_b)) = (assembly.body_handle(a), assembly.body_handle(b)) else {
                return Err(JointError::MissingBody(a.max(b)));
            };
            let handle = world.insert_joint(h_a, h_b, joint.to_rapier(seg_a, seg_b));
            assembly.joint_handles.push(handle);
        }

        if let (Some(mount), Some(ring_handle)) = (assembly.mount_handle, assembly.body_handle(0)) {
            let [ax, ay] = assembly.layout.mount_anchor;
            let [rx, ry] = assembly.layout.ring;
            let pin = RevoluteJointBuilder::new()
                .local_anchor1(Vector::new(0.0, 0.0))
                .local_anchor2(Vector::new(ax - rx, ay - ry))
                .motor_velocity(0.0, self.tuning.pin_friction_torque)
                .build();
            let handle = world.insert_joint(mount, ring_handle, pin.into());
            assembly.joint_handles.push(handle);
        }

        let keep_ring_kinematic = assembly.spec.mount == MountType::Fixed;
        for (segment, handle) in assembly.segments.iter_mut().zip(&assembly.body_handles) {
            if segment.role == SegmentRole::Ring && keep_ring_kinematic {
                continue;
            }
            if !world.make_dynamic(*handle) {
                return Err(JointError::MissingBody(segment.id));
            }
            segment.is_kinematic = false;
        }

        assembly.activation = ActivationState::Live;
        tracing::debug!(
            "[activation] Assembly {} live with {} joints",
            assembly.id,
            assembly.joint_handles.len()
        );
        Ok(())
    }
}
