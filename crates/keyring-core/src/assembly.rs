//! A keyring inserted into the shared world.

use rapier2d::prelude::{ImpulseJointHandle, RigidBody, RigidBodyHandle};

use crate::activation::ActivationState;
use crate::chain::JointChainBuilder;
use crate::config::{AssemblySpec, MountType, PhysicsTuning};
use crate::error::{AssemblyId, SceneError};
use crate::joint::Joint;
use crate::layout::StackLayout;
use crate::loader::LoadedAssembly;
use crate::physics::PhysicsWorld;
use crate::segment::{
    Segment, SegmentId, SegmentRole, USER_DATA_MOUNT, USER_DATA_SEGMENT, encode_user_data,
};

/// Draw order of a segment: every segment of a later layer sorts above
/// every segment of an earlier one, whatever the chain length.
pub fn z_order(layer: u32, segment: SegmentId) -> u64 {
    (u64::from(layer) << 32) | u64::from(segment)
}

/// Ring, links and body of one keyring plus the world handles that back them.
#[derive(Debug)]
pub struct Assembly {
    pub id: AssemblyId,
    pub spec: AssemblySpec,
    pub segments: Vec<Segment>,
    pub joints: Vec<Joint>,
    pub layout: StackLayout,
    pub degraded: bool,
    pub(crate) activation: ActivationState,
    pub(crate) body_handles: Vec<RigidBodyHandle>,
    pub(crate) joint_handles: Vec<ImpulseJointHandle>,
    pub(crate) mount_handle: Option<RigidBodyHandle>,
}

impl Assembly {
    /// Wires the joint chain and inserts every segment as a kinematic body.
    ///
    /// Joints are only computed here; they enter the world on activation.
    /// On a joint failure nothing is inserted.
    pub fn insert(
        id: AssemblyId,
        layer: u32,
        loaded: LoadedAssembly,
        tuning: &PhysicsTuning,
        world: &mut PhysicsWorld,
    ) -> Result<Self, SceneError> {
        let LoadedAssembly {
            spec,
            mut segments,
            layout,
            degraded,
            ..
        } = loaded;

        let joints = JointChainBuilder::new(tuning.clone(), spec.mount)
            .connect(&mut segments)
            .map_err(|source| SceneError::JointConstruction { id, source })?;

        for segment in &mut segments {
            segment.z_order = z_order(layer, segment.id);
        }

        let body_handles = segments
            .iter()
            .map(|segment| {
                world.insert_segment(segment, encode_user_data(USER_DATA_SEGMENT, id, segment.id))
            })
            .collect();

        let mount_handle = (spec.mount == MountType::Free).then(|| {
            world.insert_anchor(layout.mount_anchor, encode_user_data(USER_DATA_MOUNT, id, 0))
        });

        Ok(Self {
            id,
            spec,
            segments,
            joints,
            layout,
            degraded,
            activation: ActivationState::Frozen,
            body_handles,
            joint_handles: Vec::new(),
            mount_handle,
        })
    }

    pub fn activation(&self) -> ActivationState {
        self.activation
    }

    pub fn is_live(&self) -> bool {
        self.activation == ActivationState::Live
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id as usize)
    }

    pub fn body_handle(&self, id: SegmentId) -> Option<RigidBodyHandle> {
        self.body_handles.get(id as usize).copied()
    }

    /// Segments with their world bodies, skipping any body that is gone.
    pub fn bodies<'w>(
        &'w self,
        world: &'w PhysicsWorld,
    ) -> impl Iterator<Item = (&'w Segment, &'w RigidBody)> + 'w {
        self.segments
            .iter()
            .zip(&self.body_handles)
            .filter_map(|(segment, handle)| Some((segment, world.get_rigid_body(*handle)?)))
    }

    /// Current world position of every segment, in chain order.
    pub fn positions(&self, world: &PhysicsWorld) -> Vec<[f32; 2]> {
        self.bodies(world)
            .map(|(_, body)| {
                let t = body.translation();
                [t.x, t.y]
            })
            .collect()
    }

    /// Returns true if `point` lies inside the terminal body's shape.
    pub fn body_contains(&self, world: &PhysicsWorld, point: [f32; 2]) -> bool {
        self.bodies(world)
            .filter(|(segment, _)| segment.role == SegmentRole::Body)
            .any(|(segment, body)| {
                let t = body.translation();
                let (sin, cos) = body.rotation().angle().sin_cos();
                let (dx, dy) = (point[0] - t.x, point[1] - t.y);
                // Inverse rotation into the body frame.
                let local = [cos * dx + sin * dy, -sin * dx + cos * dy];
                segment.shape.contains_local(local)
            })
    }

    /// Removes every joint and body of this assembly from the world.
    pub fn detach(&mut self, world: &mut PhysicsWorld) {
        for handle in self.joint_handles.drain(..) {
            world.remove_joint(handle);
        }
        for handle in self.body_handles.drain(..) {
            world.remove_rigid_body(handle);
        }
        if let Some(handle) = self.mount_handle.take() {
            world.remove_rigid_body(handle);
        }
        self.activation = ActivationState::Detached;
    }
}
