//! Shared `Rapier2D` world hosting every assembly of a scene.

use std::fmt;

use parking_lot::Mutex;
use rapier2d::prelude::*;

use crate::segment::Segment;

/// Fixed timestep for physics simulation (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Physics world with a gravity switch. Gravity stays off until the scene
/// reports every pending assembly as assembled.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vector,
    pub gravity_enabled: bool,
    pub frame: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::with_gravity(Vector::new(0.0, 981.0))
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gravity = self.gravity_enabled.then_some(self.gravity);
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("bodies", &self.rigid_body_set.len())
            .field("joints", &self.impulse_joint_set.len())
            .field("gravity", &gravity)
            .finish_non_exhaustive()
    }
}

/// Collects collision events raised during one step.
#[derive(Default)]
struct CollisionCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl EventHandler for CollisionCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.events.lock().push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

impl PhysicsWorld {
    /// Creates an empty world with gravity disabled.
    pub fn with_gravity(gravity: Vector) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity,
            gravity_enabled: false,
            frame: 0,
        }
    }

    /// Advances the simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.advance(&());
    }

    /// Advances one timestep and returns the collision events it produced.
    pub fn step_with_events(&mut self) -> Vec<CollisionEvent> {
        let collector = CollisionCollector::default();
        self.advance(&collector);
        collector.events.into_inner()
    }

    fn advance(&mut self, events: &dyn EventHandler) {
        let gravity = if self.gravity_enabled {
            self.gravity
        } else {
            Vector::new(0.0, 0.0)
        };
        self.physics_pipeline.step(
            gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            events,
        );
        self.frame += 1;
    }

    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Inserts a segment as a kinematic body with its colliders attached.
    pub fn insert_segment(&mut self, segment: &Segment, user_data: u128) -> RigidBodyHandle {
        let handle = self.rigid_body_set.insert(segment.rigid_body(user_data));
        let groups = segment.interaction_groups();
        for collider in segment.shape.colliders(&segment.material, groups) {
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        }
        handle
    }

    /// Inserts a collider-less fixed body, used as the pivot of a free mount.
    pub fn insert_anchor(&mut self, position: [f32; 2], user_data: u128) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(Vector::new(position[0], position[1]))
            .user_data(user_data)
            .build();
        self.rigid_body_set.insert(body)
    }

    pub fn insert_joint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: GenericJoint,
    ) -> ImpulseJointHandle {
        self.impulse_joint_set.insert(body1, body2, joint, true)
    }

    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) {
        self.impulse_joint_set.remove(handle, true);
    }

    /// Removes a rigid body with its colliders and any joint attached to it.
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Switches a body to dynamic. Returns false if the body does not exist.
    pub fn make_dynamic(&mut self, handle: RigidBodyHandle) -> bool {
        match self.rigid_body_set.get_mut(handle) {
            Some(body) => {
                body.set_body_type(RigidBodyType::Dynamic, true);
                true
            }
            None => false,
        }
    }

    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// `user_data` of the body a collider is attached to.
    pub fn collider_owner(&self, handle: ColliderHandle) -> Option<u128> {
        let parent = self.collider_set.get(handle)?.parent()?;
        Some(self.rigid_body_set.get(parent)?.user_data)
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Drops every body, collider and joint. Gravity goes back off.
    pub fn reset(&mut self) {
        *self = Self::with_gravity(self.gravity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::segment::SegmentRole;
    use crate::shape::Shape;

    fn disc(position: [f32; 2], group: u32) -> Segment {
        Segment {
            id: 0,
            role: SegmentRole::Body,
            shape: Shape::Disc { radius: 10.0 },
            material: Material::body(),
            position,
            visual_size: [20.0, 20.0],
            is_kinematic: true,
            collision_group: group,
            z_order: 0,
            fallback: false,
        }
    }

    #[test]
    fn test_world_starts_without_gravity() {
        let world = PhysicsWorld::default();
        assert!(!world.gravity_enabled);
        assert_eq!(world.integration_parameters.dt, PHYSICS_DT);
    }

    #[test]
    fn test_dynamic_body_falls_only_with_gravity() {
        let mut world = PhysicsWorld::default();
        let handle = world.insert_segment(&disc([0.0, 0.0], 1), 0);
        assert!(world.make_dynamic(handle));

        world.step_n(10);
        let y = world.get_rigid_body(handle).unwrap().translation().y;
        assert!(y.abs() < 1e-4);

        world.gravity_enabled = true;
        world.step_n(10);
        let y = world.get_rigid_body(handle).unwrap().translation().y;
        assert!(y > 0.0, "y-down gravity should move the body down, got {y}");
    }

    #[test]
    fn test_step_variants_advance_alike() {
        let mut plain = PhysicsWorld::default();
        let mut observed = PhysicsWorld::default();
        for world in [&mut plain, &mut observed] {
            world.gravity_enabled = true;
            let handle = world.insert_segment(&disc([0.0, 0.0], 1), 0);
            assert!(world.make_dynamic(handle));
        }

        for _ in 0..20 {
            plain.step();
            observed.step_with_events();
        }

        assert_eq!(plain.current_frame(), 20);
        assert_eq!(observed.current_frame(), 20);
        let y = |world: &PhysicsWorld| world.rigid_body_set.iter().next().unwrap().1.translation().y;
        assert_eq!(y(&plain), y(&observed));
    }

    #[test]
    fn test_kinematic_body_stays_put() {
        let mut world = PhysicsWorld::default();
        world.gravity_enabled = true;
        let handle = world.insert_segment(&disc([5.0, 5.0], 1), 0);
        world.step_n(30);
        let pos = world.get_rigid_body(handle).unwrap().translation();
        assert_eq!((pos.x, pos.y), (5.0, 5.0));
    }

    #[test]
    fn test_overlap_reports_collision_in_same_group_only() {
        let mut world = PhysicsWorld::default();
        for (x, group) in [(0.0, 1), (5.0, 1)] {
            let h = world.insert_segment(&disc([x, 0.0], group), 7);
            world.make_dynamic(h);
        }
        let events = world.step_with_events();
        assert!(events.iter().any(|event| event.started()));
        let owner = match events[0] {
            CollisionEvent::Started(c, _, _) | CollisionEvent::Stopped(c, _, _) => {
                world.collider_owner(c)
            }
        };
        assert_eq!(owner, Some(7));

        let mut isolated = PhysicsWorld::default();
        for (x, group) in [(0.0, 1), (5.0, 2)] {
            let h = isolated.insert_segment(&disc([x, 0.0], group), 0);
            isolated.make_dynamic(h);
        }
        assert!(isolated.step_with_events().is_empty());
    }

    #[test]
    fn test_remove_body_drops_attached_joints() {
        let mut world = PhysicsWorld::default();
        let a = world.insert_segment(&disc([0.0, 0.0], 1), 0);
        let b = world.insert_segment(&disc([0.0, 30.0], 1), 0);
        world.insert_joint(a, b, RopeJointBuilder::new(31.0).build().into());
        assert_eq!(world.impulse_joint_set.len(), 1);

        world.remove_rigid_body(a);
        assert_eq!(world.impulse_joint_set.len(), 0);
        assert_eq!(world.collider_set.len(), 1);
    }

    #[test]
    fn test_reset_clears_world() {
        let mut world = PhysicsWorld::default();
        world.gravity_enabled = true;
        world.insert_segment(&disc([0.0, 0.0], 1), 0);
        world.step();
        world.reset();
        assert_eq!(world.rigid_body_set.len(), 0);
        assert_eq!(world.current_frame(), 0);
        assert!(!world.gravity_enabled);
    }
}
