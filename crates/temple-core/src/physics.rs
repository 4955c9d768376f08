//! Physics stepping using `Rapier3D` with a fixed timestep.

use std::fmt;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::pose::Pose;

/// Fixed timestep for physics simulation (60Hz).
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Maximum number of fixed steps a single `step_simulation` call may run.
pub const DEFAULT_MAX_SUBSTEPS: u32 = 10;

/// Default gravity vector (downward, in m/s²).
pub fn default_gravity() -> Vec3 {
    Vec3::new(0.0, -9.81, 0.0)
}

fn to_vector(v: Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}

/// Physics world containing all `Rapier3D` components.
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
    /// Unconsumed simulation time carried between `step_simulation` calls.
    accumulator: f32,
    pub frame: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("accumulator", &self.accumulator)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default settings.
    pub fn new() -> Self {
        Self::with_gravity(default_gravity())
    }

    /// Creates a new physics world with custom gravity.
    pub fn with_gravity(gravity: Vec3) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: FIXED_DT,
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
            gravity: to_vector(gravity),
            accumulator: 0.0,
            frame: 0,
        }
    }

    /// Advances the physics simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            self.gravity,
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
            &(),
        );
        self.frame += 1;
    }

    /// Advances the physics simulation by multiple steps.
    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Feeds `time_step` seconds into the fixed-step accumulator and runs the
    /// fixed steps that fall due, at most `max_substeps` of them.
    ///
    /// Time owed beyond the cap is dropped, not carried over. Returns the
    /// number of steps actually run.
    pub fn step_simulation(&mut self, time_step: f32, max_substeps: u32) -> u32 {
        if time_step.is_nan() || time_step <= 0.0 {
            return 0;
        }

        self.accumulator += time_step;
        let fixed = self.integration_parameters.dt;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let due = (self.accumulator / fixed).floor() as u32;
        #[allow(clippy::cast_precision_loss)]
        {
            self.accumulator -= due as f32 * fixed;
        }
        self.accumulator = self.accumulator.max(0.0);

        let steps = due.min(max_substeps.max(1));
        self.step_n(steps);

        if due > steps {
            tracing::debug!(due, steps, "physics substep cap reached, dropping surplus time");
        }
        steps
    }

    /// Adds a rigid body to the world and returns its handle.
    pub fn add_rigid_body(&mut self, rigid_body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(rigid_body)
    }

    /// Adds a collider attached to a rigid body.
    pub fn add_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Removes a rigid body and its attached colliders.
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// Gets an immutable reference to a rigid body.
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Gets a mutable reference to a rigid body.
    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Reads the world pose of a body, or `None` if the body is not in the
    /// simulation.
    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<Pose> {
        let body = self.get_rigid_body(handle)?;
        let t = body.translation();
        let r = body.rotation();
        Some(Pose {
            position: Vec3::new(t.x, t.y, t.z),
            orientation: Quat::from_xyzw(r.x, r.y, r.z, r.w),
        })
    }

    /// Linear velocity of a body.
    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        let v = self.get_rigid_body(handle)?.linvel();
        Some(Vec3::new(v.x, v.y, v.z))
    }

    /// Angular velocity of a body.
    pub fn angular_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        let w = self.get_rigid_body(handle)?.angvel();
        Some(Vec3::new(w.x, w.y, w.z))
    }

    /// Wakes a body up so that sleeping does not swallow the next impulse.
    pub fn activate(&mut self, handle: RigidBodyHandle) -> bool {
        let Some(body) = self.get_rigid_body_mut(handle) else {
            return false;
        };
        body.wake_up(true);
        true
    }

    /// Activates a body and applies an impulse through its center of mass.
    pub fn apply_central_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) -> bool {
        let Some(body) = self.get_rigid_body_mut(handle) else {
            return false;
        };
        body.wake_up(true);
        body.apply_impulse(to_vector(impulse), true);
        true
    }

    /// Overwrites both velocities of a body.
    pub fn set_velocities(&mut self, handle: RigidBodyHandle, linear: Vec3, angular: Vec3) -> bool {
        let Some(body) = self.get_rigid_body_mut(handle) else {
            return false;
        };
        body.set_linvel(to_vector(linear), true);
        body.set_angvel(to_vector(angular), true);
        true
    }

    /// Moves a body to `position` with identity rotation and no motion.
    pub fn teleport(&mut self, handle: RigidBodyHandle, position: Vec3) -> bool {
        let Some(body) = self.get_rigid_body_mut(handle) else {
            return false;
        };
        body.set_translation(to_vector(position), true);
        body.set_rotation(Rotation::IDENTITY, true);
        body.set_linvel(Vector::new(0.0, 0.0, 0.0), true);
        body.set_angvel(Vector::new(0.0, 0.0, 0.0), true);
        true
    }

    /// Returns the number of bodies currently in the simulation.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Returns the current simulation frame number.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn falling_ball(world: &mut PhysicsWorld, y: f32) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(0.0, y, 0.0))
            .build();
        let handle = world.add_rigid_body(body);
        world.add_collider(ColliderBuilder::ball(0.5).build(), handle);
        handle
    }

    #[test]
    fn test_physics_world_creation() {
        let world = PhysicsWorld::new();
        assert_eq!(world.frame, 0);
        assert_eq!(world.integration_parameters.dt, FIXED_DT);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_step_advances_frame() {
        let mut world = PhysicsWorld::new();
        assert_eq!(world.current_frame(), 0);

        world.step();
        assert_eq!(world.current_frame(), 1);

        world.step_n(10);
        assert_eq!(world.current_frame(), 11);
    }

    #[test]
    fn test_step_simulation_runs_one_step_per_fixed_delta() {
        let mut world = PhysicsWorld::new();
        for _ in 0..5 {
            assert_eq!(world.step_simulation(FIXED_DT, DEFAULT_MAX_SUBSTEPS), 1);
        }
        assert_eq!(world.current_frame(), 5);
    }

    #[test]
    fn test_step_simulation_accumulates_partial_frames() {
        let mut world = PhysicsWorld::new();
        assert_eq!(world.step_simulation(FIXED_DT * 0.5, DEFAULT_MAX_SUBSTEPS), 0);
        assert_eq!(world.step_simulation(FIXED_DT * 0.5, DEFAULT_MAX_SUBSTEPS), 1);
        assert_eq!(world.current_frame(), 1);
    }

    #[test]
    fn test_step_simulation_caps_substeps_and_drops_surplus() {
        let mut world = PhysicsWorld::new();
        assert_eq!(world.step_simulation(1.0, DEFAULT_MAX_SUBSTEPS), DEFAULT_MAX_SUBSTEPS);
        // The surplus from the long frame must not leak into the next one.
        assert_eq!(world.step_simulation(FIXED_DT, DEFAULT_MAX_SUBSTEPS), 1);
    }

    #[test]
    fn test_step_simulation_ignores_non_positive_time() {
        let mut world = PhysicsWorld::new();
        assert_eq!(world.step_simulation(0.0, DEFAULT_MAX_SUBSTEPS), 0);
        assert_eq!(world.step_simulation(-1.0, DEFAULT_MAX_SUBSTEPS), 0);
        assert_eq!(world.current_frame(), 0);
    }

    #[test]
    fn test_dynamic_body_falls() {
        let mut world = PhysicsWorld::new();
        let handle = falling_ball(&mut world, 10.0);

        let before = world.body_pose(handle).unwrap();
        world.step_n(10);
        let after = world.body_pose(handle).unwrap();

        assert!(after.position.y < before.position.y);
    }

    #[test]
    fn test_impulse_changes_velocity() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let handle = falling_ball(&mut world, 0.0);

        assert!(world.apply_central_impulse(handle, Vec3::new(1.0, 0.0, 0.0)));
        let v = world.linear_velocity(handle).unwrap();
        assert!(v.x > 0.0);
    }

    #[test]
    fn test_teleport_clears_motion() {
        let mut world = PhysicsWorld::new();
        let handle = falling_ball(&mut world, 5.0);
        world.step_n(30);

        assert!(world.teleport(handle, Vec3::new(1.0, 2.0, 3.0)));
        let pose = world.body_pose(handle).unwrap();
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(world.linear_velocity(handle), Some(Vec3::ZERO));
        assert_eq!(world.angular_velocity(handle), Some(Vec3::ZERO));
    }

    #[test]
    fn test_add_and_remove_body() {
        let mut world = PhysicsWorld::new();
        let handle = falling_ball(&mut world, 1.0);
        assert!(world.get_rigid_body(handle).is_some());

        assert!(world.remove_rigid_body(handle));
        assert!(world.get_rigid_body(handle).is_none());
        assert!(world.body_pose(handle).is_none());
        assert!(!world.remove_rigid_body(handle));
    }

    #[test]
    fn test_deterministic_simulation() {
        let mut world1 = PhysicsWorld::new();
        let mut world2 = PhysicsWorld::new();
        let h1 = falling_ball(&mut world1, 3.0);
        let h2 = falling_ball(&mut world2, 3.0);

        for _ in 0..100 {
            world1.step();
            world2.step();
        }

        assert_eq!(world1.body_pose(h1), world2.body_pose(h2));
    }
}
