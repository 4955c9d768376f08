//! Camera-relative movement via impulses on the player body.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::BodyId;
use crate::input::{InputState, Key};
use crate::physics::PhysicsWorld;

/// Below this horizontal length the camera is looking straight up or down and
/// there is no usable ground-plane direction.
const MIN_FACING_LENGTH: f32 = 1.0e-4;

/// Movement tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementSettings {
    #[serde(default = "default_move_impulse")]
    pub move_impulse: f32,
    #[serde(default = "default_jump_impulse")]
    pub jump_impulse: f32,
    /// Vertical speed under which the player counts as grounded.
    #[serde(default = "default_grounded_epsilon")]
    pub grounded_epsilon: f32,
}

fn default_move_impulse() -> f32 {
    1.5
}

fn default_jump_impulse() -> f32 {
    8.0
}

fn default_grounded_epsilon() -> f32 {
    0.1
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            move_impulse: default_move_impulse(),
            jump_impulse: default_jump_impulse(),
            grounded_epsilon: default_grounded_epsilon(),
        }
    }
}

/// Forward and left directions on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundBasis {
    pub forward: Vec3,
    pub left: Vec3,
}

impl GroundBasis {
    /// Projects the camera facing onto the plane orthogonal to `up` and
    /// normalizes it. Strafing is `up × forward`, which points left.
    pub fn from_facing(facing: Vec3, up: Vec3) -> Option<Self> {
        let flat = facing - up * facing.dot(up);
        if flat.length() < MIN_FACING_LENGTH {
            return None;
        }
        let forward = flat.normalize();
        let left = up.cross(forward).normalize_or_zero();
        Some(Self { forward, left })
    }
}

/// Grounded heuristic: the body is not moving vertically.
///
/// This reads the vertical velocity only, so it also reports grounded at the
/// apex of a jump.
pub fn is_grounded(vertical_velocity: f32, epsilon: f32) -> bool {
    vertical_velocity.abs() < epsilon
}

/// Turns held keys into impulses on the player body.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementController {
    pub settings: MovementSettings,
}

impl MovementController {
    pub fn new(settings: MovementSettings) -> Self {
        Self { settings }
    }

    /// Computes the impulses for one frame, in application order. Directional
    /// keys are independent: holding forward and left yields two impulses.
    pub fn impulses(&self, input: &InputState, basis: Option<GroundBasis>, grounded: bool) -> Vec<Vec3> {
        let mut impulses = Vec::new();
        let force = self.settings.move_impulse;

        if let Some(basis) = basis {
            if input.is_held(Key::Forward) {
                impulses.push(basis.forward * force);
            }
            if input.is_held(Key::Back) {
                impulses.push(-basis.forward * force);
            }
            if input.is_held(Key::Left) {
                impulses.push(basis.left * force);
            }
            if input.is_held(Key::Right) {
                impulses.push(-basis.left * force);
            }
        }

        if input.is_held(Key::Jump) && grounded {
            impulses.push(Vec3::Y * self.settings.jump_impulse);
        }

        impulses
    }

    /// Applies this frame's impulses to `player`. Each application wakes the
    /// body first. Returns the number of impulses applied.
    pub fn apply(
        &self,
        world: &mut PhysicsWorld,
        player: BodyId,
        input: &InputState,
        facing: Vec3,
        up: Vec3,
    ) -> usize {
        let Some(velocity) = world.linear_velocity(player.handle()) else {
            return 0;
        };
        let grounded = is_grounded(velocity.y, self.settings.grounded_epsilon);
        let basis = GroundBasis::from_facing(facing, up);

        let impulses = self.impulses(input, basis, grounded);
        for impulse in &impulses {
            world.activate(player.handle());
            world.apply_central_impulse(player.handle(), *impulse);
        }
        if !impulses.is_empty() {
            tracing::trace!(count = impulses.len(), grounded, "movement impulses applied");
        }
        impulses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyDesc, BodyRegistry, ShapeDesc};

    fn held(keys: &[Key]) -> InputState {
        let mut input = InputState::new();
        for key in keys {
            input.set(*key, true);
        }
        input
    }

    fn basis() -> Option<GroundBasis> {
        GroundBasis::from_facing(Vec3::NEG_Z, Vec3::Y)
    }

    #[test]
    fn test_basis_projects_and_normalizes() {
        let b = GroundBasis::from_facing(Vec3::new(0.0, -0.5, -0.5), Vec3::Y).unwrap();
        assert!(b.forward.abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(b.left.abs_diff_eq(Vec3::NEG_X, 1e-6));
    }

    #[test]
    fn test_basis_degenerate_when_looking_straight_down() {
        assert_eq!(GroundBasis::from_facing(Vec3::NEG_Y, Vec3::Y), None);
    }

    #[test]
    fn test_directional_impulses_are_independent() {
        let controller = MovementController::default();
        let impulses = controller.impulses(&held(&[Key::Forward, Key::Left]), basis(), false);

        assert_eq!(impulses.len(), 2);
        assert!(impulses[0].abs_diff_eq(Vec3::new(0.0, 0.0, -1.5), 1e-6));
        assert!(impulses[1].abs_diff_eq(Vec3::new(-1.5, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_opposite_keys_both_apply() {
        let controller = MovementController::default();
        let impulses = controller.impulses(&held(&[Key::Left, Key::Right]), basis(), false);
        assert_eq!(impulses.len(), 2);
        assert!((impulses[0] + impulses[1]).abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn test_jump_requires_grounded() {
        let controller = MovementController::default();
        assert!(controller.impulses(&held(&[Key::Jump]), basis(), false).is_empty());

        let impulses = controller.impulses(&held(&[Key::Jump]), basis(), true);
        assert_eq!(impulses, vec![Vec3::new(0.0, 8.0, 0.0)]);
    }

    #[test]
    fn test_grounded_threshold() {
        assert!(is_grounded(0.0, 0.1));
        assert!(is_grounded(-0.09, 0.1));
        assert!(!is_grounded(0.1, 0.1));
        assert!(!is_grounded(-3.0, 0.1));
    }

    #[test]
    fn test_apply_pushes_player() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let mut registry = BodyRegistry::new();
        let player = registry
            .add(
                &mut world,
                BodyDesc::new("player", ShapeDesc::Capsule { radius: 0.5, half_height: 0.25 })
                    .with_mass(1.0)
                    .lock_rotations(),
            )
            .unwrap();

        let controller = MovementController::default();
        let applied = controller.apply(
            &mut world,
            player,
            &held(&[Key::Forward, Key::Jump]),
            Vec3::NEG_Z,
            Vec3::Y,
        );
        assert_eq!(applied, 2);

        let v = world.linear_velocity(player.handle()).unwrap();
        assert!(v.z < 0.0);
        assert!(v.y > 0.0);
    }

    #[test]
    fn test_apply_on_missing_body_is_noop() {
        let mut world = PhysicsWorld::new();
        let mut registry = BodyRegistry::new();
        let player = registry
            .add(&mut world, BodyDesc::new("p", ShapeDesc::Sphere { radius: 0.5 }).with_mass(1.0))
            .unwrap();
        registry.remove(&mut world, player);

        let controller = MovementController::default();
        assert_eq!(
            controller.apply(&mut world, player, &held(&[Key::Forward]), Vec3::NEG_Z, Vec3::Y),
            0
        );
    }
}
