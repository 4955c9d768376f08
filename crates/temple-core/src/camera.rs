//! First-person camera rig that rides on the player body.

use glam::{Quat, Vec3};

/// Pitch limit, just short of straight up/down.
const MAX_PITCH: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;

/// Yaw/pitch camera carried at the player's position.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    pub position: Vec3,
    /// Height of the eye above the rig origin.
    pub eye_height: f32,
    /// Radians around +Y; zero looks down -Z.
    pub yaw: f32,
    /// Radians; positive looks up.
    pub pitch: f32,
    pub sensitivity: f32,
    /// Whether the pointer is captured. Movement is only applied while locked.
    pub locked: bool,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            eye_height: 1.5,
            yaw: 0.0,
            pitch: 0.0,
            sensitivity: 0.002,
            locked: false,
        }
    }
}

impl CameraRig {
    pub const UP: Vec3 = Vec3::Y;

    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Unit direction the camera looks in.
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn eye(&self) -> Vec3 {
        self.position + Self::UP * self.eye_height
    }

    /// Applies a mouse delta in pixels. Ignored while the pointer is free.
    pub fn look(&mut self, dx: f32, dy: f32) {
        if !self.locked {
            return;
        }
        self.yaw -= dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn follow(&mut self, target: Vec3) {
        self.position = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_negative_z() {
        let rig = CameraRig::default();
        assert!(rig.forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn test_look_requires_lock() {
        let mut rig = CameraRig::default();
        rig.look(100.0, 0.0);
        assert_eq!(rig.yaw, 0.0);

        rig.locked = true;
        rig.look(100.0, 0.0);
        assert!(rig.yaw < 0.0);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut rig = CameraRig {
            locked: true,
            ..Default::default()
        };
        rig.look(0.0, -1.0e6);
        assert!(rig.pitch <= MAX_PITCH);
        rig.look(0.0, 1.0e6);
        assert!(rig.pitch >= -MAX_PITCH);
    }

    #[test]
    fn test_quarter_turn() {
        let rig = CameraRig {
            yaw: std::f32::consts::FRAC_PI_2,
            ..Default::default()
        };
        assert!(rig.forward().abs_diff_eq(Vec3::NEG_X, 1e-6));
    }
}
