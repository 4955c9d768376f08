//! Pose sync bridge: copies physics body transforms into visible objects.
//!
//! This is the only place where simulation state becomes visible. Sync runs
//! after the physics step and before the renderer reads the scene graph.

use glam::{Quat, Vec3};
use thiserror::Error;

use crate::body::BodyId;
use crate::physics::PhysicsWorld;
use crate::scene_graph::{ObjectId, SceneGraph};

/// Position + orientation in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Error type for pose binding registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("object {0:?} is already driven by body {1:?}")]
    AlreadyBound(ObjectId, BodyId),
    #[error("object {0:?} does not exist in the scene graph")]
    UnknownObject(ObjectId),
}

/// A body whose pose is written to a visible object every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseBinding {
    pub body: BodyId,
    pub object: ObjectId,
}

/// Owns every `PoseBinding`. One writer per object; a body may feed many
/// objects.
#[derive(Debug, Default)]
pub struct PoseBridge {
    bindings: Vec<PoseBinding>,
}

impl PoseBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `body` as the pose source for `object`.
    pub fn bind(
        &mut self,
        graph: &SceneGraph,
        body: BodyId,
        object: ObjectId,
    ) -> Result<PoseBinding, BindingError> {
        if graph.get(object).is_none() {
            return Err(BindingError::UnknownObject(object));
        }
        if let Some(existing) = self.binding_for(object) {
            return Err(BindingError::AlreadyBound(object, existing.body));
        }

        let binding = PoseBinding { body, object };
        self.bindings.push(binding);
        Ok(binding)
    }

    /// Drops every binding fed by `body`. Returns how many were removed.
    pub fn unbind_body(&mut self, body: BodyId) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.body != body);
        before - self.bindings.len()
    }

    pub fn binding_for(&self, object: ObjectId) -> Option<&PoseBinding> {
        self.bindings.iter().find(|b| b.object == object)
    }

    pub fn bindings(&self) -> &[PoseBinding] {
        &self.bindings
    }

    /// Copies one body's pose verbatim onto its object.
    ///
    /// Returns `false` without touching the object when the body has no pose
    /// yet (not inserted, or already removed).
    pub fn sync(binding: PoseBinding, world: &PhysicsWorld, graph: &mut SceneGraph) -> bool {
        let Some(pose) = world.body_pose(binding.body.handle()) else {
            return false;
        };
        graph.set_pose(binding.object, pose)
    }

    /// Syncs every binding once. Returns the number of objects written.
    pub fn sync_all(&self, world: &PhysicsWorld, graph: &mut SceneGraph) -> usize {
        self.bindings
            .iter()
            .filter(|binding| Self::sync(**binding, world, graph))
            .count()
    }
}
