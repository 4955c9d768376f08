//! Rigid body registry.
//!
//! Every body in the simulation is created and removed through
//! `BodyRegistry`, which keeps a record of what was added so bodies can be
//! listed, looked up by name and removed uniformly.

use glam::Vec3;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::physics::PhysicsWorld;

/// Error type for body creation.
#[derive(Debug, Error, PartialEq)]
pub enum BodyError {
    #[error("body `{0}` has invalid mass {1}")]
    InvalidMass(String, f32),
    #[error("body `{0}` has an empty triangle mesh")]
    EmptyMesh(String),
    #[error("body `{0}` uses a triangle mesh but is dynamic")]
    DynamicTriangleMesh(String),
    #[error("triangle mesh for `{0}` rejected: {1}")]
    TriangleMesh(String, String),
}

/// Copyable reference to a body owned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(RigidBodyHandle);

impl BodyId {
    pub fn handle(self) -> RigidBodyHandle {
        self.0
    }
}

/// Collision shape of a body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDesc {
    Box { half_extents: [f32; 3] },
    Sphere { radius: f32 },
    /// Y-aligned capsule.
    Capsule { radius: f32, half_height: f32 },
    TriangleMesh {
        vertices: Vec<[f32; 3]>,
        triangles: Vec<[u32; 3]>,
    },
}

/// Whether the engine may put a resting body to sleep.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    MaySleep,
    AlwaysActive,
}

/// Everything needed to create a body. Mass 0 means static.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub name: String,
    pub shape: ShapeDesc,
    pub mass: f32,
    pub position: Vec3,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub activation: Activation,
    pub lock_rotations: bool,
    pub ccd: bool,
}

impl BodyDesc {
    pub fn new(name: impl Into<String>, shape: ShapeDesc) -> Self {
        Self {
            name: name.into(),
            shape,
            mass: 0.0,
            position: Vec3::ZERO,
            friction: 0.5,
            restitution: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            activation: Activation::MaySleep,
            lock_rotations: false,
            ccd: false,
        }
    }

    #[must_use]
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    #[must_use]
    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    #[must_use]
    pub fn damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    #[must_use]
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    #[must_use]
    pub fn lock_rotations(mut self) -> Self {
        self.lock_rotations = true;
        self
    }

    #[must_use]
    pub fn ccd(mut self) -> Self {
        self.ccd = true;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }

    fn rigid_body(&self) -> RigidBody {
        let translation = Vector::new(self.position.x, self.position.y, self.position.z);
        if self.is_static() {
            return RigidBodyBuilder::fixed().translation(translation).build();
        }

        let mut builder = RigidBodyBuilder::dynamic()
            .translation(translation)
            .linear_damping(self.linear_damping)
            .angular_damping(self.angular_damping)
            .can_sleep(self.activation == Activation::MaySleep)
            .ccd_enabled(self.ccd);
        if self.lock_rotations {
            builder = builder.lock_rotations();
        }
        builder.build()
    }

    fn collider(&self) -> Result<Collider, BodyError> {
        let builder = match &self.shape {
            ShapeDesc::Box { half_extents } => {
                ColliderBuilder::cuboid(half_extents[0], half_extents[1], half_extents[2])
            }
            ShapeDesc::Sphere { radius } => ColliderBuilder::ball(*radius),
            ShapeDesc::Capsule {
                radius,
                half_height,
            } => ColliderBuilder::capsule_y(*half_height, *radius),
            ShapeDesc::TriangleMesh {
                vertices,
                triangles,
            } => {
                if triangles.is_empty() || vertices.is_empty() {
                    return Err(BodyError::EmptyMesh(self.name.clone()));
                }
                let points = vertices
                    .iter()
                    .map(|v| Vector::new(v[0], v[1], v[2]).into())
                    .collect();
                ColliderBuilder::trimesh(points, triangles.clone()).map_err(|err| {
                    BodyError::TriangleMesh(self.name.clone(), format!("{err:?}"))
                })?
            }
        };

        let mut builder = builder
            .friction(self.friction)
            .restitution(self.restitution);
        if !self.is_static() {
            builder = builder.mass(self.mass);
        }
        Ok(builder.build())
    }
}

/// What the registry remembers about a body it added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRecord {
    pub name: String,
    pub is_static: bool,
}

/// Owns every body added to the simulation.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    records: Vec<(BodyId, BodyRecord)>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a body and its collider and inserts both into the world.
    pub fn add(&mut self, world: &mut PhysicsWorld, desc: BodyDesc) -> Result<BodyId, BodyError> {
        if !desc.mass.is_finite() || desc.mass < 0.0 {
            return Err(BodyError::InvalidMass(desc.name, desc.mass));
        }
        if !desc.is_static() && matches!(desc.shape, ShapeDesc::TriangleMesh { .. }) {
            return Err(BodyError::DynamicTriangleMesh(desc.name));
        }

        let collider = desc.collider()?;
        let handle = world.add_rigid_body(desc.rigid_body());
        world.add_collider(collider, handle);

        let id = BodyId(handle);
        tracing::debug!(name = %desc.name, is_static = desc.is_static(), "rigid body added");
        self.records.push((
            id,
            BodyRecord {
                is_static: desc.is_static(),
                name: desc.name,
            },
        ));
        Ok(id)
    }

    /// Removes a body (and its colliders) from the simulation.
    pub fn remove(&mut self, world: &mut PhysicsWorld, id: BodyId) -> bool {
        let Some(pos) = self.records.iter().position(|(rid, _)| *rid == id) else {
            return false;
        };
        let (_, record) = self.records.remove(pos);
        let removed = world.remove_rigid_body(id.handle());
        tracing::debug!(name = %record.name, removed, "rigid body removed");
        removed
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.records.iter().any(|(rid, _)| *rid == id)
    }

    pub fn get(&self, id: BodyId) -> Option<&BodyRecord> {
        self.records
            .iter()
            .find(|(rid, _)| *rid == id)
            .map(|(_, record)| record)
    }

    /// Finds a body by the name it was created with.
    pub fn find(&self, name: &str) -> Option<BodyId> {
        self.records
            .iter()
            .find(|(_, record)| record.name == name)
            .map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &BodyRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes every registered body from the world.
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for (id, _) in self.records.drain(..) {
            world.remove_rigid_body(id.handle());
        }
    }
}
