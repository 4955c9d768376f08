//! Scenario configuration.
//!
//! One scenario describes the whole level: physics settings, the player, the
//! ground platform, the four scenes with their interactables and models, the
//! ball puzzle and the door. `ScenarioConfig::default()` is the built-in
//! temple level; `scenarios/temple.json` ships the same data as a file.

use std::collections::HashSet;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::ModelPlacement;
use crate::body::ShapeDesc;
use crate::interaction::{DEFAULT_INTERACTION_RADIUS, Interactable};
use crate::movement::MovementSettings;
use crate::physics::{DEFAULT_MAX_SUBSTEPS, FIXED_DT};
use crate::scene::SceneId;
use crate::theme::Theme;
use crate::trigger::TriggerZone;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("scene {0:?} is missing")]
    MissingScene(SceneId),
    #[error("scene {0:?} is listed more than once")]
    DuplicateScene(SceneId),
    #[error("temple {0:?} has no key position")]
    MissingKeyPosition(SceneId),
    #[error("interactable {0:?} refers to a scene without a key")]
    InvalidKey(Interactable),
    #[error("puzzle must live in a temple scene, not {0:?}")]
    PuzzleOutsideTemple(SceneId),
    #[error("`{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("`{field}` must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Simulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSettings {
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    /// Simulated time fed to the step driver on each frame.
    #[serde(default = "default_time_step")]
    pub time_step: f32,
    #[serde(default = "default_max_substeps")]
    pub max_substeps: u32,
}

fn default_gravity() -> [f32; 3] {
    crate::physics::default_gravity().to_array()
}

fn default_time_step() -> f32 {
    FIXED_DT
}

fn default_max_substeps() -> u32 {
    DEFAULT_MAX_SUBSTEPS
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            time_step: default_time_step(),
            max_substeps: default_max_substeps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub spawn: [f32; 3],
    pub shape: ShapeDesc,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub friction: f32,
    pub restitution: f32,
    #[serde(default)]
    pub movement: MovementSettings,
    /// Impulse given to the puzzle ball when the player pushes it.
    #[serde(default = "default_nudge_impulse")]
    pub nudge_impulse: f32,
}

fn default_nudge_impulse() -> f32 {
    2.0
}

/// The static ground slab shared by every scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    pub friction: f32,
    #[serde(default)]
    pub restitution: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub id: SceneId,
    /// Checked in this order; the first active one in range is offered.
    #[serde(default)]
    pub interactables: Vec<Interactable>,
    #[serde(default)]
    pub key_position: Option<[f32; 3]>,
    #[serde(default)]
    pub model: Option<ModelPlacement>,
}

/// The ball-rolling puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleConfig {
    pub scene: SceneId,
    pub ball_spawn: [f32; 3],
    pub ball_radius: f32,
    pub ball_mass: f32,
    #[serde(default)]
    pub ball_friction: f32,
    #[serde(default)]
    pub ball_restitution: f32,
    pub win: TriggerZone,
    pub lose: TriggerZone,
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,
}

fn default_reset_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorConfig {
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub physics: PhysicsSettings,
    pub player: PlayerConfig,
    pub platform: PlatformConfig,
    #[serde(default = "default_interaction_radius")]
    pub interaction_radius: f32,
    pub scenes: Vec<SceneConfig>,
    pub puzzle: PuzzleConfig,
    pub door: DoorConfig,
    #[serde(default = "default_notice_duration_ms")]
    pub notice_duration_ms: u64,
    #[serde(default)]
    pub theme: Theme,
}

fn default_interaction_radius() -> f32 {
    DEFAULT_INTERACTION_RADIUS
}

fn default_notice_duration_ms() -> u64 {
    2000
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::temple()
    }
}

impl ScenarioConfig {
    /// Parses and validates a scenario.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The three-temple level with the ball puzzle in the first temple.
    pub fn temple() -> Self {
        Self {
            meta: ScenarioMeta {
                name: "Temple".to_string(),
                description: "Three temples, one ball puzzle and a locked door".to_string(),
            },
            physics: PhysicsSettings::default(),
            player: PlayerConfig {
                spawn: [0.0, 3.0, 2.0],
                shape: ShapeDesc::Capsule {
                    radius: 0.5,
                    half_height: 0.25,
                },
                mass: 1.0,
                linear_damping: 3.0,
                angular_damping: 3.0,
                friction: 0.3,
                restitution: 0.0,
                movement: MovementSettings::default(),
                nudge_impulse: default_nudge_impulse(),
            },
            platform: PlatformConfig {
                position: [0.0, -0.5, 0.0],
                half_extents: [35.0, 0.25, 35.0],
                friction: 1.0,
                restitution: 0.0,
            },
            interaction_radius: DEFAULT_INTERACTION_RADIUS,
            scenes: vec![
                SceneConfig {
                    id: SceneId::TempleOne,
                    interactables: vec![Interactable::Key(SceneId::TempleOne), Interactable::PuzzleObject],
                    key_position: Some([-4.0, 1.0, 2.0]),
                    model: Some(ModelPlacement {
                        path: "models/temple.json".to_string(),
                        position: [-15.0, 0.0, 0.0],
                        scale: 5.0,
                        yaw_degrees: 0.0,
                    }),
                },
                SceneConfig {
                    id: SceneId::TempleTwo,
                    interactables: vec![Interactable::Key(SceneId::TempleTwo)],
                    key_position: Some([4.0, 1.0, 2.0]),
                    model: Some(ModelPlacement {
                        path: "models/aztec_temple.json".to_string(),
                        position: [5.0, 0.0, 0.0],
                        scale: 0.01,
                        yaw_degrees: 270.0,
                    }),
                },
                SceneConfig {
                    id: SceneId::TempleThree,
                    interactables: vec![Interactable::Key(SceneId::TempleThree)],
                    key_position: Some([0.0, 1.0, 6.0]),
                    model: Some(ModelPlacement {
                        path: "models/forgotten_temple.json".to_string(),
                        position: [-1.0, 0.0, 10.0],
                        scale: 0.0045,
                        yaw_degrees: 270.0,
                    }),
                },
                SceneConfig {
                    id: SceneId::DoorScene,
                    interactables: vec![Interactable::Door],
                    key_position: None,
                    model: None,
                },
            ],
            puzzle: PuzzleConfig {
                scene: SceneId::TempleOne,
                ball_spawn: [0.0, 1.0, -3.0],
                ball_radius: 0.5,
                ball_mass: 1.0,
                ball_friction: 0.5,
                ball_restitution: 0.2,
                win: TriggerZone::new(Vec3::new(6.0, 0.25, -3.0), 1.5),
                lose: TriggerZone::new(Vec3::new(-6.0, 0.25, -3.0), 1.5),
                reset_delay_ms: default_reset_delay_ms(),
            },
            door: DoorConfig {
                position: [0.0, 1.5, -12.0],
                half_extents: [1.5, 1.5, 0.25],
            },
            notice_duration_ms: default_notice_duration_ms(),
            theme: Theme::Day,
        }
    }

    pub fn scene(&self, id: SceneId) -> Option<&SceneConfig> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn key_position(&self, scene: SceneId) -> Option<Vec3> {
        self.scene(scene)
            .and_then(|s| s.key_position)
            .map(Vec3::from_array)
    }

    /// Checks that the scenario is complete and its numbers make sense.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut seen = HashSet::new();
        for scene in &self.scenes {
            if !seen.insert(scene.id) {
                return Err(ScenarioError::DuplicateScene(scene.id));
            }
        }
        for id in SceneId::ALL {
            if !seen.contains(&id) {
                return Err(ScenarioError::MissingScene(id));
            }
        }
        for id in SceneId::TEMPLES {
            if self.key_position(id).is_none() {
                return Err(ScenarioError::MissingKeyPosition(id));
            }
        }
        for target in self.scenes.iter().flat_map(|s| &s.interactables) {
            if matches!(target, Interactable::Key(scene) if !scene.is_temple()) {
                return Err(ScenarioError::InvalidKey(*target));
            }
        }
        if !self.puzzle.scene.is_temple() {
            return Err(ScenarioError::PuzzleOutsideTemple(self.puzzle.scene));
        }

        let [px, py, pz] = self.platform.half_extents;
        let [dx, dy, dz] = self.door.half_extents;
        let mut positive = vec![
            ("physics.time_step", self.physics.time_step),
            ("player.mass", self.player.mass),
            ("platform.half_extents", px),
            ("platform.half_extents", py),
            ("platform.half_extents", pz),
            ("door.half_extents", dx),
            ("door.half_extents", dy),
            ("door.half_extents", dz),
            ("interaction_radius", self.interaction_radius),
            ("puzzle.ball_radius", self.puzzle.ball_radius),
            ("puzzle.ball_mass", self.puzzle.ball_mass),
            ("puzzle.win.radius", self.puzzle.win.radius),
            ("puzzle.lose.radius", self.puzzle.lose.radius),
        ];
        positive.extend(
            self.scenes
                .iter()
                .filter_map(|s| s.model.as_ref())
                .map(|m| ("scenes.model.scale", m.scale)),
        );
        for (field, value) in positive {
            if !value.is_finite() {
                return Err(ScenarioError::NonFinite { field, value });
            }
            if value <= 0.0 {
                return Err(ScenarioError::NonPositive { field, value });
            }
        }

        let mut finite = vec![
            ("player.linear_damping", self.player.linear_damping),
            ("player.angular_damping", self.player.angular_damping),
            ("player.friction", self.player.friction),
            ("player.restitution", self.player.restitution),
            ("player.nudge_impulse", self.player.nudge_impulse),
            ("platform.friction", self.platform.friction),
            ("platform.restitution", self.platform.restitution),
            ("puzzle.ball_friction", self.puzzle.ball_friction),
            ("puzzle.ball_restitution", self.puzzle.ball_restitution),
        ];
        let vectors = [
            ("physics.gravity", self.physics.gravity),
            ("player.spawn", self.player.spawn),
            ("platform.position", self.platform.position),
            ("puzzle.ball_spawn", self.puzzle.ball_spawn),
            ("puzzle.win.position", self.puzzle.win.position),
            ("puzzle.lose.position", self.puzzle.lose.position),
            ("door.position", self.door.position),
        ];
        for (field, vector) in vectors {
            finite.extend(vector.map(|value| (field, value)));
        }
        for scene in &self.scenes {
            if let Some(key) = scene.key_position {
                finite.extend(key.map(|value| ("scenes.key_position", value)));
            }
            if let Some(model) = &scene.model {
                finite.extend(model.position.map(|value| ("scenes.model.position", value)));
                finite.push(("scenes.model.yaw_degrees", model.yaw_degrees));
            }
        }
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ScenarioError::NonFinite { field, value });
            }
        }
        Ok(())
    }
}
