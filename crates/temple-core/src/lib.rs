//! Temple Puzzle Core Library
//!
//! First-person puzzle core on top of `Rapier3D`: keeps the physics world and
//! the render-visible scene graph in step every frame, and owns the
//! scene/puzzle/inventory state machine that gates interactions.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod body;
pub mod camera;
pub mod input;
pub mod interaction;
pub mod movement;
pub mod notice;
pub mod physics;
pub mod pose;
pub mod scenario;
pub mod scene;
pub mod scene_graph;
pub mod session;
pub mod theme;
pub mod timer;
pub mod trigger;

pub use assets::{AssetError, AssetLoader, JsonModelLoader, MeshData, ModelData, ModelPlacement};
pub use body::{Activation, BodyDesc, BodyError, BodyId, BodyRegistry, ShapeDesc};
pub use camera::CameraRig;
pub use input::{InputState, Key, Keyboard};
pub use interaction::{Interactable, InteractionDetector, InteractionProbe};
pub use movement::{MovementController, MovementSettings};
pub use notice::NoticeBoard;
pub use physics::{DEFAULT_MAX_SUBSTEPS, FIXED_DT, PhysicsWorld, default_gravity};
pub use pose::{BindingError, Pose, PoseBinding, PoseBridge};
pub use scenario::{ScenarioConfig, ScenarioError};
pub use scene::{DoorOutcome, KEY_COUNT, KeyPickup, SceneId, SceneMachine};
pub use scene_graph::{Color, ObjectId, SceneGraph};
pub use session::{FrameReport, GameSession, InteractionOutcome, SessionError};
pub use theme::{Theme, ThemeRegistry, ThemeRole};
pub use timer::{Scheduler, TimerAction};
pub use trigger::{TriggerDetector, TriggerKind, TriggerZone};
