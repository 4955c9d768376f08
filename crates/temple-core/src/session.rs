//! Game session: owns every subsystem and runs the frame loop.
//!
//! Per frame, in order: input snapshot, movement impulses, physics step, pose
//! sync and camera follow, interaction scan, win/lose check, due timers, then
//! the edge-triggered Reset and Interact actions.

use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use thiserror::Error;

use crate::assets::{AssetError, AssetLoader, ModelData, build_collision_mesh};
use crate::body::{Activation, BodyDesc, BodyError, BodyId, BodyRegistry, ShapeDesc};
use crate::camera::CameraRig;
use crate::input::{InputState, Key, Keyboard};
use crate::interaction::{Interactable, InteractionDetector, InteractionProbe};
use crate::movement::{GroundBasis, MovementController};
use crate::notice::NoticeBoard;
use crate::physics::PhysicsWorld;
use crate::pose::{BindingError, Pose, PoseBridge};
use crate::scenario::{ScenarioConfig, ScenarioError};
use crate::scene::{Door, DoorOutcome, KEY_COUNT, KeyPickup, SceneId, SceneMachine};
use crate::scene_graph::{ObjectId, SceneGraph};
use crate::theme::{Theme, ThemeRegistry, ThemeRole};
use crate::timer::{Scheduler, TimerAction};
use crate::trigger::{TriggerDetector, TriggerKind};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Body(#[from] BodyError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("scene {0:?} has no model placement")]
    NoModel(SceneId),
}

/// What an Interact press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    Key(SceneId, KeyPickup),
    /// The puzzle ball was pushed along the player's facing.
    Nudged,
    Door(DoorOutcome),
}

/// Summary of one `GameSession::frame` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub steps: u32,
    pub impulses: usize,
    pub prompt: Option<Interactable>,
    pub trigger: Option<TriggerKind>,
    pub interaction: Option<InteractionOutcome>,
    pub ball_reset: bool,
}

/// Logs model load progress as a percentage.
pub fn report_progress(scene: SceneId, loaded: u64, total: u64) {
    if total == 0 {
        return;
    }
    #[allow(clippy::cast_precision_loss)]
    let percent = loaded as f64 / total as f64 * 100.0;
    tracing::debug!(?scene, "loading model: {percent:.1}%");
}

fn vec3(v: [f32; 3]) -> Vec3 {
    Vec3::from_array(v)
}

pub struct GameSession {
    config: ScenarioConfig,
    world: PhysicsWorld,
    bodies: BodyRegistry,
    graph: SceneGraph,
    bridge: PoseBridge,
    themes: ThemeRegistry,
    keyboard: Keyboard,
    previous_input: InputState,
    camera: CameraRig,
    movement: MovementController,
    interaction: InteractionDetector,
    scenes: SceneMachine,
    triggers: TriggerDetector,
    scheduler: Scheduler<TimerAction>,
    notices: NoticeBoard,
    player: BodyId,
    player_objects: Vec<ObjectId>,
    ball: BodyId,
    ball_object: ObjectId,
    /// Bumped on every ball reset; pending resets for older attempts are dropped.
    attempt: u64,
    prompt: Option<Interactable>,
    scene_collision: [Option<BodyId>; 4],
    frames: u64,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("scenario", &self.config.meta.name)
            .field("active", &self.scenes.active())
            .field("keys", &self.scenes.key_count())
            .field("door_open", &self.scenes.door_open())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Builds the level described by `config`. Temple collision meshes are
    /// added later, as their models finish loading.
    pub fn new(config: ScenarioConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let mut world = PhysicsWorld::with_gravity(vec3(config.physics.gravity));
        let mut bodies = BodyRegistry::new();
        let mut graph = SceneGraph::new();
        graph.set_background(config.theme.background());
        let mut bridge = PoseBridge::new();
        let mut themes = ThemeRegistry::new(config.theme);

        let roots = SceneId::ALL.map(|scene| graph.spawn(format!("scene/{scene:?}"), None, Pose::IDENTITY));

        // Ground shared by every scene.
        let platform_at = vec3(config.platform.position);
        let platform = bodies.add(
            &mut world,
            BodyDesc::new(
                "platform",
                ShapeDesc::Box {
                    half_extents: config.platform.half_extents,
                },
            )
            .at(platform_at)
            .friction(config.platform.friction)
            .restitution(config.platform.restitution),
        )?;
        let platform_object = graph.spawn("platform", None, Pose::from_position(platform_at));
        bridge.bind(&graph, platform, platform_object)?;
        themes.register(&mut graph, platform_object, ThemeRole::Ground);

        // One player body, drawn once under every scene root.
        let p = &config.player;
        let spawn = vec3(p.spawn);
        let player = bodies.add(
            &mut world,
            BodyDesc::new("player", p.shape.clone())
                .with_mass(p.mass)
                .at(spawn)
                .friction(p.friction)
                .restitution(p.restitution)
                .damping(p.linear_damping, p.angular_damping)
                .activation(Activation::AlwaysActive)
                .lock_rotations(),
        )?;
        let mut player_objects = Vec::with_capacity(SceneId::ALL.len());
        for scene in SceneId::ALL {
            let object = graph.spawn(
                format!("player/{scene:?}"),
                Some(roots[scene.index()]),
                Pose::from_position(spawn),
            );
            bridge.bind(&graph, player, object)?;
            themes.register(&mut graph, object, ThemeRole::Player);
            player_objects.push(object);
        }

        let puzzle = &config.puzzle;
        let ball_spawn = vec3(puzzle.ball_spawn);
        let ball = bodies.add(
            &mut world,
            BodyDesc::new(
                "ball",
                ShapeDesc::Sphere {
                    radius: puzzle.ball_radius,
                },
            )
            .with_mass(puzzle.ball_mass)
            .at(ball_spawn)
            .friction(puzzle.ball_friction)
            .restitution(puzzle.ball_restitution)
            .activation(Activation::AlwaysActive)
            .ccd(),
        )?;
        let ball_object = graph.spawn("ball", Some(roots[puzzle.scene.index()]), Pose::from_position(ball_spawn));
        bridge.bind(&graph, ball, ball_object)?;
        themes.register(&mut graph, ball_object, ThemeRole::Puzzle);

        let keys = SceneId::TEMPLES.map(|scene| {
            let at = config.key_position(scene).unwrap_or(Vec3::ZERO);
            graph.spawn(format!("key/{scene:?}"), Some(roots[scene.index()]), Pose::from_position(at))
        });
        for key in keys {
            themes.register(&mut graph, key, ThemeRole::Key);
        }

        let door_at = vec3(config.door.position);
        let door_body = bodies.add(
            &mut world,
            BodyDesc::new(
                "door",
                ShapeDesc::Box {
                    half_extents: config.door.half_extents,
                },
            )
            .at(door_at),
        )?;
        let door_object = graph.spawn(
            "door",
            Some(roots[SceneId::DoorScene.index()]),
            Pose::from_position(door_at),
        );
        bridge.bind(&graph, door_body, door_object)?;
        themes.register(&mut graph, door_object, ThemeRole::Door);

        let scenes = SceneMachine::new(
            roots,
            keys,
            Door {
                body: door_body,
                object: door_object,
            },
            &mut graph,
        );

        let interaction = config
            .scenes
            .iter()
            .fold(InteractionDetector::new(config.interaction_radius), |detector, scene| {
                detector.with_list(scene.id, scene.interactables.clone())
            });
        let triggers = TriggerDetector::new(puzzle.win, puzzle.lose);
        let movement = MovementController::new(config.player.movement);
        let camera = CameraRig {
            position: spawn,
            ..CameraRig::default()
        };

        bridge.sync_all(&world, &mut graph);
        tracing::info!(
            scenario = %config.meta.name,
            bodies = bodies.len(),
            objects = graph.len(),
            "session created"
        );

        Ok(Self {
            config,
            world,
            bodies,
            graph,
            bridge,
            themes,
            keyboard: Keyboard::new(),
            previous_input: InputState::new(),
            camera,
            movement,
            interaction,
            scenes,
            triggers,
            scheduler: Scheduler::new(),
            notices: NoticeBoard::new(),
            player,
            player_objects,
            ball,
            ball_object,
            attempt: 0,
            prompt: None,
            scene_collision: [None; 4],
            frames: 0,
        })
    }

    /// Handle for key event callbacks.
    pub fn keyboard(&self) -> Keyboard {
        self.keyboard.clone()
    }

    pub fn set_pointer_locked(&mut self, locked: bool) {
        if self.camera.locked != locked {
            tracing::debug!(locked, "pointer lock changed");
        }
        self.camera.locked = locked;
    }

    /// Mouse-look by a pointer delta in pixels.
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.camera.look(dx, dy);
    }

    pub fn switch_scene(&mut self, target: SceneId) -> bool {
        self.scenes.switch_scene(target, &mut self.graph)
    }

    pub fn set_theme(&mut self, theme: Theme) -> usize {
        self.themes.set_theme(theme, &mut self.graph)
    }

    /// Runs one frame. `dt` is the wall time since the previous frame and
    /// drives the timers; the physics always advances by the configured
    /// time step.
    pub fn frame(&mut self, dt: Duration) -> FrameReport {
        let mut report = FrameReport::default();
        let input = self.keyboard.snapshot();

        if self.camera.locked {
            report.impulses = self.movement.apply(
                &mut self.world,
                self.player,
                &input,
                self.camera.forward(),
                CameraRig::UP,
            );
        }

        report.steps = self
            .world
            .step_simulation(self.config.physics.time_step, self.config.physics.max_substeps);
        self.bridge.sync_all(&self.world, &mut self.graph);
        if let Some(pose) = self.world.body_pose(self.player.handle()) {
            self.camera.follow(pose.position);
        }

        let prompt = self
            .interaction
            .scan(self.scenes.active(), self.camera.position, &*self);
        self.prompt = prompt;

        if let Some(ball) = self.world.body_pose(self.ball.handle()) {
            report.trigger = self.triggers.check(ball.position);
            if let Some(kind) = report.trigger {
                self.on_trigger(kind);
            }
        }

        for action in self.scheduler.advance(dt) {
            match action {
                TimerAction::ResetBall { attempt } if attempt == self.attempt => {
                    self.reset_ball();
                    report.ball_reset = true;
                }
                TimerAction::ResetBall { attempt } => {
                    tracing::debug!(attempt, current = self.attempt, "stale ball reset dropped");
                }
                TimerAction::HideNotice { generation } => {
                    self.notices.hide(generation);
                }
            }
        }

        if input.pressed_since(&self.previous_input, Key::Reset) {
            self.reset_ball();
            report.ball_reset = true;
        }
        if input.pressed_since(&self.previous_input, Key::Interact) {
            if let Some(target) = self.prompt {
                report.interaction = self.interact(target);
            }
        }

        self.previous_input = input;
        self.frames += 1;
        report.prompt = self.prompt;
        report
    }

    fn on_trigger(&mut self, kind: TriggerKind) {
        let duration = self.config.notice_duration_ms;
        match kind {
            TriggerKind::Win => {
                let mut newly_completed = 0;
                for scene in SceneId::TEMPLES {
                    if self.scenes.complete_puzzle(scene) {
                        newly_completed += 1;
                    }
                    self.scenes.reveal_key(scene, &mut self.graph);
                }
                tracing::info!(newly_completed, "puzzle won");
                if newly_completed > 0 {
                    self.notices
                        .show("Puzzle solved! The keys have appeared", duration, &mut self.scheduler);
                }
            }
            TriggerKind::Lose => {
                tracing::info!(attempt = self.attempt, "puzzle lost");
                self.notices.show("The ball fell in. Resetting...", duration, &mut self.scheduler);
                self.scheduler.schedule(
                    self.config.puzzle.reset_delay_ms,
                    TimerAction::ResetBall {
                        attempt: self.attempt,
                    },
                );
            }
        }
    }

    fn interact(&mut self, target: Interactable) -> Option<InteractionOutcome> {
        let duration = self.config.notice_duration_ms;
        match target {
            Interactable::Key(scene) => {
                let pickup = self.scenes.collect_key(scene, &mut self.graph);
                if pickup == KeyPickup::Collected {
                    let text = format!("Key collected ({}/{KEY_COUNT})", self.scenes.key_count());
                    self.notices.show(text, duration, &mut self.scheduler);
                }
                Some(InteractionOutcome::Key(scene, pickup))
            }
            Interactable::PuzzleObject => {
                let basis = GroundBasis::from_facing(self.camera.forward(), CameraRig::UP)?;
                let impulse = basis.forward * self.config.player.nudge_impulse;
                self.world
                    .apply_central_impulse(self.ball.handle(), impulse)
                    .then_some(InteractionOutcome::Nudged)
            }
            Interactable::Door => {
                let outcome = self.scenes.try_open_door(
                    &mut self.world,
                    &mut self.bodies,
                    &mut self.bridge,
                    &mut self.graph,
                );
                match outcome {
                    DoorOutcome::Locked { missing } => {
                        self.notices
                            .show(DoorOutcome::locked_message(missing), duration, &mut self.scheduler);
                    }
                    DoorOutcome::Opened => {
                        self.notices.show("The door opens", duration, &mut self.scheduler);
                    }
                    DoorOutcome::AlreadyOpen => {}
                }
                Some(InteractionOutcome::Door(outcome))
            }
        }
    }

    /// Puts the ball back at its spawn at rest and re-arms the triggers.
    /// Inventory and puzzle flags are left alone.
    pub fn reset_ball(&mut self) {
        self.attempt += 1;
        self.world.teleport(self.ball.handle(), self.ball_spawn());
        self.triggers.rearm();
        if let Some(binding) = self.bridge.binding_for(self.ball_object).copied() {
            PoseBridge::sync(binding, &self.world, &mut self.graph);
        }
        tracing::info!(attempt = self.attempt, "ball reset");
    }

    /// Handles a finished (or failed) model load for `scene`. On failure the
    /// scene simply has no collision geometry.
    pub fn on_model_loaded(&mut self, scene: SceneId, result: Result<ModelData, AssetError>) -> Option<BodyId> {
        match result
            .map_err(SessionError::from)
            .and_then(|model| self.add_scene_collision(scene, &model))
        {
            Ok(body) => Some(body),
            Err(err) => {
                tracing::error!(?scene, error = %err, "model unavailable, continuing without its collision");
                None
            }
        }
    }

    /// Builds the fixed triangle-mesh collider for a scene's model. Only the
    /// first successful call per scene adds a body.
    pub fn add_scene_collision(&mut self, scene: SceneId, model: &ModelData) -> Result<BodyId, SessionError> {
        if let Some(existing) = self.scene_collision[scene.index()] {
            tracing::warn!(?scene, "collision geometry already built");
            return Ok(existing);
        }
        let placement = self
            .config
            .scene(scene)
            .and_then(|s| s.model.clone())
            .ok_or(SessionError::NoModel(scene))?;

        let shape = build_collision_mesh(model, &placement)?;
        let body = self.bodies.add(
            &mut self.world,
            BodyDesc::new(format!("temple/{scene:?}"), shape)
                .at(placement.origin())
                .friction(self.config.platform.friction),
        )?;
        self.scene_collision[scene.index()] = Some(body);
        tracing::info!(?scene, path = %placement.path, "temple collision added");
        Ok(body)
    }

    /// Loads every placed model through `loader`. Returns how many produced
    /// collision geometry.
    pub fn load_models(&mut self, loader: &dyn AssetLoader) -> usize {
        let placements: Vec<(SceneId, String)> = self
            .config
            .scenes
            .iter()
            .filter_map(|s| s.model.as_ref().map(|m| (s.id, m.path.clone())))
            .collect();

        let mut built = 0;
        for (scene, path) in placements {
            let result = loader.load(Path::new(&path), &mut |loaded, total| {
                report_progress(scene, loaded, total);
            });
            if self.on_model_loaded(scene, result).is_some() {
                built += 1;
            }
        }
        built
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn bodies(&self) -> &BodyRegistry {
        &self.bodies
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn scenes(&self) -> &SceneMachine {
        &self.scenes
    }

    pub fn triggers(&self) -> &TriggerDetector {
        &self.triggers
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn themes(&self) -> &ThemeRegistry {
        &self.themes
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn player(&self) -> BodyId {
        self.player
    }

    pub fn player_objects(&self) -> &[ObjectId] {
        &self.player_objects
    }

    pub fn player_position(&self) -> Option<Vec3> {
        self.world.body_pose(self.player.handle()).map(|p| p.position)
    }

    pub fn ball(&self) -> BodyId {
        self.ball
    }

    pub fn ball_object(&self) -> ObjectId {
        self.ball_object
    }

    pub fn ball_spawn(&self) -> Vec3 {
        vec3(self.config.puzzle.ball_spawn)
    }

    pub fn ball_position(&self) -> Option<Vec3> {
        self.world.body_pose(self.ball.handle()).map(|p| p.position)
    }

    /// What Interact would act on right now.
    pub fn prompt(&self) -> Option<Interactable> {
        self.prompt
    }

    pub fn scene_collision(&self, scene: SceneId) -> Option<BodyId> {
        self.scene_collision[scene.index()]
    }

    /// Session clock, advanced by each frame's `dt`.
    pub fn clock(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl InteractionProbe for GameSession {
    fn locate(&self, target: Interactable) -> Option<Vec3> {
        match target {
            Interactable::Key(scene) => {
                let key = self.scenes.key_object(scene)?;
                if self.scenes.has_key(scene) || !self.graph.is_visible(key) {
                    return None;
                }
                self.graph.pose(key).map(|p| p.position)
            }
            Interactable::PuzzleObject => {
                if self.scenes.is_completed(self.config.puzzle.scene) || self.triggers.is_resolved() {
                    return None;
                }
                self.ball_position()
            }
            Interactable::Door => {
                if self.scenes.door_open() {
                    return None;
                }
                self.graph.pose(self.scenes.door().object).map(|p| p.position)
            }
        }
    }
}
