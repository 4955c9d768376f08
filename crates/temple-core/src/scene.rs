//! Scene, puzzle and inventory state machine.
//!
//! Owns which scene is active, which temple puzzles are solved, which keys the
//! player holds and whether the door is open. Every transition is idempotent.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::body::{BodyId, BodyRegistry};
use crate::physics::PhysicsWorld;
use crate::pose::PoseBridge;
use crate::scene_graph::{ObjectId, SceneGraph};

/// Number of keys needed to open the door.
pub const KEY_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneId {
    TempleOne,
    TempleTwo,
    TempleThree,
    DoorScene,
}

impl SceneId {
    pub const ALL: [SceneId; 4] = [
        SceneId::TempleOne,
        SceneId::TempleTwo,
        SceneId::TempleThree,
        SceneId::DoorScene,
    ];

    /// Scenes that have a puzzle and a key.
    pub const TEMPLES: [SceneId; KEY_COUNT] =
        [SceneId::TempleOne, SceneId::TempleTwo, SceneId::TempleThree];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn temple_index(self) -> Option<usize> {
        match self {
            SceneId::DoorScene => None,
            temple => Some(temple.index()),
        }
    }

    pub fn is_temple(self) -> bool {
        self.temple_index().is_some()
    }
}

/// Result of `SceneMachine::collect_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPickup {
    Collected,
    AlreadyHeld,
    PuzzleIncomplete,
    NotATemple,
}

/// Result of `SceneMachine::try_open_door`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorOutcome {
    Opened,
    AlreadyOpen,
    Locked { missing: usize },
}

impl DoorOutcome {
    /// Text shown to the player for a locked door.
    pub fn locked_message(missing: usize) -> String {
        format!("Door locked: need {missing} more key(s)")
    }
}

/// The door's physical body and its visible object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Door {
    pub body: BodyId,
    pub object: ObjectId,
}

#[derive(Debug)]
pub struct SceneMachine {
    active: SceneId,
    roots: [ObjectId; 4],
    completed: [bool; KEY_COUNT],
    inventory: BTreeSet<SceneId>,
    keys: [ObjectId; KEY_COUNT],
    door: Door,
    door_open: bool,
}

impl SceneMachine {
    /// Starts in `TempleOne` with no puzzles solved and no keys. Only the
    /// active root is shown and every key object starts hidden.
    pub fn new(
        roots: [ObjectId; 4],
        keys: [ObjectId; KEY_COUNT],
        door: Door,
        graph: &mut SceneGraph,
    ) -> Self {
        let active = SceneId::TempleOne;
        for scene in SceneId::ALL {
            graph.set_visible(roots[scene.index()], scene == active);
        }
        for key in keys {
            graph.set_visible(key, false);
        }

        Self {
            active,
            roots,
            completed: [false; KEY_COUNT],
            inventory: BTreeSet::new(),
            keys,
            door,
            door_open: false,
        }
    }

    pub fn active(&self) -> SceneId {
        self.active
    }

    pub fn root(&self, scene: SceneId) -> ObjectId {
        self.roots[scene.index()]
    }

    /// Shows `target`'s root and hides the current one. Returns `false` when
    /// `target` is already active.
    pub fn switch_scene(&mut self, target: SceneId, graph: &mut SceneGraph) -> bool {
        if target == self.active {
            return false;
        }
        graph.set_visible(self.root(self.active), false);
        graph.set_visible(self.root(target), true);
        tracing::info!(from = ?self.active, to = ?target, "scene switched");
        self.active = target;
        true
    }

    /// Marks a temple's puzzle solved. Returns `true` only the first time.
    pub fn complete_puzzle(&mut self, scene: SceneId) -> bool {
        let Some(index) = scene.temple_index() else {
            tracing::warn!(?scene, "scene has no puzzle");
            return false;
        };
        if self.completed[index] {
            return false;
        }
        self.completed[index] = true;
        tracing::info!(?scene, "puzzle completed");
        true
    }

    pub fn is_completed(&self, scene: SceneId) -> bool {
        scene.temple_index().is_some_and(|i| self.completed[i])
    }

    pub fn key_object(&self, scene: SceneId) -> Option<ObjectId> {
        scene.temple_index().map(|i| self.keys[i])
    }

    /// Makes a solved temple's key visible, unless it was already picked up.
    pub fn reveal_key(&mut self, scene: SceneId, graph: &mut SceneGraph) -> bool {
        if !self.is_completed(scene) || self.has_key(scene) {
            return false;
        }
        self.key_object(scene)
            .is_some_and(|key| graph.set_visible(key, true))
    }

    /// Picks up a temple's key. Does nothing until that temple's puzzle is
    /// solved, and nothing once the key is held.
    pub fn collect_key(&mut self, scene: SceneId, graph: &mut SceneGraph) -> KeyPickup {
        let Some(key) = self.key_object(scene) else {
            return KeyPickup::NotATemple;
        };
        if !self.is_completed(scene) {
            return KeyPickup::PuzzleIncomplete;
        }
        if !self.inventory.insert(scene) {
            return KeyPickup::AlreadyHeld;
        }
        graph.set_visible(key, false);
        tracing::info!(?scene, held = self.inventory.len(), "key collected");
        KeyPickup::Collected
    }

    pub fn has_key(&self, scene: SceneId) -> bool {
        self.inventory.contains(&scene)
    }

    pub fn inventory(&self) -> impl Iterator<Item = SceneId> + '_ {
        self.inventory.iter().copied()
    }

    pub fn key_count(&self) -> usize {
        self.inventory.len()
    }

    pub fn has_all_keys(&self) -> bool {
        self.inventory.len() == KEY_COUNT
    }

    pub fn door(&self) -> Door {
        self.door
    }

    pub fn door_open(&self) -> bool {
        self.door_open
    }

    /// Opens the door if all keys are held: the door body leaves the
    /// simulation and its object is hidden, once and for good.
    pub fn try_open_door(
        &mut self,
        world: &mut PhysicsWorld,
        registry: &mut BodyRegistry,
        bridge: &mut PoseBridge,
        graph: &mut SceneGraph,
    ) -> DoorOutcome {
        if self.door_open {
            return DoorOutcome::AlreadyOpen;
        }
        if !self.has_all_keys() {
            let missing = KEY_COUNT - self.inventory.len();
            tracing::debug!(missing, "door locked");
            return DoorOutcome::Locked { missing };
        }

        bridge.unbind_body(self.door.body);
        registry.remove(world, self.door.body);
        graph.set_visible(self.door.object, false);
        self.door_open = true;
        tracing::info!("door opened");
        DoorOutcome::Opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyDesc, ShapeDesc};
    use crate::pose::Pose;

    struct Fixture {
        world: PhysicsWorld,
        registry: BodyRegistry,
        bridge: PoseBridge,
        graph: SceneGraph,
        machine: SceneMachine,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = PhysicsWorld::new();
            let mut registry = BodyRegistry::new();
            let mut bridge = PoseBridge::new();
            let mut graph = SceneGraph::new();

            let roots = SceneId::ALL.map(|s| graph.spawn(format!("{s:?}"), None, Pose::IDENTITY));
            let keys = SceneId::TEMPLES.map(|s| {
                graph.spawn(format!("key-{s:?}"), Some(roots[s.index()]), Pose::IDENTITY)
            });
            let door_body = registry
                .add(
                    &mut world,
                    BodyDesc::new("door", ShapeDesc::Box { half_extents: [1.5, 2.0, 0.25] }),
                )
                .unwrap();
            let door_object = graph.spawn("door", Some(roots[3]), Pose::IDENTITY);
            bridge.bind(&graph, door_body, door_object).unwrap();

            let machine = SceneMachine::new(
                roots,
                keys,
                Door {
                    body: door_body,
                    object: door_object,
                },
                &mut graph,
            );
            Self {
                world,
                registry,
                bridge,
                graph,
                machine,
            }
        }

        fn open_door(&mut self) -> DoorOutcome {
            self.machine.try_open_door(
                &mut self.world,
                &mut self.registry,
                &mut self.bridge,
                &mut self.graph,
            )
        }

        fn collect_all(&mut self) {
            for scene in SceneId::TEMPLES {
                self.machine.complete_puzzle(scene);
                assert_eq!(self.machine.collect_key(scene, &mut self.graph), KeyPickup::Collected);
            }
        }
    }

    #[test]
    fn test_initial_state() {
        let f = Fixture::new();
        assert_eq!(f.machine.active(), SceneId::TempleOne);
        assert!(f.graph.is_visible(f.machine.root(SceneId::TempleOne)));
        for scene in [SceneId::TempleTwo, SceneId::TempleThree, SceneId::DoorScene] {
            assert!(!f.graph.is_visible(f.machine.root(scene)));
        }
        for scene in SceneId::TEMPLES {
            assert!(!f.machine.is_completed(scene));
            assert!(!f.graph.is_visible(f.machine.key_object(scene).unwrap()));
        }
        assert_eq!(f.machine.key_count(), 0);
        assert!(!f.machine.door_open());
    }

    #[test]
    fn test_switch_round_trip_restores_visibility() {
        let mut f = Fixture::new();
        f.machine.complete_puzzle(SceneId::TempleOne);
        f.machine.collect_key(SceneId::TempleOne, &mut f.graph);

        assert!(f.machine.switch_scene(SceneId::TempleTwo, &mut f.graph));
        assert!(f.machine.switch_scene(SceneId::DoorScene, &mut f.graph));
        assert!(f.machine.switch_scene(SceneId::TempleTwo, &mut f.graph));

        assert!(f.graph.is_visible(f.machine.root(SceneId::TempleTwo)));
        assert!(!f.graph.is_visible(f.machine.root(SceneId::DoorScene)));
        assert!(!f.graph.is_visible(f.machine.root(SceneId::TempleOne)));
        assert!(f.machine.is_completed(SceneId::TempleOne));
        assert!(f.machine.has_key(SceneId::TempleOne));
    }

    #[test]
    fn test_switch_to_active_is_noop() {
        let mut f = Fixture::new();
        assert!(!f.machine.switch_scene(SceneId::TempleOne, &mut f.graph));
        assert!(f.graph.is_visible(f.machine.root(SceneId::TempleOne)));
    }

    #[test]
    fn test_complete_puzzle_is_idempotent() {
        let mut f = Fixture::new();
        assert!(f.machine.complete_puzzle(SceneId::TempleTwo));
        assert!(!f.machine.complete_puzzle(SceneId::TempleTwo));
        assert!(!f.machine.complete_puzzle(SceneId::DoorScene));
        assert!(f.machine.is_completed(SceneId::TempleTwo));
    }

    #[test]
    fn test_collect_before_completion_is_noop() {
        let mut f = Fixture::new();
        for _ in 0..2 {
            assert_eq!(
                f.machine.collect_key(SceneId::TempleOne, &mut f.graph),
                KeyPickup::PuzzleIncomplete
            );
            assert_eq!(f.machine.key_count(), 0);
            assert!(!f.machine.has_key(SceneId::TempleOne));
        }
    }

    #[test]
    fn test_collect_after_completion_is_idempotent() {
        let mut f = Fixture::new();
        f.machine.complete_puzzle(SceneId::TempleOne);
        assert!(f.machine.reveal_key(SceneId::TempleOne, &mut f.graph));
        let key = f.machine.key_object(SceneId::TempleOne).unwrap();
        assert!(f.graph.is_visible(key));

        assert_eq!(f.machine.collect_key(SceneId::TempleOne, &mut f.graph), KeyPickup::Collected);
        assert!(!f.graph.is_visible(key));
        assert_eq!(
            f.machine.collect_key(SceneId::TempleOne, &mut f.graph),
            KeyPickup::AlreadyHeld
        );
        assert_eq!(f.machine.key_count(), 1);

        // A held key is never shown again.
        assert!(!f.machine.reveal_key(SceneId::TempleOne, &mut f.graph));
        assert_eq!(
            f.machine.collect_key(SceneId::DoorScene, &mut f.graph),
            KeyPickup::NotATemple
        );
    }

    #[test]
    fn test_door_stays_locked_without_all_keys() {
        let mut f = Fixture::new();
        assert_eq!(f.open_door(), DoorOutcome::Locked { missing: 3 });

        f.machine.complete_puzzle(SceneId::TempleOne);
        f.machine.collect_key(SceneId::TempleOne, &mut f.graph);
        assert_eq!(f.open_door(), DoorOutcome::Locked { missing: 2 });

        assert!(f.registry.contains(f.machine.door().body));
        assert_eq!(f.world.body_count(), 1);
        assert!(f.graph.is_visible(f.machine.door().object));
    }

    #[test]
    fn test_door_opens_exactly_once() {
        let mut f = Fixture::new();
        f.collect_all();
        assert!(f.machine.has_all_keys());

        assert_eq!(f.open_door(), DoorOutcome::Opened);
        assert_eq!(f.world.body_count(), 0);
        assert!(!f.registry.contains(f.machine.door().body));
        assert!(!f.graph.is_visible(f.machine.door().object));
        assert!(f.bridge.bindings().is_empty());

        assert_eq!(f.open_door(), DoorOutcome::AlreadyOpen);
        assert!(f.machine.door_open());
    }

    #[test]
    fn test_locked_message() {
        assert_eq!(DoorOutcome::locked_message(3), "Door locked: need 3 more key(s)");
    }
}
