//! Proximity scan for "what can I interact with right now".

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene::SceneId;

/// Interaction radius used when the scenario does not set one.
pub const DEFAULT_INTERACTION_RADIUS: f32 = 3.0;

/// Something the player can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interactable {
    Key(SceneId),
    PuzzleObject,
    Door,
}

/// Answers where an interactable is, if it can be used at all right now.
///
/// Returning `None` means the target is inactive (hidden, already collected,
/// already solved or already open).
pub trait InteractionProbe {
    fn locate(&self, target: Interactable) -> Option<Vec3>;
}

/// Fixed per-scene candidate lists plus the interaction radius.
#[derive(Debug, Clone)]
pub struct InteractionDetector {
    radius: f32,
    lists: [Vec<Interactable>; 4],
}

impl InteractionDetector {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            lists: Default::default(),
        }
    }

    /// Replaces the candidate list for `scene`. Order matters: the first
    /// active candidate in range wins.
    #[must_use]
    pub fn with_list(mut self, scene: SceneId, list: Vec<Interactable>) -> Self {
        self.lists[scene.index()] = list;
        self
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn candidates(&self, scene: SceneId) -> &[Interactable] {
        &self.lists[scene.index()]
    }

    /// Returns the first active candidate of `scene` within the radius of
    /// `player`.
    pub fn scan(
        &self,
        scene: SceneId,
        player: Vec3,
        probe: &impl InteractionProbe,
    ) -> Option<Interactable> {
        self.candidates(scene).iter().copied().find(|target| {
            probe
                .locate(*target)
                .is_some_and(|position| position.distance(player) <= self.radius)
        })
    }
}
