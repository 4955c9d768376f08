//! Win/lose trigger zones checked against the puzzle ball.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Trigger radius used when the scenario does not set one.
pub const DEFAULT_TRIGGER_RADIUS: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Win,
    Lose,
}

/// Static sphere that fires when the ball's center enters it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerZone {
    pub position: [f32; 3],
    #[serde(default = "default_radius")]
    pub radius: f32,
}

fn default_radius() -> f32 {
    DEFAULT_TRIGGER_RADIUS
}

impl TriggerZone {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position: position.to_array(),
            radius,
        }
    }

    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.distance(self.center()) < self.radius
    }
}

/// Tracks one puzzle attempt. Once either zone fires, nothing else fires until
/// `rearm`.
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    win: TriggerZone,
    lose: TriggerZone,
    won: bool,
    lost: bool,
}

impl TriggerDetector {
    pub fn new(win: TriggerZone, lose: TriggerZone) -> Self {
        Self {
            win,
            lose,
            won: false,
            lost: false,
        }
    }

    /// Checks the ball against both zones, win first. Returns the zone that
    /// fired on this call, if any.
    pub fn check(&mut self, ball: Vec3) -> Option<TriggerKind> {
        if self.is_resolved() {
            return None;
        }
        if self.win.contains(ball) {
            self.won = true;
            return Some(TriggerKind::Win);
        }
        if self.lose.contains(ball) {
            self.lost = true;
            return Some(TriggerKind::Lose);
        }
        None
    }

    /// Clears both flags so the next attempt can fire again.
    pub fn rearm(&mut self) {
        self.won = false;
        self.lost = false;
    }

    pub fn is_resolved(&self) -> bool {
        self.won || self.lost
    }

    pub fn won(&self) -> bool {
        self.won
    }

    pub fn lost(&self) -> bool {
        self.lost
    }

    pub fn zone(&self, kind: TriggerKind) -> &TriggerZone {
        match kind {
            TriggerKind::Win => &self.win,
            TriggerKind::Lose => &self.lose,
        }
    }
}
