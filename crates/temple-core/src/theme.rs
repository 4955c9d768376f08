//! Cosmetic color themes.
//!
//! Objects register once with a role. Switching the theme recolors every
//! registered object; physics and puzzle state are never touched.

use serde::{Deserialize, Serialize};

use crate::scene_graph::{Color, ObjectId, SceneGraph};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Day,
    Dusk,
    Night,
}

/// What an object is, as far as coloring goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeRole {
    Ground,
    Player,
    Puzzle,
    Key,
    Door,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Day, Theme::Dusk, Theme::Night];

    pub fn background(self) -> Color {
        match self {
            Theme::Day => Color::hex(0x20_2020),
            Theme::Dusk => Color::hex(0x3a_2340),
            Theme::Night => Color::hex(0x05_0814),
        }
    }

    pub fn color(self, role: ThemeRole) -> Color {
        match (self, role) {
            (Theme::Day, ThemeRole::Ground) => Color::hex(0x00_ff88),
            (Theme::Day, ThemeRole::Player) => Color::hex(0x00_ff00),
            (Theme::Day, ThemeRole::Puzzle) => Color::hex(0xff_5533),
            (Theme::Day, ThemeRole::Key) => Color::hex(0xff_d700),
            (Theme::Day, ThemeRole::Door) => Color::hex(0x8b_4513),

            (Theme::Dusk, ThemeRole::Ground) => Color::hex(0x6b_8f5e),
            (Theme::Dusk, ThemeRole::Player) => Color::hex(0xff_b347),
            (Theme::Dusk, ThemeRole::Puzzle) => Color::hex(0xc0_3a5a),
            (Theme::Dusk, ThemeRole::Key) => Color::hex(0xff_e08a),
            (Theme::Dusk, ThemeRole::Door) => Color::hex(0x5c_3a21),

            (Theme::Night, ThemeRole::Ground) => Color::hex(0x1c_3b4a),
            (Theme::Night, ThemeRole::Player) => Color::hex(0x7f_dbff),
            (Theme::Night, ThemeRole::Puzzle) => Color::hex(0xb1_0dc9),
            (Theme::Night, ThemeRole::Key) => Color::hex(0xf0_f0ff),
            (Theme::Night, ThemeRole::Door) => Color::hex(0x2b_1d14),
        }
    }
}

/// Objects that follow the current theme.
#[derive(Debug, Default)]
pub struct ThemeRegistry {
    theme: Theme,
    members: Vec<(ObjectId, ThemeRole)>,
}

impl ThemeRegistry {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            members: Vec::new(),
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Registers `object` and paints it with the current theme right away.
    pub fn register(&mut self, graph: &mut SceneGraph, object: ObjectId, role: ThemeRole) {
        graph.set_color(object, self.theme.color(role));
        self.members.retain(|(id, _)| *id != object);
        self.members.push((object, role));
    }

    /// Switches theme, repaints the background and recolors every registered
    /// object. Returns how many objects were recolored.
    pub fn set_theme(&mut self, theme: Theme, graph: &mut SceneGraph) -> usize {
        self.theme = theme;
        graph.set_background(theme.background());
        let recolored = self
            .members
            .iter()
            .filter(|(object, role)| graph.set_color(*object, theme.color(*role)))
            .count();
        tracing::info!(?theme, recolored, "theme changed");
        recolored
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    #[test]
    fn test_register_applies_current_theme() {
        let mut graph = SceneGraph::new();
        let floor = graph.spawn("floor", None, Pose::IDENTITY);
        let mut themes = ThemeRegistry::new(Theme::Night);

        themes.register(&mut graph, floor, ThemeRole::Ground);
        assert_eq!(graph.color(floor), Some(Theme::Night.color(ThemeRole::Ground)));
    }

    #[test]
    fn test_set_theme_broadcasts() {
        let mut graph = SceneGraph::new();
        let floor = graph.spawn("floor", None, Pose::IDENTITY);
        let player = graph.spawn("player", None, Pose::IDENTITY);
        let mut themes = ThemeRegistry::new(Theme::Day);
        themes.register(&mut graph, floor, ThemeRole::Ground);
        themes.register(&mut graph, player, ThemeRole::Player);

        assert_eq!(themes.set_theme(Theme::Dusk, &mut graph), 2);
        assert_eq!(graph.background(), Theme::Dusk.background());
        assert_eq!(graph.color(floor), Some(Theme::Dusk.color(ThemeRole::Ground)));
        assert_eq!(graph.color(player), Some(Theme::Dusk.color(ThemeRole::Player)));
        assert_eq!(themes.theme(), Theme::Dusk);
    }

    #[test]
    fn test_reregister_replaces_role() {
        let mut graph = SceneGraph::new();
        let object = graph.spawn("thing", None, Pose::IDENTITY);
        let mut themes = ThemeRegistry::new(Theme::Day);
        themes.register(&mut graph, object, ThemeRole::Key);
        themes.register(&mut graph, object, ThemeRole::Door);

        assert_eq!(themes.len(), 1);
        themes.set_theme(Theme::Day, &mut graph);
        assert_eq!(graph.color(object), Some(Color::hex(0x8b_4513)));
    }

    #[test]
    fn test_day_matches_classic_palette() {
        assert_eq!(Theme::Day.background(), Color::hex(0x20_2020));
        assert_eq!(Theme::Day.color(ThemeRole::Player), Color::rgb(0, 255, 0));
    }
}
