//! Retained store of render-visible objects.
//!
//! The renderer reads this once per frame after pose sync. Nothing in here
//! talks to the GPU; an object is just a name, a parent, a pose, a visibility
//! flag and a color.

use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Identifier of a visible object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// RGBA color representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Builds a color from a `0xRRGGBB` literal.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn hex(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// A render-owned object whose transform may be driven by a physics body.
#[derive(Debug, Clone)]
pub struct VisibleObject {
    pub name: String,
    pub parent: Option<ObjectId>,
    pub pose: Pose,
    pub visible: bool,
    pub color: Color,
}

/// Flat arena of visible objects.
#[derive(Debug, Default)]
pub struct SceneGraph {
    objects: Vec<VisibleObject>,
    background: Color,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a visible object and returns its id.
    ///
    /// A parent must already exist. An unknown parent is dropped and the
    /// object becomes a root, so parent chains always point backwards.
    pub fn spawn(&mut self, name: impl Into<String>, parent: Option<ObjectId>, pose: Pose) -> ObjectId {
        #[allow(clippy::cast_possible_truncation)]
        let id = ObjectId(self.objects.len() as u32);
        let name = name.into();
        let parent = parent.filter(|p| {
            let known = p.0 < id.0;
            if !known {
                tracing::warn!(%name, parent = p.0, "unknown parent, spawning as root");
            }
            known
        });
        self.objects.push(VisibleObject {
            name,
            parent,
            pose,
            visible: true,
            color: Color::WHITE,
        });
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&VisibleObject> {
        self.objects.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut VisibleObject> {
        self.objects.get_mut(id.0 as usize)
    }

    /// Finds the first object with the given name.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .position(|o| o.name == name)
            .and_then(|i| u32::try_from(i).ok())
            .map(ObjectId)
    }

    pub fn pose(&self, id: ObjectId) -> Option<Pose> {
        self.get(id).map(|o| o.pose)
    }

    pub fn set_pose(&mut self, id: ObjectId, pose: Pose) -> bool {
        match self.get_mut(id) {
            Some(object) => {
                object.pose = pose;
                true
            }
            None => false,
        }
    }

    /// The object's own visibility flag, ignoring its ancestors.
    pub fn is_visible(&self, id: ObjectId) -> bool {
        self.get(id).is_some_and(|o| o.visible)
    }

    /// Whether the object would actually be drawn: it and every ancestor are
    /// visible.
    pub fn is_shown(&self, id: ObjectId) -> bool {
        let mut current = Some(id);
        // At most one hop per object.
        for _ in 0..=self.objects.len() {
            let Some(id) = current else {
                return true;
            };
            let Some(object) = self.get(id) else {
                return false;
            };
            if !object.visible {
                return false;
            }
            current = object.parent;
        }
        false
    }

    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> bool {
        match self.get_mut(id) {
            Some(object) => {
                object.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn color(&self, id: ObjectId) -> Option<Color> {
        self.get(id).map(|o| o.color)
    }

    pub fn set_color(&mut self, id: ObjectId, color: Color) -> bool {
        match self.get_mut(id) {
            Some(object) => {
                object.color = color;
                true
            }
            None => false,
        }
    }

    /// Direct children of an object.
    pub fn children(&self, parent: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.iter()
            .filter(move |(_, o)| o.parent == Some(parent))
            .map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &VisibleObject)> {
        self.objects.iter().enumerate().filter_map(|(i, o)| {
            u32::try_from(i).ok().map(|i| (ObjectId(i), o))
        })
    }

    /// Clear color behind every object.
    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
