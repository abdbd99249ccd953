use serde::{Deserialize, Serialize};

use crate::frame::Key;
use crate::overlay::Color;

pub const DEFAULT_BUMP_FRAMES: usize = 15;
pub const DEFAULT_RETURN_TIMEOUT: usize = 11;
pub const DEFAULT_TRACE_FRAMES: usize = 10;

fn class_names(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    pub class: String,
    pub player_class: String,
    /// Classes that compete with a block for the same head-bump.
    pub competing_classes: Vec<String>,
    /// Trailing window scanned for a bump.
    pub bump_frames: usize,
    /// Frames after the bump within which the block must be back at rest.
    pub return_timeout: usize,
    pub tolerance: i32,
    pub color: Color,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            class: "box".to_string(),
            player_class: "player".to_string(),
            competing_classes: class_names(&["brick"]),
            bump_frames: DEFAULT_BUMP_FRAMES,
            return_timeout: DEFAULT_RETURN_TIMEOUT,
            tolerance: 0,
            color: Color::GREEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub class: String,
    /// Classes the player can stand on.
    pub ground_classes: Vec<String>,
    /// Classes that kill the player on side contact.
    pub hostile_classes: Vec<String>,
    pub right_key: Key,
    pub left_key: Key,
    pub jump_key: Key,
    pub trace_frames: usize,
    pub color: Color,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            class: "player".to_string(),
            ground_classes: class_names(&["box", "brick", "collider", "pipe"]),
            hostile_classes: class_names(&["goomba", "koopa"]),
            right_key: Key::Right,
            left_key: Key::Left,
            jump_key: Key::Jump,
            trace_frames: DEFAULT_TRACE_FRAMES,
            color: Color::RED,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub block: BlockConfig,
    pub player: PlayerConfig,
}
