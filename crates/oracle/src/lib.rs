//! Behavior models that watch a platformer's per-tick telemetry and report
//! when observed motion contradicts the game's rules.

pub mod collision;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod models;
pub mod overlay;

pub use collision::{
    has_bottom_collision, has_left_collision, has_right_collision, has_top_collision, Classes,
};
pub use config::{BlockConfig, ModelConfig, PlayerConfig};
pub use error::{EntityRef, Expectation, InvariantViolation};
pub use frame::{BehaviorLog, Element, ElementId, Frame, Key, KeySet};
pub use geometry::{bottom_touch, boxes_equal, left_touch, right_touch, top_touch, Rect};
pub use models::{
    dump_trace, BlockModel, BlockState, BumpPhase, Direction, GameModel, Model, PendingBump,
    PlayerModel, PlayerState,
};
pub use overlay::{
    noop_overlay, Color, HighlightRequest, ImageOverlay, NoopOverlay, Overlay, OverlayHandle,
    OverlayLog,
};
