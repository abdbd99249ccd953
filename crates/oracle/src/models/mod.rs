mod block;
mod game;
mod player;

use tracing::debug;

use crate::error::InvariantViolation;
use crate::frame::BehaviorLog;

pub use block::{BlockModel, BlockState, BumpPhase, PendingBump};
pub use game::GameModel;
pub use player::{Direction, PlayerModel, PlayerState};

/// A behavior model checked once per tick against the whole behavior log.
pub trait Model {
    fn expect(&mut self, behavior: &BehaviorLog) -> Result<(), InvariantViolation>;
}

/// Logs the last `frames` ticks: keys held and the position of the first
/// element of `class`, then the boxes of the latest frame.
pub fn dump_trace(class: &str, behavior: &BehaviorLog, frames: usize) {
    let start = behavior.len().saturating_sub(frames);
    for (offset, frame) in behavior.tail(frames).iter().enumerate() {
        let index = start + offset;
        match frame.first(class) {
            Some(element) => debug!(
                index,
                keys = %frame.keys,
                class,
                x = element.rect.x,
                y = element.rect.y,
                "trace"
            ),
            None => debug!(index, keys = %frame.keys, class, "trace_missing"),
        }
    }
    if let Some(latest) = behavior.latest() {
        match serde_json::to_string(&latest.boxes) {
            Ok(boxes) => debug!(%boxes, "trace_latest_boxes"),
            Err(error) => debug!(error = %error, "trace_latest_boxes_unencodable"),
        }
    }
}
