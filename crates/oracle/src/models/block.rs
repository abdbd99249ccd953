use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::BlockConfig;
use crate::error::{Expectation, InvariantViolation};
use crate::frame::{BehaviorLog, Element, ElementId, Frame};
use crate::geometry::{bottom_touch, boxes_equal, Rect};
use crate::overlay::{noop_overlay, OverlayHandle};

use super::Model;

const HIGHLIGHT_THICKNESS: u32 = 5;

/// A bump that has not settled yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingBump {
    /// Absolute log index of the contact frame.
    pub frame: usize,
    /// Where the block must come back to.
    pub rest: Rect,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BumpPhase {
    #[default]
    Untouched,
    Pending(PendingBump),
    /// Back at rest after a bump. The stay rule applies again.
    Settled,
    /// Missed the return deadline. Reported once, never re-checked.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockState {
    pub phase: BumpPhase,
}

impl BlockState {
    pub fn bumped(&self) -> bool {
        self.phase == BumpPhase::Settled
    }
}

/// Solid blocks stay put unless the player bumps them from below, in which
/// case they must settle back where they were.
///
/// Per-block state is created the first time a block id is seen and kept for
/// the rest of the session.
pub struct BlockModel {
    config: BlockConfig,
    overlay: OverlayHandle,
    states: HashMap<ElementId, BlockState>,
}

impl BlockModel {
    pub fn new(config: BlockConfig) -> Self {
        Self {
            config,
            overlay: noop_overlay(),
            states: HashMap::new(),
        }
    }

    pub fn with_overlay(mut self, overlay: OverlayHandle) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    pub fn state(&self, id: ElementId) -> Option<BlockState> {
        self.states.get(&id).copied()
    }

    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    fn highlight(&self, boxes: &[Rect], viewport: &Rect) {
        let adjusted = boxes
            .iter()
            .map(|rect| rect.adjust_to_viewport(viewport))
            .collect::<Vec<_>>();
        self.overlay
            .highlight(&adjusted, self.config.color, HIGHLIGHT_THICKNESS);
    }

    /// `block` is the block as seen one frame ago; it must be unchanged now.
    pub fn expect_stay(
        &self,
        block: &Element,
        behavior: &BehaviorLog,
    ) -> Result<(), InvariantViolation> {
        if behavior.len() < 2 {
            return Ok(());
        }
        let Some(now) = behavior.latest() else {
            return Ok(());
        };
        if !block.rect.in_view(&now.viewport) {
            return Ok(());
        }
        let Some(current) = now.find(&self.config.class, block.id) else {
            debug!(block = %block, "block_not_visible");
            return Ok(());
        };
        if boxes_equal(&current.rect, &block.rect, self.config.tolerance) {
            return Ok(());
        }

        self.highlight(&[block.rect], &now.viewport);
        Err(InvariantViolation::new(
            Expectation::BlockStay,
            behavior.len() - 1,
            format!("block {block} unexpectedly moved to {current}"),
        )
        .with_entity(block)
        .with_entity(current))
    }

    /// Follows `block` through its bump lifecycle. An untouched block is
    /// checked for a head-bump in the trailing window; a pending bump must
    /// settle back at rest within `return_timeout` frames of the contact.
    /// Returns `true` while a bump is pending or when it settled during this
    /// call, in which case the stay rule does not apply this tick.
    pub fn expect_bump(
        &mut self,
        block: &Element,
        behavior: &BehaviorLog,
    ) -> Result<bool, InvariantViolation> {
        let phase = self.states.entry(block.id).or_default().phase;
        let pending = match phase {
            BumpPhase::Settled | BumpPhase::Failed => return Ok(false),
            BumpPhase::Pending(pending) => pending,
            BumpPhase::Untouched => match self.find_bump(block, behavior) {
                Some(pending) => {
                    self.set_phase(block.id, BumpPhase::Pending(pending));
                    pending
                }
                None => return Ok(false),
            },
        };
        self.follow_return(block, pending, behavior)
    }

    fn set_phase(&mut self, id: ElementId, phase: BumpPhase) {
        self.states.entry(id).or_default().phase = phase;
    }

    /// Earliest frame in the window where the player touches the underside
    /// of `block` and no competitor is closer.
    fn find_bump(&self, block: &Element, behavior: &BehaviorLog) -> Option<PendingBump> {
        let frames = behavior.frames();
        let start = frames.len().saturating_sub(self.config.bump_frames).max(1);

        for index in start..frames.len() {
            let frame = &frames[index];
            if !block.rect.in_view(&frame.viewport) {
                continue;
            }
            let Some(this_block) = frame.find(&self.config.class, block.id) else {
                continue;
            };
            let Some(player) = frame.first(&self.config.player_class) else {
                continue;
            };
            if !bottom_touch(&this_block.rect, &player.rect) {
                continue;
            }
            if let Some(other) = self.closer_competitor(frame, this_block, player) {
                debug!(block = %this_block, other = %other, "bump_credited_elsewhere");
                continue;
            }

            let rest = frames[index - 1]
                .find(&self.config.class, block.id)
                .map(|previous| previous.rect)
                .unwrap_or(this_block.rect);
            self.highlight(&[this_block.rect, player.rect], &frame.viewport);
            debug!(block = %this_block, frame = index, "block_hit");
            return Some(PendingBump { frame: index, rest });
        }
        None
    }

    /// Frames where the block is not visible are skipped. The player plays
    /// no part in the return.
    fn follow_return(
        &mut self,
        block: &Element,
        pending: PendingBump,
        behavior: &BehaviorLog,
    ) -> Result<bool, InvariantViolation> {
        for (index, frame) in behavior
            .frames()
            .iter()
            .enumerate()
            .skip(pending.frame + 1)
        {
            let Some(this_block) = frame.find(&self.config.class, block.id) else {
                continue;
            };
            let elapsed = index - pending.frame;

            if boxes_equal(&this_block.rect, &pending.rest, self.config.tolerance) {
                self.set_phase(block.id, BumpPhase::Settled);
                info!(block = %block, frames = elapsed, "block_bumped");
                return Ok(true);
            }
            if elapsed >= self.config.return_timeout {
                self.set_phase(block.id, BumpPhase::Failed);
                warn!(block = %block, frames = elapsed, "block_not_returned");
                let mut violation = InvariantViolation::new(
                    Expectation::BlockReturn,
                    index,
                    format!("block {block} never returned to its original position"),
                )
                .with_entity(this_block);
                if let Some(player) = frame.first(&self.config.player_class) {
                    violation = violation.with_entity(player);
                }
                return Err(violation);
            }
        }
        Ok(true)
    }

    /// Another block or competing element the player bumped in the same
    /// frame that sits closer to the player's center than `block`.
    fn closer_competitor<'f>(
        &self,
        frame: &'f Frame,
        block: &Element,
        player: &Element,
    ) -> Option<&'f Element> {
        let distance = |element: &Element| (player.rect.center_x() - element.rect.center_x()).abs();
        let block_distance = distance(block);
        let same_class = frame
            .elements(&self.config.class)
            .iter()
            .filter(|other| other.id != block.id);
        let competing = self
            .config
            .competing_classes
            .iter()
            .flat_map(|class| frame.elements(class).iter());

        same_class
            .chain(competing)
            .filter(|other| bottom_touch(&other.rect, &player.rect))
            .find(|other| distance(*other) < block_distance)
    }
}

impl Model for BlockModel {
    fn expect(&mut self, behavior: &BehaviorLog) -> Result<(), InvariantViolation> {
        let Some(previous) = behavior.previous() else {
            return Ok(());
        };

        for block in previous.elements(&self.config.class) {
            self.states.entry(block.id).or_default();
            if !self.expect_bump(block, behavior)? {
                self.expect_stay(block, behavior)?;
            }
        }
        Ok(())
    }
}
