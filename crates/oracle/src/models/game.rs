use crate::config::ModelConfig;
use crate::error::InvariantViolation;
use crate::frame::BehaviorLog;
use crate::overlay::OverlayHandle;

use super::{BlockModel, Model, PlayerModel};

/// Runs every entity model against the same log each tick.
pub struct GameModel {
    block: BlockModel,
    player: PlayerModel,
}

impl GameModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            block: BlockModel::new(config.block),
            player: PlayerModel::new(config.player),
        }
    }

    pub fn with_overlay(self, overlay: OverlayHandle) -> Self {
        Self {
            block: self.block.with_overlay(overlay.clone()),
            player: self.player.with_overlay(overlay),
        }
    }

    pub fn block(&self) -> &BlockModel {
        &self.block
    }

    pub fn player(&self) -> &PlayerModel {
        &self.player
    }

    /// Every violation raised this tick, block model first.
    pub fn expect_all(&mut self, behavior: &BehaviorLog) -> Vec<InvariantViolation> {
        let block = self.block.expect(behavior);
        let player = self.player.expect(behavior);
        [block, player].into_iter().filter_map(Result::err).collect()
    }
}

impl Default for GameModel {
    fn default() -> Self {
        Self::new(ModelConfig::default())
    }
}

impl Model for GameModel {
    fn expect(&mut self, behavior: &BehaviorLog) -> Result<(), InvariantViolation> {
        let block = self.block.expect(behavior);
        let player = self.player.expect(behavior);
        block.and(player)
    }
}
