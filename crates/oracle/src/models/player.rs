use tracing::{debug, info, warn};

use crate::collision::{
    has_bottom_collision, has_left_collision, has_right_collision, has_top_collision, Classes,
};
use crate::config::PlayerConfig;
use crate::error::{Expectation, InvariantViolation};
use crate::frame::{BehaviorLog, Element, Frame};
use crate::geometry::{left_touch, right_touch};
use crate::overlay::{noop_overlay, OverlayHandle};

use super::{dump_trace, Model};

const HIGHLIGHT_THICKNESS: u32 = 5;

/// Session state of the single player entity.
///
/// `small`, `big`, `fire` and `invincible` are tracked for completeness; no
/// rule reads or enforces them yet.
// TODO: size and power-up transitions once telemetry reports the player's form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub died: bool,
    pub small: bool,
    pub big: bool,
    pub fire: bool,
    pub invincible: bool,
}

/// Horizontal motion between the frames two and three ticks back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Standing,
    Left,
    Right,
    /// Fewer than three frames recorded.
    Unknown,
}

pub struct PlayerModel {
    config: PlayerConfig,
    overlay: OverlayHandle,
    state: PlayerState,
}

impl PlayerModel {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            overlay: noop_overlay(),
            state: PlayerState {
                small: true,
                ..PlayerState::default()
            },
        }
    }

    pub fn with_overlay(mut self, overlay: OverlayHandle) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    fn player_in<'f>(&self, frame: &'f Frame) -> Option<&'f Element> {
        frame.first(&self.config.class)
    }

    /// The player `offset` ticks back; `None` when that frame is missing or
    /// the player is not visible in it.
    fn player_back<'b>(&self, behavior: &'b BehaviorLog, offset: usize) -> Option<&'b Element> {
        behavior
            .back(offset)
            .and_then(|frame| self.player_in(frame))
    }

    fn grounded(&self, frame: &Frame, player: &Element) -> bool {
        has_bottom_collision(
            frame,
            player,
            Classes::Only(&self.config.ground_classes),
            self.overlay.as_ref(),
        )
    }

    fn violation(
        &self,
        expectation: Expectation,
        behavior: &BehaviorLog,
        message: &str,
        player: &Element,
    ) -> InvariantViolation {
        InvariantViolation::new(expectation, behavior.len().saturating_sub(1), message)
            .with_entity(player)
    }

    /// Direction of travel one tick before the latest move. Looking one frame
    /// back keeps a collision-truncated latest step from skewing it. `None`
    /// means the player was not visible in one of the frames.
    pub fn direction(&self, behavior: &BehaviorLog) -> Option<Direction> {
        if behavior.len() < 3 {
            return Some(Direction::Unknown);
        }
        let two_back = self.player_back(behavior, 3)?;
        let one_back = self.player_back(behavior, 2)?;
        let direction = match two_back.rect.x.cmp(&one_back.rect.x) {
            std::cmp::Ordering::Equal => Direction::Standing,
            std::cmp::Ordering::Greater => Direction::Left,
            std::cmp::Ordering::Less => Direction::Right,
        };
        Some(direction)
    }

    pub fn expect_move_right(&self, behavior: &BehaviorLog) -> Result<(), InvariantViolation> {
        if self.state.died {
            return Ok(());
        }
        let Some(now) = behavior.latest() else {
            return Ok(());
        };
        let (Some(before), Some(player)) =
            (self.player_back(behavior, 2), self.player_in(now))
        else {
            return Ok(());
        };
        let Some(direction) = self.direction(behavior) else {
            return Ok(());
        };

        if has_right_collision(now, player, Classes::All, self.overlay.as_ref()) {
            debug!("player has right collision");
            return Ok(());
        }
        if !now.keys.contains(self.config.right_key) {
            return Ok(());
        }
        if matches!(direction, Direction::Standing | Direction::Left) {
            return Ok(());
        }

        debug!(before = before.rect.x, now = player.rect.x, "player should move right");
        if before.rect.x < player.rect.x {
            Ok(())
        } else {
            Err(self.violation(
                Expectation::MoveRight,
                behavior,
                "player did not move right",
                player,
            ))
        }
    }

    /// Mirror of [`PlayerModel::expect_move_right`]; the world's left edge counts
    /// as a collision.
    pub fn expect_move_left(&self, behavior: &BehaviorLog) -> Result<(), InvariantViolation> {
        if self.state.died {
            return Ok(());
        }
        let Some(now) = behavior.latest() else {
            return Ok(());
        };
        let (Some(before), Some(player)) =
            (self.player_back(behavior, 2), self.player_in(now))
        else {
            return Ok(());
        };
        let Some(direction) = self.direction(behavior) else {
            return Ok(());
        };

        if has_left_collision(now, player, Classes::All, self.overlay.as_ref()) {
            debug!("player has left collision");
            return Ok(());
        }
        if !now.keys.contains(self.config.left_key) {
            return Ok(());
        }
        if matches!(direction, Direction::Standing | Direction::Right) {
            return Ok(());
        }

        debug!(before = before.rect.x, now = player.rect.x, "player should move left");
        if before.rect.x > player.rect.x {
            Ok(())
        } else {
            Err(self.violation(
                Expectation::MoveLeft,
                behavior,
                "player did not move left",
                player,
            ))
        }
    }

    /// Take-off after standing for two frames with a fresh jump press, then a
    /// steady ascent until the top of the arc or a head collision.
    pub fn expect_jump(&self, behavior: &BehaviorLog) -> Result<(), InvariantViolation> {
        if self.state.died {
            return Ok(());
        }
        let (Some(right_before), Some(before), Some(now)) =
            (behavior.back(3), behavior.back(2), behavior.back(1))
        else {
            return Ok(());
        };
        let (Some(player_right_before), Some(player_before), Some(player)) = (
            self.player_in(right_before),
            self.player_in(before),
            self.player_in(now),
        ) else {
            return Ok(());
        };

        let grounded_right_before = self.grounded(right_before, player_right_before);
        let grounded_before = self.grounded(before, player_before);
        let jump_held_before = before.keys.contains(self.config.jump_key);
        let jump_held_now = now.keys.contains(self.config.jump_key);

        if grounded_right_before && grounded_before && !jump_held_before && jump_held_now {
            debug!(before = player_before.rect.y, now = player.rect.y, "player should jump");
            if player.rect.y >= player_before.rect.y {
                return Err(self.violation(
                    Expectation::Jump,
                    behavior,
                    "player did not jump",
                    player,
                ));
            }
            return Ok(());
        }

        if player_before.rect.y < player_right_before.rect.y {
            if grounded_before {
                return Err(self.violation(
                    Expectation::Ascent,
                    behavior,
                    "player rose while standing on the ground",
                    player_before,
                ));
            }
            let head_blocked =
                has_top_collision(before, player_before, Classes::All, self.overlay.as_ref());
            if !head_blocked && player.rect.y > player_before.rect.y {
                return Err(self.violation(
                    Expectation::Ascent,
                    behavior,
                    "player started falling before reaching the top of the jump",
                    player,
                ));
            }
        }
        Ok(())
    }

    /// Gravity: once airborne and not rising the player must keep descending,
    /// except at the apex while the jump key is still held.
    pub fn expect_fall(&self, behavior: &BehaviorLog) -> Result<(), InvariantViolation> {
        if self.state.died {
            return Ok(());
        }
        let Some(before) = behavior.back(2) else {
            return Ok(());
        };
        let (Some(p3), Some(p2), Some(p1), Some(p0)) = (
            self.player_back(behavior, 4),
            self.player_back(behavior, 3),
            self.player_back(behavior, 2),
            self.player_back(behavior, 1),
        ) else {
            return Ok(());
        };

        if self.grounded(before, p1) {
            return Ok(());
        }

        let was_falling_or_standing = p2.rect.y <= p1.rect.y;
        let reached_top = p3.rect.y >= p2.rect.y && p2.rect.y == p1.rect.y;

        if reached_top && before.keys.contains(self.config.jump_key) {
            debug!(before = p1.rect.y, now = p0.rect.y, "player should stay in the air or start falling");
            if p0.rect.y < p1.rect.y {
                return Err(self.violation(
                    Expectation::Hover,
                    behavior,
                    "player should stay in the air or start falling",
                    p0,
                ));
            }
        } else if was_falling_or_standing {
            debug!(before = p1.rect.y, now = p0.rect.y, "player should fall");
            if p0.rect.y <= p1.rect.y {
                return Err(self.violation(Expectation::Fall, behavior, "player did not fall", p0));
            }
        }
        Ok(())
    }

    /// Marks the player dead on side contact with a hostile or when it drops
    /// past the bottom of the viewport. Death is permanent for the session.
    pub fn expect_die(&mut self, behavior: &BehaviorLog) -> bool {
        if self.state.died {
            return true;
        }
        let Some(now) = behavior.latest() else {
            return false;
        };
        let Some(player) = self.player_in(now) else {
            return false;
        };

        let hostile = self
            .config
            .hostile_classes
            .iter()
            .flat_map(|class| now.elements(class).iter())
            .find(|other| {
                right_touch(&player.rect, &other.rect) || left_touch(&player.rect, &other.rect)
            });

        if let Some(enemy) = hostile {
            self.overlay.highlight(
                &[
                    player.rect.adjust_to_viewport(&now.viewport),
                    enemy.rect.adjust_to_viewport(&now.viewport),
                ],
                self.config.color,
                HIGHLIGHT_THICKNESS,
            );
            info!(player = %player, enemy = %enemy, frame = behavior.len() - 1, "player_died");
            self.state.died = true;
        } else if player.rect.bottom() >= now.viewport.bottom() {
            info!(player = %player, frame = behavior.len() - 1, cause = "fell", "player_died");
            self.state.died = true;
        }
        self.state.died
    }

    fn expect_locomotion(&self, behavior: &BehaviorLog) -> Result<(), InvariantViolation> {
        self.expect_move_right(behavior)?;
        self.expect_move_left(behavior)?;
        self.expect_jump(behavior)?;
        self.expect_fall(behavior)?;
        Ok(())
    }
}

impl Model for PlayerModel {
    fn expect(&mut self, behavior: &BehaviorLog) -> Result<(), InvariantViolation> {
        if behavior.len() < 2 {
            return Ok(());
        }
        if self.expect_die(behavior) {
            return Ok(());
        }

        let result = self.expect_locomotion(behavior);
        if let Err(violation) = &result {
            warn!(error = %violation, "invariant_violated");
            dump_trace(&self.config.class, behavior, self.config.trace_frames);
        }
        result
    }
}
