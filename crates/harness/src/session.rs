use oracle::{BehaviorLog, Element, Frame, InvariantViolation, KeySet, Model, Rect};
use tracing::{debug, info};

use crate::input::InputQueue;
use crate::HarnessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Running,
    Done,
}

/// The game under test. One call advances the game by exactly one tick.
pub trait Simulation {
    fn update(&mut self, keys: &KeySet) -> TickStatus;
}

/// What the telemetry provider sees after a tick, in world coordinates.
/// Held keys are stamped by the session when the frame is logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    frame: Frame,
}

impl Capture {
    pub fn new(viewport: Rect) -> Self {
        Self {
            frame: Frame::new(KeySet::empty(), viewport),
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.push_element(element);
        self
    }

    pub fn push_element(&mut self, element: Element) {
        self.frame.push_element(element);
    }

    fn into_frame(self, keys: KeySet) -> Frame {
        Frame { keys, ..self.frame }
    }
}

pub trait Vision {
    type Error: std::error::Error + Send + Sync + 'static;

    fn capture(&mut self) -> Result<Capture, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickViolation {
    /// Game tick the violation was raised on. `violation.frame` is the
    /// index in the behavior log; the two differ once a capture has failed.
    pub tick: usize,
    pub violation: InvariantViolation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub status: TickStatus,
    pub violation: Option<InvariantViolation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub ticks: usize,
    pub status: TickStatus,
    pub violations: Vec<TickViolation>,
}

/// Lockstep driver: each tick collects input, updates the game once and
/// captures what is on screen. Control returns to the caller between ticks.
///
/// A failed capture still costs a game tick but logs no frame, so the
/// behavior log can fall behind the game tick count.
pub struct Session<S, V> {
    simulation: S,
    vision: V,
    input: InputQueue,
    keys: KeySet,
    behavior: BehaviorLog,
    status: TickStatus,
    game_ticks: usize,
}

impl<S: Simulation, V: Vision> Session<S, V> {
    pub fn new(simulation: S, vision: V, input: InputQueue) -> Self {
        Self {
            simulation,
            vision,
            input,
            keys: KeySet::empty(),
            behavior: BehaviorLog::new(),
            status: TickStatus::Running,
            game_ticks: 0,
        }
    }

    pub fn keys(&self) -> KeySet {
        self.keys
    }

    pub fn behavior(&self) -> &BehaviorLog {
        &self.behavior
    }

    pub fn status(&self) -> TickStatus {
        self.status
    }

    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    /// Game updates that ran, including those whose capture failed.
    pub fn game_ticks(&self) -> usize {
        self.game_ticks
    }

    /// Runs one tick. A tick on which the game reports `Done` captures
    /// nothing, and every later call is refused.
    pub fn advance(&mut self) -> Result<TickStatus, HarnessError> {
        if self.status == TickStatus::Done {
            return Err(HarnessError::SessionFinished {
                ticks: self.game_ticks,
            });
        }

        self.input.drain_into(&mut self.keys);
        let tick = self.game_ticks;

        if self.simulation.update(&self.keys) == TickStatus::Done {
            info!(tick, "simulation_done");
            self.status = TickStatus::Done;
            return Ok(TickStatus::Done);
        }
        self.game_ticks += 1;

        let capture = self
            .vision
            .capture()
            .map_err(|source| HarnessError::Capture {
                tick,
                source: Box::new(source),
            })?;
        self.behavior.push(capture.into_frame(self.keys));
        debug!(tick, frame = self.behavior.len() - 1, keys = %self.keys, "tick_advanced");
        Ok(TickStatus::Running)
    }

    pub fn verify<M: Model + ?Sized>(&self, model: &mut M) -> Result<(), InvariantViolation> {
        model.expect(&self.behavior)
    }

    pub fn step<M: Model + ?Sized>(&mut self, model: &mut M) -> Result<StepOutcome, HarnessError> {
        let status = self.advance()?;
        let violation = match status {
            TickStatus::Running => self.verify(model).err(),
            TickStatus::Done => None,
        };
        Ok(StepOutcome { status, violation })
    }

    /// Steps up to `ticks` times, keeping every violation instead of stopping
    /// at the first one.
    pub fn run_ticks<M: Model + ?Sized>(
        &mut self,
        ticks: usize,
        model: &mut M,
    ) -> Result<RunReport, HarnessError> {
        let mut violations = Vec::new();
        let mut ran = 0;
        while ran < ticks {
            let outcome = self.step(model)?;
            if outcome.status == TickStatus::Done {
                break;
            }
            if let Some(violation) = outcome.violation {
                let tick = self.game_ticks - 1;
                info!(tick, expectation = %violation.expectation, "violation_recorded");
                violations.push(TickViolation { tick, violation });
            }
            ran += 1;
        }
        info!(ticks = ran, violations = violations.len(), "run_finished");
        Ok(RunReport {
            ticks: ran,
            status: self.status,
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;
    use std::thread;

    use super::*;
    use oracle::{Expectation, GameModel, Key, PlayerModel, PlayerConfig};

    const VIEWPORT: Rect = Rect::new(0, 0, 800, 600);

    /// Walks right at `speed` while the right key is held, for `remaining` ticks.
    struct Walker {
        position: Rc<Cell<i32>>,
        speed: i32,
        remaining: usize,
    }

    impl Simulation for Walker {
        fn update(&mut self, keys: &KeySet) -> TickStatus {
            if self.remaining == 0 {
                return TickStatus::Done;
            }
            self.remaining -= 1;
            if keys.contains(Key::Right) {
                self.position.set(self.position.get() + self.speed);
            }
            TickStatus::Running
        }
    }

    struct Camera {
        position: Rc<Cell<i32>>,
        fail: bool,
    }

    impl Vision for Camera {
        type Error = io::Error;

        fn capture(&mut self) -> Result<Capture, io::Error> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "screen grab failed"));
            }
            Ok(Capture::new(VIEWPORT)
                .with_element(Element::new("collider", Rect::new(0, 500, 2000, 100), 100))
                .with_element(Element::new(
                    "player",
                    Rect::new(self.position.get(), 460, 30, 40),
                    1,
                )))
        }
    }

    fn session(speed: i32, remaining: usize) -> (Session<Walker, Camera>, crate::InputSender) {
        let position = Rc::new(Cell::new(100));
        let input = InputQueue::new();
        let sender = input.sender();
        let session = Session::new(
            Walker {
                position: position.clone(),
                speed,
                remaining,
            },
            Camera {
                position,
                fail: false,
            },
            input,
        );
        (session, sender)
    }

    #[test]
    fn advance_snapshots_keys_and_boxes() {
        let (mut session, sender) = session(5, 10);
        sender.press(Key::Right);
        assert_eq!(session.advance().expect("tick"), TickStatus::Running);
        sender.release(Key::Right);
        session.advance().expect("tick");

        let frames = session.behavior().frames();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].keys.contains(Key::Right));
        assert!(frames[1].keys.is_empty());
        assert_eq!(frames[0].first("player").map(|p| p.rect.x), Some(105));
        assert_eq!(frames[1].first("player").map(|p| p.rect.x), Some(105));
    }

    #[test]
    fn walking_right_passes_every_tick() {
        let (mut session, sender) = session(5, 10);
        sender.press(Key::Right);
        let mut model = GameModel::default();
        let report = session.run_ticks(6, &mut model).expect("run");
        assert_eq!(report.ticks, 6);
        assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn stalled_player_is_reported_without_aborting() {
        let (mut session, sender) = session(0, 10);
        sender.press(Key::Right);
        let mut model = PlayerModel::new(PlayerConfig::default());
        let report = session.run_ticks(4, &mut model).expect("run");
        assert_eq!(report.ticks, 4);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].tick, 1);
        assert_eq!(report.violations[0].violation.expectation, Expectation::MoveRight);
    }

    #[test]
    fn done_stops_the_run_and_refuses_more_ticks() {
        let (mut session, _sender) = session(5, 3);
        let mut model = GameModel::default();
        let report = session.run_ticks(10, &mut model).expect("run");
        assert_eq!(report.ticks, 3);
        assert_eq!(report.status, TickStatus::Done);
        assert_eq!(session.behavior().len(), 3);

        let error = session.advance().expect_err("finished");
        assert!(matches!(error, HarnessError::SessionFinished { ticks: 3 }));
    }

    #[test]
    fn capture_failure_is_a_harness_error() {
        let (mut session, _sender) = session(5, 3);
        session.vision.fail = true;
        let error = session.advance().expect_err("capture");
        assert!(matches!(error, HarnessError::Capture { tick: 0, .. }));
        assert!(session.behavior().is_empty());
    }

    #[test]
    fn failed_capture_still_counts_the_game_tick() {
        let (mut session, sender) = session(0, 10);
        sender.press(Key::Right);
        session.vision.fail = true;
        session.advance().expect_err("capture");
        assert_eq!(session.game_ticks(), 1);

        session.vision.fail = false;
        let mut model = PlayerModel::new(PlayerConfig::default());
        let report = session.run_ticks(2, &mut model).expect("run");
        assert_eq!(session.game_ticks(), 3);
        assert_eq!(session.behavior().len(), 2);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].tick, 2);
        assert_eq!(report.violations[0].violation.frame, 1);
    }

    #[test]
    fn capture_boxes_land_in_the_logged_frame() {
        let capture = Capture::new(VIEWPORT)
            .with_element(Element::new("pipe", Rect::new(300, 400, 60, 100), 4))
            .with_element(Element::new("pipe", Rect::new(500, 400, 60, 100), 5));
        let frame = capture.into_frame(KeySet::empty().with(Key::Jump));
        assert_eq!(frame.elements("pipe").len(), 2);
        assert!(frame.keys.contains(Key::Jump));
        assert_eq!(frame.viewport, VIEWPORT);
    }

    #[test]
    fn scripted_input_thread_drives_the_session() {
        let (mut session, sender) = session(5, 10);
        let script = thread::spawn(move || {
            sender.press(Key::Right);
        });
        script.join().expect("script thread");

        let mut model = GameModel::default();
        let outcome = session.step(&mut model).expect("step");
        assert_eq!(outcome.status, TickStatus::Running);
        assert!(outcome.violation.is_none());
        assert!(session.keys().contains(Key::Right));
    }
}
