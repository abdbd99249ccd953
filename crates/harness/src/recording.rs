use std::fs;
use std::path::Path;

use oracle::{BehaviorLog, Frame, Model};
use tracing::{info, warn};

use crate::atomic_io::write_text_atomic;
use crate::session::TickViolation;
use crate::HarnessError;

/// Captured telemetry of one session, stored as JSON Lines with one frame
/// per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recording {
    frames: Vec<Frame>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Blank lines are skipped; line numbers in errors are 1-based.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut frames = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut deserializer = serde_json::Deserializer::from_str(line);
            let frame: Frame =
                serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
                    HarnessError::DecodeLine {
                        path: path.to_path_buf(),
                        line: index + 1,
                        source,
                    }
                })?;
            frames.push(frame);
        }

        info!(path = %path.display(), frames = frames.len(), "recording_loaded");
        Ok(Self { frames })
    }

    pub fn to_json_lines(&self) -> Result<String, HarnessError> {
        let mut text = String::new();
        for (index, frame) in self.frames.iter().enumerate() {
            let line = serde_json::to_string(frame)
                .map_err(|source| HarnessError::Encode { index, source })?;
            text.push_str(&line);
            text.push('\n');
        }
        Ok(text)
    }

    pub fn save(&self, path: &Path) -> Result<(), HarnessError> {
        let text = self.to_json_lines()?;
        write_text_atomic(path, &text).map_err(|source| HarnessError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), frames = self.frames.len(), "recording_saved");
        Ok(())
    }
}

impl From<&BehaviorLog> for Recording {
    fn from(behavior: &BehaviorLog) -> Self {
        Self {
            frames: behavior.frames().to_vec(),
        }
    }
}

impl FromIterator<Frame> for Recording {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub ticks: usize,
    pub violations: Vec<TickViolation>,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Feeds the recording to `model` one frame at a time, as a live session
/// would, and keeps going past violations.
pub fn replay<M: Model + ?Sized>(recording: &Recording, model: &mut M) -> ReplayReport {
    let mut behavior = BehaviorLog::new();
    let mut report = ReplayReport::default();
    for (tick, frame) in recording.frames().iter().enumerate() {
        behavior.push(frame.clone());
        if let Err(violation) = model.expect(&behavior) {
            warn!(tick, error = %violation, "replay_violation");
            report.violations.push(TickViolation { tick, violation });
        }
        report.ticks += 1;
    }
    info!(
        ticks = report.ticks,
        violations = report.violations.len(),
        "replay_finished"
    );
    report
}
