//! Driver side of a verification session: feeds input to a running game,
//! captures telemetry each tick and hands the growing log to a model.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

mod atomic_io;
mod bootstrap;
mod input;
mod recording;
mod session;

pub use bootstrap::{init_tracing, load_model_config};
pub use input::{InputEvent, InputQueue, InputSender};
pub use recording::{replay, Recording, ReplayReport};
pub use session::{
    Capture, RunReport, Session, Simulation, StepOutcome, TickStatus, TickViolation, Vision,
};

pub type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Failures of the driver itself. Invariant violations are reported
/// separately and never end up here.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: JsonPathError,
    },
    #[error("invalid frame in {path} at line {line}: {source}")]
    DecodeLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: JsonPathError,
    },
    #[error("failed to encode frame {index}: {source}")]
    Encode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("telemetry capture failed at tick {tick}: {source}")]
    Capture {
        tick: usize,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("session already finished after {ticks} ticks")]
    SessionFinished { ticks: usize },
}
