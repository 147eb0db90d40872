//! Identification pipeline: progress, per-segment identification and the
//! session driver that wires acquisition and enrichment around it.

mod identifier;
mod progress;
mod session;

pub use identifier::{
    FailurePolicy, IdentificationResult, IdentifiedTrack, IdentifyOptions, identify,
};
pub use progress::{ProgressReporter, ProgressState, RunPhase};
pub use session::{RunSettings, SessionReport, run_session};
