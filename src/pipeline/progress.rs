//! Run progress shared between the pipeline and its observers.

use crate::constants::status;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    /// No run has started.
    Idle,
    /// A run is in flight.
    Running,
    /// The run finished and its result was assembled.
    Complete,
    /// The run failed.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

impl RunPhase {
    /// Whether no further updates will follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }
}

/// Snapshot of a run's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    /// Segments whose recognition call has resolved.
    pub completed_segments: usize,
    /// Segments in the run.
    pub total_segments: usize,
    /// Completion in whole percent (0-100).
    pub percent: u8,
    /// Human-readable status line.
    pub status_message: String,
    /// Lifecycle phase.
    pub phase: RunPhase,
}

impl ProgressState {
    fn idle() -> Self {
        Self {
            completed_segments: 0,
            total_segments: 0,
            percent: 0,
            status_message: status::IDLE.to_string(),
            phase: RunPhase::Idle,
        }
    }
}

/// Progress handle for one run.
///
/// Clones share the same state. Every update replaces the whole snapshot,
/// so readers never see a percent from one update paired with the status of
/// another. Readers on other tasks can poll [`read`](Self::read) or
/// [`subscribe`](Self::subscribe) to changes.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    state: Arc<watch::Sender<ProgressState>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    /// Create an idle reporter.
    pub fn new() -> Self {
        let (state, _) = watch::channel(ProgressState::idle());
        Self {
            state: Arc::new(state),
        }
    }

    /// Start a new run: zero all counters and set the status.
    pub fn reset(&self, status: impl Into<String>) {
        let status = status.into();
        self.state.send_modify(|state| {
            *state = ProgressState {
                status_message: status,
                phase: RunPhase::Running,
                ..ProgressState::idle()
            };
        });
    }

    /// Record that `completed` of `total` segments have resolved.
    ///
    /// Percent is `floor(completed * 100 / total)`, never lower than the
    /// previous value within the run. A `total` of zero counts as done.
    pub fn advance(&self, completed: usize, total: usize, status: impl Into<String>) {
        let status = status.into();
        let completed = completed.min(total);
        let percent = percent_of(completed, total);
        self.state.send_modify(|state| {
            state.percent = percent.max(state.percent);
            state.completed_segments = completed.max(state.completed_segments);
            state.total_segments = total;
            state.status_message = status;
            state.phase = RunPhase::Running;
        });
    }

    /// Update only the status line of a running run.
    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.state.send_modify(|state| state.status_message = status);
    }

    /// Mark the run complete at 100%.
    pub fn finish(&self, status: impl Into<String>) {
        let status = status.into();
        self.state.send_modify(|state| {
            state.completed_segments = state.total_segments;
            state.percent = 100;
            state.status_message = status;
            state.phase = RunPhase::Complete;
        });
    }

    /// Mark the run failed; counters drop back to zero.
    ///
    /// No-op if the run already ended.
    pub fn fail(&self, status: impl Into<String>) {
        self.terminate(RunPhase::Failed, status.into());
    }

    /// Mark the run cancelled; counters drop back to zero.
    pub fn cancel(&self) {
        self.terminate(RunPhase::Cancelled, status::CANCELLED.to_string());
    }

    /// The first terminal state of a run sticks until the next reset.
    fn terminate(&self, phase: RunPhase, status: String) {
        self.state.send_if_modified(|state| {
            if state.phase.is_terminal() {
                return false;
            }
            *state = ProgressState {
                status_message: status,
                phase,
                ..ProgressState::idle()
            };
            true
        });
    }

    /// Latest snapshot.
    pub fn read(&self) -> ProgressState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every update.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.state.subscribe()
    }
}

/// `floor(completed * 100 / total)`, with an empty run counting as 100%.
fn percent_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = completed.saturating_mul(100) / total;
    u8::try_from(percent.min(100)).unwrap_or(100)
}
