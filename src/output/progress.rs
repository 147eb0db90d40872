//! Terminal progress bar fed by a run's progress reporter.

use crate::pipeline::{ProgressReporter, RunPhase};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Create a progress bar for the segments of one run.
fn create_segment_progress() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} segments {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Mirror `reporter` on a progress bar until the run reaches a terminal
/// state. Returns `None` when disabled.
pub fn spawn_progress_bar(reporter: &ProgressReporter, enabled: bool) -> Option<JoinHandle<()>> {
    if !enabled {
        return None;
    }

    let mut updates = reporter.subscribe();
    let pb = create_segment_progress();

    Some(tokio::spawn(async move {
        loop {
            let state = updates.borrow_and_update().clone();
            pb.set_length(state.total_segments as u64);
            pb.set_position(state.completed_segments as u64);
            pb.set_message(state.status_message.clone());

            match state.phase {
                RunPhase::Complete => {
                    pb.finish_with_message(state.status_message);
                    break;
                }
                RunPhase::Failed | RunPhase::Cancelled => {
                    pb.abandon_with_message(state.status_message);
                    break;
                }
                RunPhase::Idle | RunPhase::Running => {}
            }

            if updates.changed().await.is_err() {
                pb.finish_and_clear();
                break;
            }
        }
    }))
}
