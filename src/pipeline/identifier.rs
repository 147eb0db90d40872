//! Segment-by-segment identification with first-seen deduplication.

use crate::audio::{AudioChunk, AudioTrack, SegmentWindow};
use crate::constants::status;
use crate::error::{Error, Result};
use crate::pipeline::ProgressReporter;
use crate::recognition::{RecognitionClient, TrackId, TrackMatch};
use futures_util::StreamExt;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What to do when a segment's recognition call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the run; no partial result is returned.
    #[default]
    FailFast,
    /// Log the segment as failed and keep going.
    SkipSegment,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast"),
            Self::SkipSegment => write!(f, "skip-segment"),
        }
    }
}

/// Settings for one identification run.
#[derive(Debug, Clone)]
pub struct IdentifyOptions {
    /// Segment window in milliseconds.
    pub window_ms: u64,
    /// Reaction to a failed recognition call.
    pub failure_policy: FailurePolicy,
    /// Recognition calls kept in flight. Results are still consumed in
    /// segment order.
    pub concurrency: usize,
}

/// A unique track and the segment it was first heard in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedTrack {
    /// The recognised track.
    pub track: TrackMatch,
    /// Zero-based index of the first segment that matched it.
    pub segment: usize,
    /// Window of that segment.
    pub window: SegmentWindow,
}

/// Unique tracks of a run, ordered by first appearance.
#[derive(Debug, Clone, Default)]
pub struct IdentificationResult {
    /// Tracks in first-seen order.
    pub tracks: Vec<IdentifiedTrack>,
    /// Segments in the run.
    pub total_segments: usize,
    /// Zero-based indices of segments skipped after a recognition failure.
    pub failed_segments: Vec<usize>,
}

impl IdentificationResult {
    /// The matches alone, in order.
    pub fn matches(&self) -> impl Iterator<Item = &TrackMatch> {
        self.tracks.iter().map(|t| &t.track)
    }

    /// Number of unique tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether nothing was recognised.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Keeps the first match per track id.
#[derive(Debug, Default)]
struct TrackAccumulator {
    seen: HashSet<TrackId>,
    tracks: Vec<IdentifiedTrack>,
}

impl TrackAccumulator {
    /// Record a match; returns `false` if its id was already seen.
    fn offer(&mut self, segment: usize, window: SegmentWindow, found: TrackMatch) -> bool {
        if !self.seen.insert(found.track_id.clone()) {
            return false;
        }
        self.tracks.push(IdentifiedTrack {
            track: found,
            segment,
            window,
        });
        true
    }
}

/// Identify the tracks in `track`.
///
/// Each window is rendered to an in-memory WAV, sent to `client`, and the
/// first match per track id is kept. `reporter` is reset on entry, advanced
/// once per resolved segment and left at 100% on success; on failure or
/// cancellation it is moved to the matching terminal state before the error
/// is returned.
pub async fn identify<C>(
    track: AudioTrack,
    options: &IdentifyOptions,
    client: &C,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<IdentificationResult>
where
    C: RecognitionClient + ?Sized,
{
    reporter.reset(status::IDENTIFYING);

    let windows = match track.segments(options.window_ms) {
        Ok(windows) => windows,
        Err(e) => {
            reporter.fail(format!("Error: {e}"));
            return Err(e);
        }
    };
    let total = windows.len();

    if total == 0 {
        info!("No audio to identify");
        reporter.advance(0, 0, "No audio to identify");
        return Ok(IdentificationResult::default());
    }

    info!(
        "Identifying {} segment(s) of {:.0}s each",
        total,
        Duration::from_millis(options.window_ms).as_secs_f64()
    );

    let audio = &track;
    let mut outcomes = stream::iter(windows.enumerate())
        .map(|(index, window)| async move {
            let outcome = match AudioChunk::encode(audio, index, window) {
                Ok(chunk) => client.recognize(&chunk).await,
                Err(e) => Err(e),
            };
            (index, window, outcome)
        })
        .buffered(options.concurrency.max(1));

    let mut accumulator = TrackAccumulator::default();
    let mut failed_segments = Vec::new();
    let mut completed = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("Identification cancelled after {} of {} segments", completed, total);
                reporter.cancel();
                return Err(Error::Cancelled);
            }
            next = outcomes.next() => next,
        };

        let Some((index, window, outcome)) = next else {
            break;
        };

        match outcome {
            Ok(Some(found)) => {
                let label = found.to_string();
                if accumulator.offer(index, window, found) {
                    info!("Segment {}/{}: {}", index + 1, total, label);
                } else {
                    debug!("Segment {}/{}: {} (already listed)", index + 1, total, label);
                }
            }
            Ok(None) => debug!("Segment {}/{}: no match", index + 1, total),
            Err(err)
                if options.failure_policy == FailurePolicy::SkipSegment
                    && err.is_recognition_unavailable() =>
            {
                warn!("Segment {}/{} skipped: {}", index + 1, total, err.display_chain());
                failed_segments.push(index);
            }
            Err(err) => {
                let err = Error::IdentificationFailed {
                    segment: index + 1,
                    total,
                    source: Box::new(err),
                };
                reporter.fail(format!("Error: {}", err.display_chain()));
                return Err(err);
            }
        }

        completed += 1;
        reporter.advance(
            completed,
            total,
            format!("Processing segment {completed} of {total}"),
        );
    }

    drop(outcomes);
    drop(track);

    info!(
        "Identified {} unique track(s) in {} segment(s)",
        accumulator.tracks.len(),
        total
    );

    Ok(IdentificationResult {
        tracks: accumulator.tracks,
        total_segments: total,
        failed_segments,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::RunPhase;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Canned answer for one segment.
    #[derive(Clone)]
    enum Reply {
        Match(&'static str),
        Nothing,
        Down,
    }

    /// Client that answers from a per-segment script and records what it saw.
    struct ScriptedClient {
        replies: HashMap<usize, Reply>,
        delay_ms: Option<u64>,
        calls: Mutex<Vec<usize>>,
        progress_seen: Mutex<Vec<u8>>,
        reporter: Option<ProgressReporter>,
    }

    impl ScriptedClient {
        fn new(replies: &[Reply]) -> Self {
            Self {
                replies: replies.iter().cloned().enumerate().collect(),
                delay_ms: None,
                calls: Mutex::new(Vec::new()),
                progress_seen: Mutex::new(Vec::new()),
                reporter: None,
            }
        }

        fn observing(mut self, reporter: &ProgressReporter) -> Self {
            self.reporter = Some(reporter.clone());
            self
        }

        fn calls(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecognitionClient for ScriptedClient {
        async fn recognize(&self, chunk: &AudioChunk) -> Result<Option<TrackMatch>> {
            self.calls.lock().unwrap().push(chunk.index);
            if let Some(reporter) = &self.reporter {
                self.progress_seen.lock().unwrap().push(reporter.read().percent);
            }
            if let Some(base) = self.delay_ms {
                // Later segments answer sooner
                let wait = base * (10 - chunk.index as u64);
                tokio::time::sleep(Duration::from_millis(wait)).await;
            }
            match self.replies.get(&chunk.index).cloned().unwrap_or(Reply::Nothing) {
                Reply::Match(id) => Ok(Some(TrackMatch::new(id, format!("Artist {id}"), format!("Title {id}")))),
                Reply::Nothing => Ok(None),
                Reply::Down => Err(Error::recognition("connection reset")),
            }
        }
    }

    /// One sample per millisecond, so sample count equals duration.
    fn track_of(duration_ms: usize) -> AudioTrack {
        AudioTrack::new(vec![0.0; duration_ms], 1_000)
    }

    fn options(window_ms: u64) -> IdentifyOptions {
        IdentifyOptions {
            window_ms,
            failure_policy: FailurePolicy::FailFast,
            concurrency: 1,
        }
    }

    fn ids(result: &IdentificationResult) -> Vec<&str> {
        result.matches().map(|m| m.track_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_repeated_track_listed_once_in_first_seen_order() {
        let client = ScriptedClient::new(&[Reply::Match("X"), Reply::Match("X"), Reply::Match("Y")]);
        let reporter = ProgressReporter::new();

        let result = identify(
            track_of(300_000),
            &options(120_000),
            &client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(ids(&result), vec!["X", "Y"]);
        assert_eq!(result.total_segments, 3);
        assert_eq!(result.tracks[0].segment, 0);
        assert_eq!(result.tracks[1].window.len_ms(), 60_000);
        assert_eq!(client.calls(), vec![0, 1, 2]);

        let state = reporter.read();
        assert_eq!(state.percent, 100);
        assert_eq!(state.completed_segments, 3);
    }

    #[tokio::test]
    async fn test_empty_track_makes_no_calls() {
        let client = ScriptedClient::new(&[]);
        let reporter = ProgressReporter::new();

        let result = identify(
            track_of(0),
            &options(120_000),
            &client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.total_segments, 0);
        assert!(client.calls().is_empty());
        assert_eq!(reporter.read().completed_segments, 0);
    }

    #[tokio::test]
    async fn test_failure_aborts_run_and_marks_reporter() {
        let client = ScriptedClient::new(&[Reply::Match("X"), Reply::Down, Reply::Match("Y")]);
        let reporter = ProgressReporter::new();

        let err = identify(
            track_of(300_000),
            &options(120_000),
            &client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            Error::IdentificationFailed {
                segment: 2,
                total: 3,
                ..
            }
        ));
        assert_eq!(client.calls(), vec![0, 1]);
        let state = reporter.read();
        assert_eq!(state.phase, RunPhase::Failed);
        assert!(state.status_message.contains("segment 2 of 3"));
    }

    #[tokio::test]
    async fn test_skip_segment_policy_continues() {
        let client = ScriptedClient::new(&[Reply::Match("X"), Reply::Down, Reply::Match("Y")]);
        let reporter = ProgressReporter::new();
        let mut opts = options(120_000);
        opts.failure_policy = FailurePolicy::SkipSegment;

        let result = identify(
            track_of(300_000),
            &opts,
            &client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(ids(&result), vec!["X", "Y"]);
        assert_eq!(result.failed_segments, vec![1]);
        assert_eq!(reporter.read().percent, 100);
    }

    #[tokio::test]
    async fn test_no_matches_still_completes() {
        let client = ScriptedClient::new(&[Reply::Nothing, Reply::Nothing, Reply::Nothing]);
        let reporter = ProgressReporter::new();

        let result = identify(
            track_of(300_000),
            &options(120_000),
            &client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.is_empty());
        assert_eq!(reporter.read().percent, 100);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let reporter = ProgressReporter::new();
        let client = ScriptedClient::new(&[]).observing(&reporter);

        identify(
            track_of(7_000),
            &options(1_000),
            &client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let seen = client.progress_seen.lock().unwrap().clone();
        assert_eq!(seen, vec![0, 14, 28, 42, 57, 71, 85]);
        assert_eq!(reporter.read().percent, 100);
    }

    #[tokio::test]
    async fn test_back_to_back_runs_start_from_zero() {
        let reporter = ProgressReporter::new();

        let failing = ScriptedClient::new(&[Reply::Nothing, Reply::Down]);
        let first = identify(
            track_of(3_000),
            &options(1_000),
            &failing,
            &reporter,
            &CancellationToken::new(),
        )
        .await;
        assert!(first.is_err());

        let second_client = ScriptedClient::new(&[]).observing(&reporter);
        identify(
            track_of(2_000),
            &options(1_000),
            &second_client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let seen = second_client.progress_seen.lock().unwrap().clone();
        assert_eq!(seen, vec![0, 50]);
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_keeps_segment_order() {
        let mut client = ScriptedClient::new(&[
            Reply::Match("A"),
            Reply::Match("B"),
            Reply::Match("A"),
            Reply::Match("C"),
        ]);
        client.delay_ms = Some(5);
        let reporter = ProgressReporter::new();
        let mut opts = options(1_000);
        opts.concurrency = 4;

        let result = identify(
            track_of(4_000),
            &opts,
            &client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(ids(&result), vec!["A", "B", "C"]);
        assert_eq!(result.tracks[0].segment, 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_stops() {
        let client = ScriptedClient::new(&[Reply::Match("X")]);
        let reporter = ProgressReporter::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = identify(track_of(3_000), &options(1_000), &client, &reporter, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(reporter.read().phase, RunPhase::Cancelled);
    }

    /// Answers segment 0, then never returns from segment 1.
    struct StallingClient {
        calls: Mutex<Vec<usize>>,
        stalled: Arc<Notify>,
    }

    #[async_trait]
    impl RecognitionClient for StallingClient {
        async fn recognize(&self, chunk: &AudioChunk) -> Result<Option<TrackMatch>> {
            self.calls.lock().unwrap().push(chunk.index);
            if chunk.index == 1 {
                self.stalled.notify_one();
                std::future::pending::<()>().await;
            }
            Ok(Some(TrackMatch::new("A", "Artist", "Title")))
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_call_in_flight() {
        let stalled = Arc::new(Notify::new());
        let client = StallingClient {
            calls: Mutex::new(Vec::new()),
            stalled: stalled.clone(),
        };
        let reporter = ProgressReporter::new();
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                stalled.notified().await;
                cancel.cancel();
            })
        };

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            identify(track_of(3_000), &options(1_000), &client, &reporter, &cancel),
        )
        .await
        .unwrap()
        .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, Error::Cancelled));
        // Segment 2 was never dispatched
        assert_eq!(client.calls.lock().unwrap().clone(), vec![0, 1]);
        let state = reporter.read();
        assert_eq!(state.phase, RunPhase::Cancelled);
        assert_eq!(state.status_message, "Cancelled");
    }

    #[tokio::test]
    async fn test_zero_window_is_invalid() {
        let client = ScriptedClient::new(&[]);
        let reporter = ProgressReporter::new();

        let err = identify(
            track_of(1_000),
            &options(0),
            &client,
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(reporter.read().phase, RunPhase::Failed);
    }

    #[test]
    fn test_accumulator_keeps_first_occurrence() {
        let mut acc = TrackAccumulator::default();
        let w = SegmentWindow {
            start_ms: 0,
            end_ms: 1,
        };
        assert!(acc.offer(0, w, TrackMatch::new("X", "a", "b")));
        // Same id, different metadata: still a duplicate
        assert!(!acc.offer(1, w, TrackMatch::new("X", "other", "names")));
        assert_eq!(acc.tracks.len(), 1);
        assert_eq!(acc.tracks[0].track.artist, "a");
    }
}
