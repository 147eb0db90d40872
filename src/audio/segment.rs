//! Fixed-window segmentation of a track timeline.

use crate::error::{Error, Result};
use serde::Serialize;

/// A contiguous slice of the timeline, `[start_ms, end_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SegmentWindow {
    /// Start offset in milliseconds.
    pub start_ms: u64,
    /// End offset in milliseconds (exclusive).
    pub end_ms: u64,
}

impl SegmentWindow {
    /// Window length in milliseconds.
    pub fn len_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Lazy sequence of windows covering `[0, duration_ms)`.
///
/// Built by [`segment`]; calling it again with the same inputs yields the
/// same sequence.
#[derive(Debug, Clone)]
pub struct SegmentWindows {
    duration_ms: u64,
    window_ms: u64,
    next_start: u64,
}

/// Split `duration_ms` into windows of `window_ms`.
///
/// Yields `ceil(duration_ms / window_ms)` windows; the last one is clipped
/// to the duration. A zero duration yields nothing.
pub fn segment(duration_ms: u64, window_ms: u64) -> Result<SegmentWindows> {
    if window_ms == 0 {
        return Err(Error::InvalidArgument {
            message: "segment window must be greater than zero".to_string(),
        });
    }

    Ok(SegmentWindows {
        duration_ms,
        window_ms,
        next_start: 0,
    })
}

impl SegmentWindows {
    /// Total number of windows, including any already yielded.
    pub fn total(&self) -> usize {
        usize::try_from(self.duration_ms.div_ceil(self.window_ms)).unwrap_or(usize::MAX)
    }
}

impl Iterator for SegmentWindows {
    type Item = SegmentWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.duration_ms {
            return None;
        }

        let start_ms = self.next_start;
        let end_ms = start_ms.saturating_add(self.window_ms).min(self.duration_ms);
        self.next_start = end_ms;

        Some(SegmentWindow { start_ms, end_ms })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .duration_ms
            .saturating_sub(self.next_start)
            .div_ceil(self.window_ms);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SegmentWindows {}

impl std::iter::FusedIterator for SegmentWindows {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn windows(duration_ms: u64, window_ms: u64) -> Vec<SegmentWindow> {
        segment(duration_ms, window_ms).unwrap().collect()
    }

    #[test]
    fn test_mix_with_short_tail() {
        let w = windows(300_000, 120_000);
        let lengths: Vec<u64> = w.iter().map(SegmentWindow::len_ms).collect();
        assert_eq!(lengths, vec![120_000, 120_000, 60_000]);
        assert_eq!(w[2].start_ms, 240_000);
        assert_eq!(w[2].end_ms, 300_000);
    }

    #[test]
    fn test_zero_duration_yields_nothing() {
        let windows = segment(0, 120_000).unwrap();
        assert_eq!(windows.total(), 0);
        assert_eq!(windows.count(), 0);
    }

    #[test]
    fn test_zero_window_is_rejected() {
        assert!(matches!(
            segment(10_000, 0),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_duration_shorter_than_window() {
        let w = windows(45_000, 120_000);
        assert_eq!(w, vec![SegmentWindow { start_ms: 0, end_ms: 45_000 }]);
    }

    #[test]
    fn test_windows_cover_duration_without_gaps() {
        for (duration, window) in [(1, 1), (7, 3), (59_999, 60_000), (3_600_001, 60_000)] {
            let w = windows(duration, window);
            assert_eq!(w.len() as u64, duration.div_ceil(window));
            assert_eq!(w.first().map(|x| x.start_ms), Some(0));
            assert_eq!(w.last().map(|x| x.end_ms), Some(duration));
            assert!(w.windows(2).all(|pair| pair[0].end_ms == pair[1].start_ms));
            assert!(w.iter().all(|x| x.len_ms() > 0 && x.len_ms() <= window));
        }
    }

    #[test]
    fn test_restartable() {
        assert_eq!(windows(250_000, 60_000), windows(250_000, 60_000));
    }

    #[test]
    fn test_exact_size_tracks_progress() {
        let mut w = segment(300_000, 120_000).unwrap();
        assert_eq!(w.len(), 3);
        w.next();
        assert_eq!(w.len(), 2);
        assert_eq!(w.total(), 3);
    }
}
