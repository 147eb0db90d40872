//! Decoded audio held for one identification run.

use crate::audio::segment::{SegmentWindow, SegmentWindows, segment};
use crate::error::Result;

/// Mono audio with a known sample rate.
///
/// Immutable once built; the identification run owns it and drops it
/// after the last segment has been materialized.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioTrack {
    /// Wrap mono samples in `[-1.0, 1.0]`.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// All samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the track and return its samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Total duration in whole milliseconds (rounded down).
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }

    /// Split the track into windows of `window_ms`.
    pub fn segments(&self, window_ms: u64) -> Result<SegmentWindows> {
        segment(self.duration_ms(), window_ms)
    }

    /// Samples covered by `window`.
    ///
    /// A window ending at the track's duration also takes the trailing
    /// sub-millisecond samples so the final segment reaches the last sample.
    pub fn slice(&self, window: SegmentWindow) -> &[f32] {
        let len = self.samples.len();
        let rate = u64::from(self.sample_rate);
        let to_index = |ms: u64| usize::try_from(ms * rate / 1000).unwrap_or(usize::MAX).min(len);

        let start = to_index(window.start_ms);
        let end = if window.end_ms >= self.duration_ms() {
            len
        } else {
            to_index(window.end_ms)
        };

        &self.samples[start..end.max(start)]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_ms_rounds_down() {
        let track = AudioTrack::new(vec![0.0; 1_500], 1_000);
        assert_eq!(track.duration_ms(), 1_500);

        let track = AudioTrack::new(vec![0.0; 15], 8_000);
        assert_eq!(track.duration_ms(), 1);
    }

    #[test]
    fn test_empty_track_has_no_segments() {
        let track = AudioTrack::new(Vec::new(), 22_050);
        assert_eq!(track.duration_ms(), 0);
        assert_eq!(track.segments(1_000).unwrap().count(), 0);
    }

    #[test]
    fn test_slices_cover_every_sample() {
        // 2.5 ms worth of extra samples past the last whole millisecond
        let track = AudioTrack::new((0..22_105).map(|i| i as f32).collect(), 22_050);
        let total: usize = track
            .segments(400)
            .unwrap()
            .map(|w| track.slice(w).len())
            .sum();
        assert_eq!(total, track.samples().len());
    }

    #[test]
    fn test_slice_is_contiguous() {
        let track = AudioTrack::new((0..3_000).map(|i| i as f32).collect(), 1_000);
        let windows: Vec<_> = track.segments(1_200).unwrap().collect();
        let first = track.slice(windows[0]);
        let second = track.slice(windows[1]);
        let last = track.slice(windows[2]);
        assert_eq!(first.len(), 1_200);
        assert_eq!(second.first().copied(), Some(1_200.0));
        assert_eq!(last.len(), 600);
    }
}
