//! Audio resampling using rubato.

use crate::audio::AudioTrack;
use crate::error::{Error, Result};
use audioadapter_buffers::direct::SequentialSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Frames fed to the resampler per block.
const BLOCK_FRAMES: usize = 1024;

/// Resample a track to `to_rate`.
///
/// Returns the track unchanged if it is already at the target rate.
pub fn resample(track: AudioTrack, to_rate: u32) -> Result<AudioTrack> {
    let from_rate = track.sample_rate();
    if from_rate == to_rate || track.samples().is_empty() {
        return Ok(AudioTrack::new(track.into_samples(), to_rate));
    }

    let samples = track.into_samples();

    let mut resampler = Fft::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        BLOCK_FRAMES,
        1,
        1,
        FixedSync::Both,
    )
    .map_err(|e| Error::Resample {
        reason: e.to_string(),
    })?;

    let block = resampler.input_frames_next();
    let mut output = Vec::with_capacity(estimate_output_len(samples.len(), from_rate, to_rate));

    let mut blocks = samples.chunks_exact(block);
    for chunk in &mut blocks {
        output.extend_from_slice(&process_block(&mut resampler, chunk)?);
    }

    // Pad the tail and keep only the proportional share of its output
    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut padded = tail.to_vec();
        padded.resize(block, 0.0);
        let resampled = process_block(&mut resampler, &padded)?;

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let keep =
            (tail.len() as f64 * f64::from(to_rate) / f64::from(from_rate)).ceil() as usize;
        output.extend_from_slice(&resampled[..keep.min(resampled.len())]);
    }

    Ok(AudioTrack::new(output, to_rate))
}

/// Run one fixed-size mono block through the resampler.
fn process_block(resampler: &mut Fft<f32>, block: &[f32]) -> Result<Vec<f32>> {
    let input = SequentialSlice::new(block, 1, block.len()).map_err(|e| Error::Resample {
        reason: format!("failed to create input adapter: {e}"),
    })?;

    let resampled = resampler
        .process(&input, 0, None)
        .map_err(|e| Error::Resample {
            reason: e.to_string(),
        })?;

    Ok(resampled.take_data())
}

/// Estimate output length after resampling.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn estimate_output_len(input_len: usize, from_rate: u32, to_rate: u32) -> usize {
    ((input_len as f64) * f64::from(to_rate) / f64::from(from_rate)).ceil() as usize
        + BLOCK_FRAMES
}
