//! In-memory WAV chunks submitted for recognition.

use crate::audio::{AudioTrack, SegmentWindow};
use crate::error::{Error, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// One segment rendered as a self-contained WAV file in memory.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Zero-based segment index.
    pub index: usize,
    /// Timeline window covered by this chunk.
    pub window: SegmentWindow,
    /// 16-bit PCM mono WAV bytes.
    pub wav: Vec<u8>,
}

impl AudioChunk {
    /// Render `window` of `track` as WAV.
    pub fn encode(track: &AudioTrack, index: usize, window: SegmentWindow) -> Result<Self> {
        let wav = encode_wav(track.slice(window), track.sample_rate())
            .map_err(|source| Error::ChunkEncode { index, source })?;

        Ok(Self { index, window, wav })
    }
}

/// Encode mono f32 samples as 16-bit PCM WAV bytes.
fn encode_wav(samples: &[f32], sample_rate: u32) -> std::result::Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    // 44-byte RIFF header plus two bytes per sample
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer.write_sample(value)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
