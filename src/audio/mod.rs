//! Audio decoding, segmentation and chunk encoding.

mod chunk;
mod decode;
mod resample;
mod segment;
mod track;

pub use chunk::AudioChunk;
pub use decode::decode_audio_file;
pub use resample::resample;
pub use segment::{SegmentWindow, SegmentWindows, segment};
pub use track::AudioTrack;
