//! Output format writers.

mod csv;
mod json;
pub mod progress;
mod text;
mod types;
mod writer;

pub use csv::CsvWriter;
pub use json::{JsonTrackList, JsonWriter};
pub use text::TextWriter;
pub use types::{RunSummary, TrackRecord, format_offset};
pub use writer::{OutputWriter, create_writer, write_report};
