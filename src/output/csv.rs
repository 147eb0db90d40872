//! CSV output format writer.

use crate::error::{Error, Result};
use crate::output::{OutputWriter, RunSummary, TrackRecord};
use std::io::Write;

/// CSV format output writer.
pub struct CsvWriter {
    writer: ::csv::Writer<Box<dyn Write>>,
}

impl CsvWriter {
    /// Create a new CSV writer.
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            writer: ::csv::Writer::from_writer(out),
        }
    }
}

fn csv_err(e: ::csv::Error) -> Error {
    Error::OutputWrite {
        reason: e.to_string(),
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self, _summary: &RunSummary) -> Result<()> {
        self.writer
            .write_record([
                "Artist",
                "Title",
                "Track ID",
                "First seen (s)",
                "YouTube link",
            ])
            .map_err(csv_err)
    }

    fn write_track(&mut self, track: &TrackRecord) -> Result<()> {
        let first_seen = (track.first_seen_ms / 1000).to_string();
        self.writer
            .write_record([
                track.artist.as_str(),
                track.title.as_str(),
                track.track_id.as_str(),
                first_seen.as_str(),
                track.youtube_link.as_deref().unwrap_or_default(),
            ])
            .map_err(csv_err)
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
