//! Plain text track list.

use crate::error::Result;
use crate::output::{OutputWriter, RunSummary, TrackRecord, format_offset};
use std::io::{BufWriter, Write};

/// One `Artist - Title [mm:ss]` line per track, followed by the video link
/// when there is one.
pub struct TextWriter {
    writer: BufWriter<Box<dyn Write>>,
    written: usize,
}

impl TextWriter {
    /// Create a text writer.
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            writer: BufWriter::new(out),
            written: 0,
        }
    }
}

impl OutputWriter for TextWriter {
    fn write_header(&mut self, _summary: &RunSummary) -> Result<()> {
        Ok(())
    }

    fn write_track(&mut self, track: &TrackRecord) -> Result<()> {
        write!(
            self.writer,
            "{} - {} [{}]",
            track.artist,
            track.title,
            format_offset(track.first_seen_ms)
        )?;
        if let Some(link) = &track.youtube_link {
            write!(self.writer, " {link}")?;
        }
        writeln!(self.writer)?;
        self.written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if self.written == 0 {
            writeln!(self.writer, "No tracks identified.")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
