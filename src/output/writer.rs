//! Output writer trait and format dispatch.

use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::{CsvWriter, JsonWriter, RunSummary, TextWriter, TrackRecord};
use crate::pipeline::SessionReport;
use std::io::Write;

/// Trait for writing a track list.
pub trait OutputWriter {
    /// Write the header (if applicable).
    fn write_header(&mut self, summary: &RunSummary) -> Result<()>;

    /// Write a single track.
    fn write_track(&mut self, track: &TrackRecord) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;
}

/// Writer for `format` on top of `out`.
pub fn create_writer(format: OutputFormat, out: Box<dyn Write>) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Text => Box::new(TextWriter::new(out)),
        OutputFormat::Json => Box::new(JsonWriter::new(out)),
        OutputFormat::Csv => Box::new(CsvWriter::new(out)),
    }
}

/// Write a finished session in `format`.
pub fn write_report(report: &SessionReport, format: OutputFormat, out: Box<dyn Write>) -> Result<()> {
    let mut writer = create_writer(format, out);
    writer.write_header(&RunSummary::from_report(report))?;
    for track in TrackRecord::from_report(report) {
        writer.write_track(&track)?;
    }
    writer.finalize()
}
