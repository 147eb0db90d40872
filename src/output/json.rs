//! JSON output format writer.

use crate::error::{Error, Result};
use crate::output::{OutputWriter, RunSummary, TrackRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// JSON document structure.
#[derive(Debug, Serialize)]
pub struct JsonTrackList {
    /// URL or path that was analyzed.
    pub source: String,
    /// Analysis timestamp.
    pub analyzed_at: DateTime<Utc>,
    /// Segment window in seconds.
    pub window_secs: f64,
    /// Segments in the run.
    pub segments_total: usize,
    /// Segments skipped after a recognition failure.
    pub segments_failed: usize,
    /// Tracks in first-seen order.
    pub tracks: Vec<TrackRecord>,
}

/// Collects tracks and writes one JSON document on finalize.
pub struct JsonWriter {
    out: Box<dyn Write>,
    summary: Option<RunSummary>,
    tracks: Vec<TrackRecord>,
}

impl JsonWriter {
    /// Create a JSON writer.
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            out,
            summary: None,
            tracks: Vec::new(),
        }
    }
}

impl OutputWriter for JsonWriter {
    fn write_header(&mut self, summary: &RunSummary) -> Result<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }

    fn write_track(&mut self, track: &TrackRecord) -> Result<()> {
        self.tracks.push(track.clone());
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let summary = self.summary.take().ok_or_else(|| Error::OutputWrite {
            reason: "JSON output finalized without a header".to_string(),
        })?;

        let document = JsonTrackList {
            source: summary.source,
            analyzed_at: summary.analyzed_at,
            window_secs: summary.window_secs,
            segments_total: summary.segments_total,
            segments_failed: summary.segments_failed,
            tracks: std::mem::take(&mut self.tracks),
        };

        serde_json::to_writer_pretty(&mut self.out, &document)
            .map_err(|e| Error::JsonWrite { source: e })?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
