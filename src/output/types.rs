//! Output type definitions.

use crate::pipeline::SessionReport;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One identified track as written to output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRecord {
    /// Performing artist.
    pub artist: String,
    /// Track title.
    pub title: String,
    /// Deduplication key reported by the recognition service.
    pub track_id: String,
    /// Start of the first segment the track was heard in.
    pub first_seen_ms: u64,
    /// YouTube watch URL, when looked up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_link: Option<String>,
    /// YouTube video id, when looked up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
}

/// Run-level facts written alongside the tracks.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// URL or path that was analyzed.
    pub source: String,
    /// When the run finished.
    pub analyzed_at: DateTime<Utc>,
    /// Segment window in seconds.
    pub window_secs: f64,
    /// Segments in the run.
    pub segments_total: usize,
    /// Segments skipped after a recognition failure.
    pub segments_failed: usize,
}

impl RunSummary {
    /// Summary of a finished session.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_report(report: &SessionReport) -> Self {
        Self {
            source: report.source.clone(),
            analyzed_at: report.analyzed_at,
            window_secs: report.window_ms as f64 / 1000.0,
            segments_total: report.result.total_segments,
            segments_failed: report.result.failed_segments.len(),
        }
    }
}

impl TrackRecord {
    /// Records for every track of a session, in first-seen order.
    pub fn from_report(report: &SessionReport) -> Vec<Self> {
        report
            .result
            .tracks
            .iter()
            .zip(report.links.iter().chain(std::iter::repeat(&None)))
            .map(|(identified, link)| Self {
                artist: identified.track.artist.clone(),
                title: identified.track.title.clone(),
                track_id: identified.track.track_id.to_string(),
                first_seen_ms: identified.window.start_ms,
                youtube_link: link.as_ref().map(|l| l.link.clone()),
                youtube_id: link.as_ref().map(|l| l.id.clone()),
            })
            .collect()
    }
}

/// `mm:ss`, or `h:mm:ss` from one hour on.
pub fn format_offset(ms: u64) -> String {
    let secs = ms / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
