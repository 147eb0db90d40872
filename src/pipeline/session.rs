//! One end-to-end run: acquire, decode, identify, enrich.

use crate::acquire::{Downloader, Source, acquire};
use crate::audio::{AudioTrack, decode_audio_file, resample};
use crate::constants::status;
use crate::enrich::{VideoLink, YouTubeSearch};
use crate::error::{Error, Result};
use crate::pipeline::{IdentificationResult, IdentifyOptions, ProgressReporter, identify};
use crate::recognition::RecognitionClient;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Settings shared by every run of a CLI invocation or server.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Segmentation and dispatch settings.
    pub identify: IdentifyOptions,
    /// Sample rate chunks are resampled to before upload.
    pub sample_rate: u32,
    /// Downloader for remote sources.
    pub downloader: Downloader,
    /// Whether to look up video links for the result.
    pub fetch_links: bool,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// URL or path the audio came from.
    pub source: String,
    /// When the run finished.
    pub analyzed_at: DateTime<Utc>,
    /// Segment window used, in milliseconds.
    pub window_ms: u64,
    /// Identified tracks.
    pub result: IdentificationResult,
    /// Video link per track, parallel to `result.tracks`.
    pub links: Vec<Option<VideoLink>>,
}

/// Run a full identification for `source`.
///
/// Callers decide which inputs they accept; the CLI takes local files, the
/// HTTP API only links. The reporter moves through download, decode and identification and ends
/// in `Complete`, `Failed` or `Cancelled`. A terminal state stays visible
/// until the reporter is reset by the next run.
pub async fn run_session<C>(
    source: Source,
    settings: &RunSettings,
    client: &C,
    enricher: Option<&YouTubeSearch>,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<SessionReport>
where
    C: RecognitionClient + ?Sized,
{
    reporter.reset(status::DOWNLOADING);

    match drive(source, settings, client, enricher, reporter, cancel).await {
        Ok(report) => {
            reporter.finish(status::COMPLETE);
            Ok(report)
        }
        Err(Error::Cancelled) => {
            reporter.cancel();
            Err(Error::Cancelled)
        }
        Err(e) => {
            reporter.fail(format!("Error: {}", e.display_chain()));
            Err(e)
        }
    }
}

async fn drive<C>(
    source: Source,
    settings: &RunSettings,
    client: &C,
    enricher: Option<&YouTubeSearch>,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<SessionReport>
where
    C: RecognitionClient + ?Sized,
{
    let described = source.describe();
    info!("Analyzing {}", described);

    let audio = until_cancelled(cancel, acquire(&source, &settings.downloader)).await?;

    reporter.set_status(status::DECODING);
    let path = audio.path().to_path_buf();
    let sample_rate = settings.sample_rate;
    let track = until_cancelled(cancel, load_track(path, sample_rate)).await?;
    // Scratch files are no longer needed once samples are in memory
    if audio.is_download() {
        debug!("Removing downloaded audio {}", audio.path().display());
    }
    drop(audio);

    let result = identify(track, &settings.identify, client, reporter, cancel).await?;

    let links = match enricher {
        Some(search) if settings.fetch_links && !result.is_empty() => {
            reporter.set_status(status::FETCHING_LINKS);
            until_cancelled(cancel, async { Ok(search.lookup_all(result.matches()).await) }).await?
        }
        _ => vec![None; result.len()],
    };

    Ok(SessionReport {
        source: described,
        analyzed_at: Utc::now(),
        window_ms: settings.identify.window_ms,
        result,
        links,
    })
}

/// Decode and resample on a blocking thread.
async fn load_track(path: PathBuf, sample_rate: u32) -> Result<AudioTrack> {
    tokio::task::spawn_blocking(move || {
        let decoded = decode_audio_file(&path)?;
        debug!(
            "Decoded {} ms at {} Hz from {}",
            decoded.duration_ms(),
            decoded.sample_rate(),
            path.display()
        );
        resample(decoded, sample_rate)
    })
    .await
    .map_err(|e| Error::Internal {
        message: format!("decode task failed: {e}"),
    })?
}

/// Await `work` unless `cancel` fires first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        outcome = work => outcome,
    }
}
