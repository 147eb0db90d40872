//! Getting source audio onto local disk.
//!
//! Local files are used in place. SoundCloud and YouTube links are handed to
//! an external downloader that extracts the audio into a scratch directory
//! owned by the returned [`AcquiredAudio`].

use crate::constants::acquisition::{DOWNLOAD_STEM, UNSUPPORTED_URL};
use crate::error::{Error, Result};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

/// Where the audio for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// An audio file on disk.
    LocalFile(PathBuf),
    /// A SoundCloud track or set.
    SoundCloud(Url),
    /// A YouTube video.
    YouTube(Url),
}

impl Source {
    /// Classify user input as a supported link or a local path.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidArgument {
                message: "no input given".to_string(),
            });
        }

        if is_web_url(input) {
            return Self::parse_url(input);
        }

        let path = PathBuf::from(input);
        if !path.is_file() {
            return Err(Error::AcquisitionFailed {
                source_ref: input.to_string(),
                reason: "file not found".to_string(),
            });
        }
        Ok(Self::LocalFile(path))
    }

    /// Accept only SoundCloud or YouTube links.
    ///
    /// Anything else, local paths included, is rejected without touching
    /// the filesystem.
    pub fn parse_url(input: &str) -> Result<Self> {
        let input = input.trim();
        let unsupported = || Error::AcquisitionFailed {
            source_ref: input.to_string(),
            reason: UNSUPPORTED_URL.to_string(),
        };

        if !is_web_url(input) {
            return Err(unsupported());
        }
        let url = Url::parse(input).map_err(|e| Error::AcquisitionFailed {
            source_ref: input.to_string(),
            reason: format!("invalid URL: {e}"),
        })?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

        if host_matches(&host, "soundcloud.com") {
            Ok(Self::SoundCloud(url))
        } else if host_matches(&host, "youtube.com") || host_matches(&host, "youtu.be") {
            Ok(Self::YouTube(url))
        } else {
            Err(unsupported())
        }
    }

    /// URL or path as given.
    pub fn describe(&self) -> String {
        match self {
            Self::LocalFile(path) => path.display().to_string(),
            Self::SoundCloud(url) | Self::YouTube(url) => url.to_string(),
        }
    }
}

fn is_web_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// `host` is `domain` or one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Downloader settings.
#[derive(Debug, Clone)]
pub struct Downloader {
    /// Program to run (yt-dlp compatible).
    pub program: String,
    /// Audio format to extract.
    pub audio_format: String,
}

/// Audio ready to decode.
///
/// Downloaded audio lives in a scratch directory that is removed when the
/// handle drops.
#[derive(Debug)]
pub struct AcquiredAudio {
    path: PathBuf,
    workdir: Option<TempDir>,
}

impl AcquiredAudio {
    /// Path to the audio file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the audio came from a download.
    pub fn is_download(&self) -> bool {
        self.workdir.is_some()
    }
}

/// Make `source` available as a local file.
pub async fn acquire(source: &Source, downloader: &Downloader) -> Result<AcquiredAudio> {
    let url = match source {
        Source::LocalFile(path) => {
            debug!("Using local file {}", path.display());
            return Ok(AcquiredAudio {
                path: path.clone(),
                workdir: None,
            });
        }
        Source::SoundCloud(url) | Source::YouTube(url) => url,
    };

    let failed = |reason: String| Error::AcquisitionFailed {
        source_ref: url.to_string(),
        reason,
    };

    let workdir = TempDir::new().map_err(|e| failed(format!("cannot create download directory: {e}")))?;
    let template = workdir.path().join(format!("{DOWNLOAD_STEM}.%(ext)s"));

    info!("Downloading audio from {}", url);
    let output = Command::new(&downloader.program)
        .arg("-x")
        .arg("--audio-format")
        .arg(&downloader.audio_format)
        .arg("--no-playlist")
        .arg("--no-simulate")
        .arg("--print")
        .arg("after_move:filepath")
        .arg("-o")
        .arg(&template)
        .arg(url.as_str())
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| failed(format!("cannot run '{}': {e}", downloader.program)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failed(format!(
            "'{}' exited with {}: {}",
            downloader.program,
            output.status,
            last_line(&stderr)
        )));
    }

    let reported = String::from_utf8_lossy(&output.stdout)
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from);

    let path = match reported {
        Some(path) if is_file(&path).await => path,
        _ => find_download(workdir.path())
            .await
            .ok_or_else(|| failed("downloader produced no audio file".to_string()))?,
    };

    debug!("Downloaded to {}", path.display());
    Ok(AcquiredAudio {
        path,
        workdir: Some(workdir),
    })
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

/// First file in `dir` named after the download stem.
async fn find_download(dir: &Path) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.file_stem().is_some_and(|stem| stem == DOWNLOAD_STEM) && is_file(&path).await {
            return Some(path);
        }
    }
    None
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no error output")
}
