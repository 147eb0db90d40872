//! HTTP adapter for the AudD recognition API.
//!
//! Chunks are uploaded as multipart form data. Any endpoint that speaks the
//! same request/response shape can be configured instead of the public one.

use crate::audio::AudioChunk;
use crate::constants::recognition::CHUNK_FILE_NAME;
use crate::error::{Error, Result};
use crate::recognition::{RecognitionClient, TrackMatch};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for [`AuddClient`].
#[derive(Debug, Clone)]
pub struct AuddOptions {
    /// Endpoint URL.
    pub endpoint: String,
    /// API token sent with every request.
    pub api_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Base delay between retries, doubled on each attempt.
    pub retry_backoff: Duration,
}

/// Recognition client backed by the AudD HTTP API.
pub struct AuddClient {
    http: Client,
    options: AuddOptions,
}

/// Outcome of one failed HTTP attempt.
enum AttemptError {
    /// Worth another try (timeouts, connection resets, 5xx, 429).
    Transient(Error),
    /// Retrying will not help.
    Fatal(Error),
}

impl AuddClient {
    /// Build a client.
    pub fn new(options: AuddOptions) -> Result<Self> {
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::Internal {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { http, options })
    }

    /// Send one upload and return the response body.
    async fn send_once(&self, chunk: &AudioChunk) -> std::result::Result<String, AttemptError> {
        let file = Part::bytes(chunk.wav.clone())
            .file_name(CHUNK_FILE_NAME)
            .mime_str("audio/wav")
            .map_err(|e| AttemptError::Fatal(unavailable("invalid upload MIME type", e)))?;

        let form = Form::new()
            .text("api_token", self.options.api_token.clone())
            .part("file", file);

        let response = self
            .http
            .post(&self.options.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    AttemptError::Fatal(unavailable("invalid recognition request", e))
                } else {
                    AttemptError::Transient(unavailable("recognition request failed", e))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AttemptError::Transient(Error::recognition(format!(
                "recognition service returned HTTP {status}"
            ))));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(Error::recognition(format!(
                "recognition service returned HTTP {status}"
            ))));
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(unavailable("failed to read recognition response", e)))
    }
}

#[async_trait]
impl RecognitionClient for AuddClient {
    async fn recognize(&self, chunk: &AudioChunk) -> Result<Option<TrackMatch>> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(chunk).await {
                Ok(body) => {
                    let found = parse_response(&body)?;
                    debug!(
                        "Segment {} ({}-{} ms): {}",
                        chunk.index + 1,
                        chunk.window.start_ms,
                        chunk.window.end_ms,
                        found
                            .as_ref()
                            .map_or_else(|| "no match".to_string(), ToString::to_string)
                    );
                    return Ok(found);
                }
                Err(AttemptError::Transient(err)) if attempt < self.options.max_retries => {
                    let delay = self.options.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        "Segment {}: {} (retry {}/{} in {:?})",
                        chunk.index + 1,
                        err,
                        attempt,
                        self.options.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Transient(err) | AttemptError::Fatal(err)) => return Err(err),
            }
        }
    }
}

fn unavailable(reason: &str, source: reqwest::Error) -> Error {
    Error::RecognitionUnavailable {
        reason: reason.to_string(),
        source: Some(Box::new(source)),
    }
}

#[derive(Debug, Deserialize)]
struct AuddResponse {
    status: String,
    #[serde(default)]
    result: Option<AuddSong>,
    #[serde(default)]
    error: Option<AuddError>,
}

#[derive(Debug, Deserialize)]
struct AuddSong {
    artist: String,
    title: String,
    #[serde(default)]
    song_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuddError {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: String,
}

/// Map an AudD response body onto a match.
fn parse_response(body: &str) -> Result<Option<TrackMatch>> {
    let response: AuddResponse = serde_json::from_str(body).map_err(|e| Error::RecognitionUnavailable {
        reason: "unparsable recognition response".to_string(),
        source: Some(Box::new(e)),
    })?;

    if response.status != "success" {
        let detail = response.error.map_or_else(
            || format!("status '{}'", response.status),
            |e| format!("error {}: {}", e.error_code, e.error_message),
        );
        return Err(Error::recognition(format!("recognition service reported {detail}")));
    }

    Ok(response.result.map(|song| {
        let track_id = song
            .song_link
            .filter(|link| !link.trim().is_empty())
            .unwrap_or_else(|| fallback_track_id(&song.artist, &song.title));
        TrackMatch::new(track_id, song.artist, song.title)
    }))
}

/// Identifier for results without a song link: case- and spacing-insensitive
/// `artist - title`.
fn fallback_track_id(artist: &str, title: &str) -> String {
    format!("{artist} - {title}")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
