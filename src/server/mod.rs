//! HTTP API around the identification pipeline.
//!
//! One run at a time: `POST /identify` holds the run slot for the length of
//! the session and answers 409 while it is taken. Each run gets a fresh
//! [`ProgressReporter`] that becomes the one `/progress` reports on.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{IdentifyRequest, IdentifyResponse, TrackResult};

use crate::enrich::YouTubeSearch;
use crate::error::{Error, Result};
use crate::pipeline::{ProgressReporter, RunSettings};
use crate::recognition::RecognitionClient;
use axum::Router;
use axum::routing::{get, post};
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared state of the API.
#[derive(Clone)]
pub struct ServerState {
    settings: Arc<RunSettings>,
    client: Arc<dyn RecognitionClient>,
    enricher: Option<Arc<YouTubeSearch>>,
    run_slot: Arc<Mutex<()>>,
    current: Arc<RwLock<ProgressReporter>>,
    shutdown: CancellationToken,
}

impl ServerState {
    /// Build state; runs are cancelled when `shutdown` fires.
    pub fn new(
        settings: RunSettings,
        client: Arc<dyn RecognitionClient>,
        enricher: Option<YouTubeSearch>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            client,
            enricher: enricher.map(Arc::new),
            run_slot: Arc::new(Mutex::new(())),
            current: Arc::new(RwLock::new(ProgressReporter::new())),
            shutdown,
        }
    }

    /// Reporter of the latest run (idle before the first).
    pub fn current_reporter(&self) -> ProgressReporter {
        match self.current.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Install a fresh reporter for a new run and return it.
    fn start_run(&self) -> ProgressReporter {
        let reporter = ProgressReporter::new();
        match self.current.write() {
            Ok(mut current) => *current = reporter.clone(),
            Err(poisoned) => *poisoned.into_inner() = reporter.clone(),
        }
        reporter
    }
}

/// Routes of the API.
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/identify", post(handlers::identify))
        .route("/progress", get(handlers::progress))
        .route("/progress/stream", get(handlers::progress_stream))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve the API on `bind` until the state's shutdown token fires.
pub async fn serve(state: ServerState, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| Error::ServerBind {
            addr: bind.to_string(),
            source: e,
        })?;
    info!("Listening on http://{}", listener.local_addr()?);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::acquire::Downloader;
    use crate::audio::AudioChunk;
    use crate::pipeline::{FailurePolicy, IdentifyOptions, RunPhase};
    use crate::recognition::TrackMatch;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use futures_util::StreamExt;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use serde_json::Value;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Every segment is the same track.
    struct OneTrack;

    #[async_trait]
    impl RecognitionClient for OneTrack {
        async fn recognize(&self, _chunk: &AudioChunk) -> Result<Option<TrackMatch>> {
            Ok(Some(TrackMatch::new("id-1", "Bicep", "Glue")))
        }
    }

    fn state() -> ServerState {
        state_with_downloader("yt-dlp")
    }

    fn state_with_downloader(program: &str) -> ServerState {
        let settings = RunSettings {
            identify: IdentifyOptions {
                window_ms: 1_000,
                failure_policy: FailurePolicy::FailFast,
                concurrency: 1,
            },
            sample_rate: 8_000,
            downloader: Downloader {
                program: program.to_string(),
                audio_format: "mp3".to_string(),
            },
            fetch_links: false,
        };
        ServerState::new(settings, Arc::new(OneTrack), None, CancellationToken::new())
    }

    fn post_identify(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/identify")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn write_wav(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("set.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..16_000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    /// Stand-in for yt-dlp that "downloads" `audio` to the `-o` template.
    #[cfg(unix)]
    fn fake_downloader(dir: &TempDir, audio: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.path().join("fake-yt-dlp");
        let body = format!(
            r#"#!/bin/sh
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
dest="${{out%.*}}.wav"
cp '{}' "$dest" || exit 1
echo "$dest"
"#,
            audio.display()
        );
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    /// Read SSE frames until one complete event is buffered.
    async fn next_event<S>(body: &mut S) -> Option<String>
    where
        S: futures_util::Stream<Item = std::result::Result<axum::body::Bytes, axum::Error>> + Unpin,
    {
        let mut text = String::new();
        while !text.contains("\n\n") {
            let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
                .await
                .unwrap()?;
            text.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
        }
        Some(text)
    }

    #[tokio::test]
    async fn test_health() {
        let response = build_router(state()).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_progress_before_any_run_is_idle() {
        let response = build_router(state()).oneshot(get("/progress")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["phase"], "idle");
        assert_eq!(body["percent"], 0);
    }

    #[tokio::test]
    async fn test_identify_without_url() {
        let response = build_router(state())
            .oneshot(post_identify("{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No URL provided");
    }

    #[tokio::test]
    async fn test_identify_unsupported_url() {
        let app_state = state();
        let response = build_router(app_state.clone())
            .oneshot(post_identify(r#"{"url":"https://example.com/set"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("Unsupported URL"));
        // Rejected before a run starts
        assert_eq!(app_state.current_reporter().read().phase, RunPhase::Idle);
    }

    #[tokio::test]
    async fn test_identify_refuses_server_paths() {
        let dir = TempDir::new().unwrap();
        let existing = write_wav(&dir);

        let mut errors = Vec::new();
        for url in [
            existing.to_string_lossy().into_owned(),
            "/etc/passwd".to_string(),
            "/nonexistent/x".to_string(),
        ] {
            let body = serde_json::json!({ "url": url }).to_string();
            let response = build_router(state())
                .oneshot(post_identify(&body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{url}");
            let error = json_body(response).await["error"].as_str().unwrap().to_string();
            assert!(error.contains("Unsupported URL"), "{url}: {error}");
            errors.push(error.replace(&url, ""));
        }

        // Existing and missing paths are indistinguishable
        assert!(errors.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn test_identify_conflict_while_running() {
        let app_state = state();
        let _held = app_state.run_slot.clone().try_lock_owned().unwrap();
        let response = build_router(app_state.clone())
            .oneshot(post_identify(r#"{"url":"https://youtu.be/abc"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_identify_downloads_and_reports_progress() {
        let dir = TempDir::new().unwrap();
        let audio = write_wav(&dir);
        let downloader = fake_downloader(&dir, &audio);
        let app_state = state_with_downloader(&downloader.to_string_lossy());

        let response = build_router(app_state.clone())
            .oneshot(post_identify(r#"{"url":"https://soundcloud.com/dj/set"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["results"][0]["artist"], "Bicep");
        assert!(body["results"][0]["youtube_link"].is_null());

        let response = build_router(app_state.clone())
            .oneshot(get("/progress"))
            .await
            .unwrap();
        let progress = json_body(response).await;
        assert_eq!(progress["phase"], "complete");
        assert_eq!(progress["percent"], 100);
        assert_eq!(progress["total_segments"], 2);
        assert_eq!(progress["status_message"], "Complete");
    }

    #[tokio::test]
    async fn test_stream_follows_running_run_until_complete() {
        let app_state = state();
        let reporter = app_state.start_run();
        reporter.reset("Downloading audio...");

        let response = build_router(app_state)
            .oneshot(get("/progress/stream"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut body = response.into_body().into_data_stream();

        let first = next_event(&mut body).await.unwrap();
        assert!(first.contains("event: progress"));
        assert!(first.contains("\"phase\":\"running\""));
        assert!(first.contains("Downloading audio..."));

        reporter.advance(1, 2, "Processing segment 1 of 2");
        let second = next_event(&mut body).await.unwrap();
        assert!(second.contains("\"percent\":50"));
        assert!(second.contains("\"phase\":\"running\""));

        let driver = tokio::spawn(async move {
            reporter.advance(2, 2, "Processing segment 2 of 2");
            reporter.finish("Complete");
        });
        driver.await.unwrap();

        let last = next_event(&mut body).await.unwrap();
        assert!(last.contains("\"phase\":\"complete\""));
        assert!(last.contains("\"percent\":100"));

        // Nothing follows the terminal event
        assert!(next_event(&mut body).await.is_none());
    }

    #[tokio::test]
    async fn test_stream_ends_after_terminal_state() {
        let app_state = state();
        let reporter = app_state.start_run();
        reporter.reset("Working");
        reporter.finish("Complete");

        let response = build_router(app_state)
            .oneshot(get("/progress/stream"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("event: progress"));
        assert!(text.contains("\"phase\":\"complete\""));
    }
}
