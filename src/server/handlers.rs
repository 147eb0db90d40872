//! Route handlers.

use crate::acquire::Source;
use crate::constants::server::KEEP_ALIVE_SECS;
use crate::pipeline::{ProgressState, RunPhase, run_session};
use crate::server::{ApiError, ServerState};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{info, warn};

/// Body of `POST /identify`.
#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    /// Link to analyze.
    #[serde(default)]
    pub url: String,
}

/// One track in an identify response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackResult {
    /// Performing artist.
    pub artist: String,
    /// Track title.
    pub title: String,
    /// YouTube watch URL, if one was found.
    pub youtube_link: Option<String>,
    /// YouTube video id, if one was found.
    pub youtube_id: Option<String>,
}

/// Body of a successful `POST /identify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentifyResponse {
    /// Tracks in first-seen order.
    pub results: Vec<TrackResult>,
}

/// POST /identify - run a full identification and return the track list.
pub async fn identify(
    State(state): State<ServerState>,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<Json<IdentifyResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("No URL provided".to_string()));
    }
    // Links only: request text must never name a file on this host
    let source = Source::parse_url(url).map_err(|e| ApiError::BadRequest(e.display_chain()))?;

    let slot = state
        .run_slot
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::Conflict("An identification is already running".to_string()))?;

    let reporter = state.start_run();
    let cancel = state.shutdown.child_token();
    let settings = state.settings.clone();
    let client = state.client.clone();
    let enricher = state.enricher.clone();

    info!("Identify request for {}", source.describe());

    // The run owns the slot; a client hanging up does not abort it
    let run = tokio::spawn(async move {
        let _slot = slot;
        run_session(
            source,
            &settings,
            client.as_ref(),
            enricher.as_deref(),
            &reporter,
            &cancel,
        )
        .await
    });

    let report = run
        .await
        .map_err(|e| ApiError::Internal(format!("identification task failed: {e}")))?
        .map_err(|e| {
            warn!("Identification failed: {}", e.display_chain());
            ApiError::BadRequest(e.display_chain())
        })?;

    let results = report
        .result
        .matches()
        .zip(report.links.iter())
        .map(|(track, link)| TrackResult {
            artist: track.artist.clone(),
            title: track.title.clone(),
            youtube_link: link.as_ref().map(|l| l.link.clone()),
            youtube_id: link.as_ref().map(|l| l.id.clone()),
        })
        .collect();

    Ok(Json(IdentifyResponse { results }))
}

/// GET /progress - snapshot of the current run.
pub async fn progress(State(state): State<ServerState>) -> Json<ProgressState> {
    Json(state.current_reporter().read())
}

/// GET /progress/stream - progress updates as server-sent events.
///
/// Sends the current state immediately and every change after it. The
/// stream ends once the run is no longer running.
pub async fn progress_stream(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let updates = state.current_reporter().subscribe();

    let events = stream::unfold(Some((updates, true)), |cursor| async move {
        let (mut updates, first) = cursor?;
        if !first && updates.changed().await.is_err() {
            return None;
        }

        let snapshot = updates.borrow_and_update().clone();
        let more = snapshot.phase == RunPhase::Running;
        let event = Event::default()
            .event("progress")
            .json_data(&snapshot)
            .unwrap_or_else(|e| Event::default().comment(format!("serialization failed: {e}")));

        Some((Ok::<_, Infallible>(event), more.then_some((updates, false))))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECS)))
}

/// GET /health - liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
