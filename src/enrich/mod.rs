//! YouTube video links for identified tracks.

use crate::constants::enrichment::{TIMEOUT_SECS, YOUTUBE_SEARCH_URL, YOUTUBE_WATCH_URL};
use crate::error::{Error, Result};
use crate::recognition::TrackMatch;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A YouTube video for a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoLink {
    /// Watch URL.
    pub link: String,
    /// Video id.
    pub id: String,
}

impl VideoLink {
    fn from_id(id: String) -> Self {
        Self {
            link: format!("{YOUTUBE_WATCH_URL}{id}"),
            id,
        }
    }
}

/// Client for the YouTube Data API search endpoint.
pub struct YouTubeSearch {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl YouTubeSearch {
    /// Client for the public API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, YOUTUBE_SEARCH_URL)
    }

    /// Client for a search endpoint with the same request/response shape.
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Search for the first video matching `track`.
    pub async fn lookup(&self, track: &TrackMatch) -> Result<Option<VideoLink>> {
        let query = track.to_string();
        let enrichment_err = |e: reqwest::Error| Error::Enrichment {
            query: query.clone(),
            source: Box::new(e),
        };

        let response: SearchResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("part", "snippet"),
                ("q", query.as_str()),
                ("key", self.api_key.as_str()),
                ("maxResults", "1"),
                ("type", "video"),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(enrichment_err)?
            .json()
            .await
            .map_err(enrichment_err)?;

        Ok(response
            .items
            .into_iter()
            .find_map(|item| item.id.video_id)
            .map(VideoLink::from_id))
    }

    /// Look up every track in order; failed lookups yield `None`.
    pub async fn lookup_all<'a, I>(&self, tracks: I) -> Vec<Option<VideoLink>>
    where
        I: IntoIterator<Item = &'a TrackMatch>,
    {
        let mut links = Vec::new();
        for track in tracks {
            let link = match self.lookup(track).await {
                Ok(link) => {
                    if link.is_none() {
                        debug!("No video found for {}", track);
                    }
                    link
                }
                Err(e) => {
                    warn!("{}", e.display_chain());
                    None
                }
            };
            links.push(link);
        }
        links
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}
