//! Recognition service boundary.
//!
//! The pipeline only sees [`RecognitionClient`]; fingerprinting happens on
//! the other side of it.

mod audd;

pub use audd::{AuddClient, AuddOptions};

use crate::audio::AudioChunk;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable identifier of a musical work, the deduplication key of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Wrap a service-provided identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A track recognised in one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMatch {
    /// Deduplication key.
    pub track_id: TrackId,
    /// Performing artist.
    pub artist: String,
    /// Track title.
    pub title: String,
}

impl TrackMatch {
    /// Build a match.
    pub fn new(track_id: impl Into<String>, artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            track_id: TrackId::new(track_id),
            artist: artist.into(),
            title: title.into(),
        }
    }
}

impl fmt::Display for TrackMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// A service that names the song playing in a chunk.
///
/// `Ok(None)` means the service answered and found nothing; transport and
/// service failures are `Err(Error::RecognitionUnavailable)`. Calls are
/// independent and may take seconds.
#[async_trait]
pub trait RecognitionClient: Send + Sync {
    /// Recognise one chunk.
    async fn recognize(&self, chunk: &AudioChunk) -> Result<Option<TrackMatch>>;
}

#[async_trait]
impl<T: RecognitionClient + ?Sized> RecognitionClient for Arc<T> {
    async fn recognize(&self, chunk: &AudioChunk) -> Result<Option<TrackMatch>> {
        (**self).recognize(chunk).await
    }
}
