//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "mixid";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "MIXID_CONFIG";

/// Configuration file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default segment window in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 120;

/// Default number of recognition calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Upper bound for recognition calls in flight.
///
/// Recognition services rate-limit aggressively; more parallel uploads
/// mostly buy HTTP 429 responses.
pub const MAX_CONCURRENCY: usize = 8;

/// Default sample rate of the WAV chunks sent for recognition.
pub const DEFAULT_UPLOAD_SAMPLE_RATE: u32 = 22_050;

/// Accepted range for the upload sample rate.
pub mod sample_rate {
    /// Lowest accepted upload sample rate in Hz.
    pub const MIN: u32 = 8_000;
    /// Highest accepted upload sample rate in Hz.
    pub const MAX: u32 = 48_000;
}

/// Recognition service defaults.
pub mod recognition {
    /// Default recognition endpoint (AudD).
    pub const DEFAULT_ENDPOINT: &str = "https://api.audd.io/";
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default number of retries after the first attempt.
    pub const DEFAULT_MAX_RETRIES: u32 = 2;
    /// Default base delay between retries in milliseconds.
    pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
    /// File name attached to uploaded chunks.
    pub const CHUNK_FILE_NAME: &str = "segment.wav";
}

/// Media acquisition defaults.
pub mod acquisition {
    /// Default downloader program.
    pub const DEFAULT_DOWNLOADER: &str = "yt-dlp";
    /// Default audio format requested from the downloader.
    pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";
    /// Output file stem inside the download directory.
    pub const DOWNLOAD_STEM: &str = "source";
    /// Message for links that are neither SoundCloud nor YouTube.
    pub const UNSUPPORTED_URL: &str =
        "Unsupported URL. Please provide a SoundCloud or YouTube link.";
}

/// YouTube lookup constants.
pub mod enrichment {
    /// YouTube Data API search endpoint.
    pub const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
    /// Watch URL prefix for video ids.
    pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";
    /// Timeout for a single lookup in seconds.
    pub const TIMEOUT_SECS: u64 = 10;
}

/// Web server defaults.
pub mod server {
    /// Default bind address.
    pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
    /// SSE keep-alive interval in seconds.
    pub const KEEP_ALIVE_SECS: u64 = 15;
}

/// Status messages shown while a run progresses.
pub mod status {
    /// Reporter state before any run.
    pub const IDLE: &str = "Idle";
    /// Shown while the source is downloaded.
    pub const DOWNLOADING: &str = "Downloading audio...";
    /// Shown while the source is decoded.
    pub const DECODING: &str = "Decoding audio...";
    /// Shown when segmentation starts.
    pub const IDENTIFYING: &str = "Starting track identification...";
    /// Shown while video links are fetched.
    pub const FETCHING_LINKS: &str = "Fetching YouTube links...";
    /// Terminal success status.
    pub const COMPLETE: &str = "Complete";
    /// Terminal cancellation status.
    pub const CANCELLED: &str = "Cancelled";
}
