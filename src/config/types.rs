//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_UPLOAD_SAMPLE_RATE, DEFAULT_WINDOW_SECS, acquisition,
    recognition, server,
};
use crate::pipeline::FailurePolicy;
use serde::{Deserialize, Serialize};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Segmentation and identification settings.
    pub identify: IdentifyConfig,

    /// Recognition service settings.
    pub recognition: RecognitionConfig,

    /// Download settings for remote sources.
    pub acquisition: AcquisitionConfig,

    /// Video link lookup settings.
    pub enrichment: EnrichmentConfig,

    /// Web server settings.
    pub server: ServerConfig,

    /// Output settings.
    pub output: OutputConfig,
}

/// Segmentation and identification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyConfig {
    /// Segment window in seconds.
    pub window_secs: u64,

    /// Reaction to a failed recognition call.
    pub failure_policy: FailurePolicy,

    /// Recognition calls kept in flight.
    pub concurrency: usize,

    /// Sample rate of uploaded chunks in Hz.
    pub sample_rate: u32,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            failure_policy: FailurePolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            sample_rate: DEFAULT_UPLOAD_SAMPLE_RATE,
        }
    }
}

/// Recognition service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Endpoint URL.
    pub endpoint: String,

    /// API token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Base delay between retries in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: recognition::DEFAULT_ENDPOINT.to_string(),
            api_token: None,
            timeout_secs: recognition::DEFAULT_TIMEOUT_SECS,
            max_retries: recognition::DEFAULT_MAX_RETRIES,
            retry_backoff_ms: recognition::DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

/// Download settings for remote sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Downloader program (yt-dlp compatible).
    pub downloader: String,

    /// Audio format requested from the downloader.
    pub audio_format: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            downloader: acquisition::DEFAULT_DOWNLOADER.to_string(),
            audio_format: acquisition::DEFAULT_AUDIO_FORMAT.to_string(),
        }
    }
}

/// Video link lookup settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// YouTube Data API key; lookups are disabled without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_api_key: Option<String>,
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: server::DEFAULT_BIND.to_string(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `Artist - Title` line per track.
    #[default]
    Text,
    /// A single JSON document.
    Json,
    /// CSV with a header row.
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().ok(), Some(OutputFormat::Text));
        assert_eq!("TXT".parse::<OutputFormat>().ok(), Some(OutputFormat::Text));
        assert_eq!("json".parse::<OutputFormat>().ok(), Some(OutputFormat::Json));
        assert_eq!("csv".parse::<OutputFormat>().ok(), Some(OutputFormat::Csv));
        assert!("raven".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.identify.window_secs, 120);
        assert_eq!(config.identify.concurrency, 1);
        assert_eq!(config.identify.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.recognition.endpoint, "https://api.audd.io/");
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert!(config.recognition.api_token.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[identify]
window_secs = 60
failure_policy = "skip-segment"
"#,
        )
        .unwrap();
        assert_eq!(config.identify.window_secs, 60);
        assert_eq!(config.identify.failure_policy, FailurePolicy::SkipSegment);
        assert_eq!(config.identify.sample_rate, 22_050);
        assert_eq!(config.acquisition.downloader, "yt-dlp");
    }
}
