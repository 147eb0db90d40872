//! Error types for mixid.

/// Result type alias for mixid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for mixid.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// No recognition API token is configured.
    #[error(
        "no recognition API token configured (use --api-token, MIXID_API_TOKEN or recognition.api_token in config)"
    )]
    MissingApiToken,

    /// An argument is outside its valid range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// The source audio could not be obtained.
    #[error("failed to acquire audio from '{source_ref}': {reason}")]
    AcquisitionFailed {
        /// URL or path that was requested.
        source_ref: String,
        /// Description of the failure.
        reason: String,
    },

    /// Failed to open audio file.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to decode audio.
    #[error("failed to decode audio from '{path}'")]
    AudioDecode {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No audio tracks found.
    #[error("no audio tracks found in '{path}'")]
    NoAudioTracks {
        /// Path to the audio file.
        path: std::path::PathBuf,
    },

    /// Failed to resample audio.
    #[error("failed to resample audio: {reason}")]
    Resample {
        /// Description of the resampling failure.
        reason: String,
    },

    /// Failed to render a segment as WAV.
    #[error("failed to encode segment {index} as WAV")]
    ChunkEncode {
        /// Zero-based segment index.
        index: usize,
        /// Underlying WAV error.
        #[source]
        source: hound::Error,
    },

    /// The recognition service could not answer for one segment.
    #[error("recognition service unavailable: {reason}")]
    RecognitionUnavailable {
        /// Description of the failure.
        reason: String,
        /// Underlying transport error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A segment failed inside the identification pipeline.
    #[error("track identification failed at segment {segment} of {total}")]
    IdentificationFailed {
        /// One-based segment number.
        segment: usize,
        /// Total number of segments in the run.
        total: usize,
        /// The originating error.
        #[source]
        source: Box<Error>,
    },

    /// The run was cancelled before it finished.
    #[error("identification cancelled")]
    Cancelled,

    /// Video link lookup failed.
    #[error("video lookup failed for '{query}'")]
    Enrichment {
        /// Search query that failed.
        query: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write the track list.
    #[error("failed to write track list: {reason}")]
    OutputWrite {
        /// Description of the failure.
        reason: String,
    },

    /// Failed to write JSON output.
    #[error("failed to write JSON output")]
    JsonWrite {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to bind the web server.
    #[error("failed to bind web server to '{addr}'")]
    ServerBind {
        /// Address that could not be bound.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::RecognitionUnavailable`] without a source.
    pub fn recognition(reason: impl Into<String>) -> Self {
        Self::RecognitionUnavailable {
            reason: reason.into(),
            source: None,
        }
    }

    /// Whether this error is (or wraps) a recognition service failure.
    pub fn is_recognition_unavailable(&self) -> bool {
        match self {
            Self::RecognitionUnavailable { .. } => true,
            Self::IdentificationFailed { source, .. } => source.is_recognition_unavailable(),
            _ => false,
        }
    }

    /// Render the error with its full cause chain on one line.
    pub fn display_chain(&self) -> String {
        use std::error::Error as _;

        let mut message = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}
