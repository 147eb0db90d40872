//! CLI argument definitions.

use crate::cli::validators::{parse_concurrency, parse_window_secs};
use crate::config::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Identify the tracks played in a DJ mix or long recording.
#[derive(Debug, Parser)]
#[command(name = "mixid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// SoundCloud or YouTube link, or path to an audio file.
    pub input: Option<String>,

    /// Options for identification.
    #[command(flatten)]
    pub identify: IdentifyArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run the HTTP API.
    Serve {
        /// Address to listen on (default from config: 127.0.0.1:5000).
        #[arg(long, env = "MIXID_BIND")]
        bind: Option<String>,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for an identification run.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct IdentifyArgs {
    /// Segment window (seconds, or with s/m/h suffix).
    #[arg(short, long, value_parser = parse_window_secs, env = "MIXID_WINDOW")]
    pub window: Option<u64>,

    /// Skip segments whose recognition call fails instead of aborting.
    #[arg(long)]
    pub skip_failed: bool,

    /// Recognition calls kept in flight (1-8).
    #[arg(short = 'j', long, value_parser = parse_concurrency, env = "MIXID_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Output format.
    #[arg(short, long, value_enum, env = "MIXID_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the track list to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Look up a YouTube link for each track.
    #[arg(long)]
    pub links: bool,

    /// Recognition API token (overrides config).
    #[arg(long, env = "MIXID_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Recognition endpoint URL (overrides config).
    #[arg(long, env = "MIXID_ENDPOINT")]
    pub endpoint: Option<String>,

    /// YouTube Data API key for --links (overrides config).
    #[arg(long, env = "MIXID_YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    /// Suppress progress output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace, -vvv: trace including HTTP and codec internals).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}
