//! mixid - identify the tracks played in a DJ mix.
//!
//! The mix is cut into fixed windows, each window is sent to a music
//! recognition service, and the first occurrence of every distinct track is
//! kept in order. Runs are driven from the command line or the HTTP API.

#![warn(missing_docs)]

pub mod acquire;
pub mod audio;
pub mod cli;
pub mod config;
pub mod constants;
pub mod enrich;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod recognition;
pub mod server;

use acquire::{Downloader, Source};
use clap::Parser;
use cli::{Cli, Command, IdentifyArgs};
use config::{Config, config_file_path, load_default_config, save_default_config, validate_config};
use enrich::YouTubeSearch;
use pipeline::{FailurePolicy, IdentifyOptions, ProgressReporter, RunSettings, run_session};
use recognition::{AuddClient, AuddOptions};
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use error::{Error, Result};

/// Main entry point for the mixid CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.identify.verbose, cli.identify.quiet);

    // Load configuration
    let mut config = load_default_config()?;

    if let Some(Command::Config { action }) = cli.command {
        return handle_config_command(action);
    }

    apply_overrides(&mut config, &cli.identify);
    validate_config(&config)?;

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone());

    if let Some(Command::Serve { bind }) = cli.command {
        let bind = bind.unwrap_or_else(|| config.server.bind.clone());
        return serve_api(&config, &bind, cancel);
    }

    // Show help if no input provided
    let Some(input) = cli.input.as_deref() else {
        cli::help::print_smart_help(&config);
        return Ok(());
    };

    identify_input(input, &cli.identify, &config, &cancel)
}

/// Fold command-line overrides into the loaded configuration.
fn apply_overrides(config: &mut Config, args: &IdentifyArgs) {
    if let Some(window) = args.window {
        config.identify.window_secs = window;
    }
    if args.skip_failed {
        config.identify.failure_policy = FailurePolicy::SkipSegment;
    }
    if let Some(concurrency) = args.concurrency {
        config.identify.concurrency = concurrency;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(token) = &args.api_token {
        config.recognition.api_token = Some(token.clone());
    }
    if let Some(endpoint) = &args.endpoint {
        config.recognition.endpoint.clone_from(endpoint);
    }
    if let Some(key) = &args.youtube_api_key {
        config.enrichment.youtube_api_key = Some(key.clone());
    }
}

/// Run settings derived from validated configuration.
fn run_settings(config: &Config, fetch_links: bool) -> RunSettings {
    RunSettings {
        identify: IdentifyOptions {
            window_ms: config.identify.window_secs.saturating_mul(1000),
            failure_policy: config.identify.failure_policy,
            concurrency: config.identify.concurrency,
        },
        sample_rate: config.identify.sample_rate,
        downloader: Downloader {
            program: config.acquisition.downloader.clone(),
            audio_format: config.acquisition.audio_format.clone(),
        },
        fetch_links,
    }
}

/// Recognition client for the configured service.
fn recognition_client(config: &Config) -> Result<AuddClient> {
    let token = config
        .recognition
        .api_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Error::MissingApiToken)?;

    AuddClient::new(AuddOptions {
        endpoint: config.recognition.endpoint.clone(),
        api_token: token.to_string(),
        timeout: Duration::from_secs(config.recognition.timeout_secs),
        max_retries: config.recognition.max_retries,
        retry_backoff: Duration::from_millis(config.recognition.retry_backoff_ms),
    })
}

/// YouTube client, if a key is configured.
fn youtube_search(config: &Config) -> Result<Option<YouTubeSearch>> {
    config
        .enrichment
        .youtube_api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(YouTubeSearch::new)
        .transpose()
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })
}

/// Identify one input and write the track list.
fn identify_input(
    input: &str,
    args: &IdentifyArgs,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    use crate::output::progress::spawn_progress_bar;

    let source = Source::parse(input)?;
    let client = recognition_client(config)?;
    let enricher = if args.links {
        let search = youtube_search(config)?;
        if search.is_none() {
            warn!("--links needs a YouTube API key (--youtube-api-key or enrichment.youtube_api_key); skipping links");
        }
        search
    } else {
        None
    };
    let settings = run_settings(config, enricher.is_some());
    let progress_enabled = !args.quiet && !args.no_progress;

    let report = runtime()?.block_on(async {
        let reporter = ProgressReporter::new();
        let bar = spawn_progress_bar(&reporter, progress_enabled);

        let outcome = run_session(
            source,
            &settings,
            &client,
            enricher.as_ref(),
            &reporter,
            cancel,
        )
        .await;

        if let Some(bar) = bar
            && let Err(e) = bar.await
        {
            debug!("Progress bar task ended abnormally: {e}");
        }
        outcome
    })?;

    if !report.result.failed_segments.is_empty() {
        warn!(
            "{} of {} segment(s) could not be recognised",
            report.result.failed_segments.len(),
            report.result.total_segments
        );
    }

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    };
    output::write_report(&report, config.output.format, out)?;

    if let Some(path) = &args.output {
        info!(
            "Wrote {} track(s) to {}",
            report.result.len(),
            path.display()
        );
    }

    Ok(())
}

/// Run the HTTP API until interrupted.
fn serve_api(config: &Config, bind: &str, cancel: CancellationToken) -> Result<()> {
    let client = recognition_client(config)?;
    let enricher = youtube_search(config)?;
    if enricher.is_none() {
        info!("No YouTube API key configured; responses will not include links");
    }

    let settings = run_settings(config, enricher.is_some());
    let state = server::ServerState::new(settings, Arc::new(client), enricher, cancel);

    runtime()?.block_on(server::serve(state, bind))
}

/// Cancel `cancel` on the first Ctrl+C; exit on the second.
fn install_interrupt_handler(cancel: CancellationToken) {
    let interrupted = AtomicBool::new(false);
    if let Err(e) = ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            std::process::exit(130); // 128 + SIGINT(2)
        }
        warn!("Interrupted, stopping (press Ctrl+C again to exit immediately)");
        cancel.cancel();
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // Codec and HTTP internals stay quiet until -vvv.
    let filter_str = if quiet {
        "warn".to_string()
    } else {
        match verbose {
            0 => "info,symphonia=warn,hyper=warn,hyper_util=warn,reqwest=warn".to_string(),
            1 => "debug,symphonia=warn,hyper=info,hyper_util=info,reqwest=info".to_string(),
            2 => "trace,symphonia=info,hyper=info,hyper_util=info,reqwest=debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: cli::ConfigAction) -> Result<()> {
    use cli::ConfigAction;

    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let saved_path = save_default_config(&Config::default())?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!("  Add your recognition token under [recognition] as api_token = \"...\"");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let mut config = load_default_config()?;
            for secret in [
                &mut config.recognition.api_token,
                &mut config.enrichment.youtube_api_key,
            ] {
                if secret.is_some() {
                    *secret = Some("********".to_string());
                }
            }
            let rendered =
                toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{rendered}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
