//! Help message display for CLI.

#![allow(clippy::print_stdout)]

use crate::config::Config;

/// Whether a recognition token is available from config or environment.
fn has_api_token(config: &Config) -> bool {
    config
        .recognition
        .api_token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty())
}

/// Print help message based on configuration state.
pub fn print_smart_help(config: &Config) {
    if has_api_token(config) {
        print_configured_help();
    } else {
        print_first_time_help();
    }
}

/// Print setup guide for first-time users.
pub fn print_first_time_help() {
    println!("No recognition API token configured. Get started with mixid:");
    println!();
    println!("1. Get an API token from https://audd.io/ (or any service with the same API).");
    println!();
    println!("2. Initialize configuration and add the token under [recognition]:");
    println!("   mixid config init");
    println!("   api_token = \"<your token>\"");
    println!();
    println!("   Or pass it per run: --api-token <TOKEN> / MIXID_API_TOKEN");
    println!();
    println!("3. Install yt-dlp to analyze SoundCloud and YouTube links.");
    println!();
    println!("4. Identify a mix:");
    println!("   mixid https://soundcloud.com/<artist>/<set>");
    println!("   mixid recording.mp3");
    println!();
    println!("Run 'mixid -h' for all options.");
}

/// Print brief usage reminder for configured users.
pub fn print_configured_help() {
    println!("Usage: mixid <INPUT> [OPTIONS]");
    println!();
    println!("Example: mixid https://www.youtube.com/watch?v=<id> -w 90 --links");
    println!();
    println!("Run 'mixid -h' for all options or 'mixid serve' to start the web API.");
}
