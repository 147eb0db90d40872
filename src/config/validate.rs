//! Configuration validation.

use crate::config::Config;
use crate::constants::{MAX_CONCURRENCY, sample_rate};
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_identify(config)?;
    validate_recognition(config)?;
    validate_server(config)?;
    Ok(())
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

/// Validate segmentation settings.
fn validate_identify(config: &Config) -> Result<()> {
    let identify = &config.identify;

    if identify.window_secs == 0 {
        return Err(invalid("window_secs must be at least 1"));
    }

    if !(1..=MAX_CONCURRENCY).contains(&identify.concurrency) {
        return Err(invalid(format!(
            "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
            identify.concurrency
        )));
    }

    if !(sample_rate::MIN..=sample_rate::MAX).contains(&identify.sample_rate) {
        return Err(invalid(format!(
            "sample_rate must be between {} and {} Hz, got {}",
            sample_rate::MIN,
            sample_rate::MAX,
            identify.sample_rate
        )));
    }

    Ok(())
}

/// Validate recognition service settings.
fn validate_recognition(config: &Config) -> Result<()> {
    let recognition = &config.recognition;

    let endpoint = reqwest::Url::parse(&recognition.endpoint)
        .map_err(|e| invalid(format!("endpoint '{}' is not a valid URL: {e}", recognition.endpoint)))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "endpoint must use http or https, got '{}'",
            endpoint.scheme()
        )));
    }

    if recognition.timeout_secs == 0 {
        return Err(invalid("timeout_secs must be at least 1"));
    }

    Ok(())
}

/// Validate the server bind address.
fn validate_server(config: &Config) -> Result<()> {
    config
        .server
        .bind
        .parse::<std::net::SocketAddr>()
        .map_err(|e| invalid(format!("bind '{}' is not a socket address: {e}", config.server.bind)))?;
    Ok(())
}
