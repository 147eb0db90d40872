//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use crate::constants::MAX_CONCURRENCY;

/// Parse a window length in seconds.
///
/// Accepts plain seconds (`90`), or a value with an `s`, `m` or `h` suffix
/// (`90s`, `2m`, `1h`).
pub fn parse_window_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, scale) = match s.char_indices().last() {
        Some((i, 's')) => (&s[..i], 1),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 'h')) => (&s[..i], 3600),
        _ => (s, 1),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("'{s}' is not a valid duration"))?;
    let secs = value
        .checked_mul(scale)
        .ok_or_else(|| format!("'{s}' is too long"))?;

    if secs == 0 {
        return Err("window must be at least 1 second".to_string());
    }

    Ok(secs)
}

/// Parse and validate the number of recognition calls in flight.
pub fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(1..=MAX_CONCURRENCY).contains(&value) {
        return Err(format!(
            "concurrency must be between 1 and {MAX_CONCURRENCY}, got {value}"
        ));
    }

    Ok(value)
}
