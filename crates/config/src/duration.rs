//! Human-readable durations: `10s`, `1h`, `1h30m`, `250ms`.

use crate::error::{ErrorKind, Result};
use std::time::Duration;

/// Parses a sequence of `<integer><unit>` pairs, where unit is one of `h`,
/// `m`, `s` or `ms`. A bare integer is read as seconds.
///
/// ```
/// use std::time::Duration;
/// use shelf_config::parse_duration;
/// assert_eq!(parse_duration("interval", "1h30m").unwrap(), Duration::from_secs(5400));
/// assert_eq!(parse_duration("interval", "3600").unwrap(), Duration::from_secs(3600));
/// assert!(parse_duration("interval", "soon").is_err());
/// ```
pub fn parse_duration(field: &'static str, raw: &str) -> Result<Duration> {
    let invalid = || ErrorKind::Invalid {
        field,
        value: raw.to_string(),
    };
    let input = raw.trim();
    if input.is_empty() {
        exn::bail!(invalid());
    }
    if let Ok(seconds) = input.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            exn::bail!(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];
        let unit_length = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = match &rest[..unit_length] {
            "h" => Duration::from_secs(3600),
            "m" => Duration::from_secs(60),
            "s" => Duration::from_secs(1),
            "ms" => Duration::from_millis(1),
            _ => exn::bail!(invalid()),
        };
        rest = &rest[unit_length..];
        let part = u32::try_from(value).ok().and_then(|v| unit.checked_mul(v)).ok_or_else(invalid)?;
        total = total.checked_add(part).ok_or_else(invalid)?;
    }
    Ok(total)
}
