//! Command-line value parsing shared by every subcommand.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;

use crate::watch::Backend;

/// Errors in user-supplied configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: &'static str },

    #[error("invalid bind address '{value}': {reason}")]
    InvalidBindAddress { value: String, reason: String },
}

const NANOS_PER_UNIT: &[(&str, u64)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

/// Parse a duration such as `300ms`, `1.5s` or `1h2m3s`.
///
/// Every component needs a unit, with the exception of a bare `0`.
/// Negative durations are rejected.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason,
    };

    let mut rest = value.trim();
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if rest.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }

    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(invalid("expected a number"));
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| u128::from(*scale))
            .ok_or_else(|| invalid("unknown unit"))?;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("number out of range"))?
        };
        total = whole
            .checked_mul(scale)
            .and_then(|nanos| total.checked_add(nanos))
            .ok_or_else(|| invalid("number out of range"))?;

        if !fraction.is_empty() {
            let digits = fraction.len().min(18);
            let numerator: u128 = fraction[..digits]
                .parse()
                .map_err(|_| invalid("expected a number"))?;
            total = total
                .checked_add(numerator * scale / 10u128.pow(digits as u32))
                .ok_or_else(|| invalid("number out of range"))?;
        }

        rest = tail;
    }

    let nanos = u64::try_from(total).map_err(|_| invalid("number out of range"))?;
    Ok(Duration::from_nanos(nanos))
}

/// Parse a listen address. A leading `:` means every interface
/// (`:8088` is `0.0.0.0:8088`); host names are resolved.
pub fn parse_bind_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    let candidate = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => value.to_string(),
    };

    let invalid = |reason: String| ConfigError::InvalidBindAddress {
        value: value.to_string(),
        reason,
    };

    candidate
        .to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("address did not resolve".to_string()))
}

/// How a watch session observes files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchConfig {
    /// Polling interval. `None` selects native file-system notifications.
    pub interval: Option<Duration>,
}

impl WatchConfig {
    /// Build from the optional `--watch-interval` flag value.
    ///
    /// A zero interval is rejected: the poller would rescan without pause.
    pub fn from_flag(interval: Option<&str>) -> Result<Self, ConfigError> {
        let interval = interval
            .map(|value| match parse_duration(value)? {
                Duration::ZERO => Err(ConfigError::InvalidDuration {
                    value: value.to_string(),
                    reason: "polling interval must be greater than zero",
                }),
                interval => Ok(interval),
            })
            .transpose()?;
        Ok(Self { interval })
    }

    /// The watcher backend for this session.
    pub fn backend(&self) -> Backend {
        match self.interval {
            Some(interval) => Backend::Poll(interval),
            None => Backend::Native,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("250µs").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_duration_compound_and_fractional() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("+10ms").unwrap(), Duration::from_millis(10));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_invalid() {
        for value in ["", "10", "-1s", "1x", "s", "1..5s", "ms10", "."] {
            assert!(
                matches!(
                    parse_duration(value),
                    Err(ConfigError::InvalidDuration { .. })
                ),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert!(parse_duration("9999999999999999h").is_err());
        // The whole part fits; adding the fraction does not.
        assert!(matches!(
            parse_duration("94522879700260684295381835.9h"),
            Err(ConfigError::InvalidDuration { reason: "number out of range", .. })
        ));
    }

    #[test]
    fn test_parse_bind_addr() {
        assert_eq!(
            parse_bind_addr(":8088").unwrap(),
            "0.0.0.0:8088".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("127.0.0.1:9000").unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_bind_addr("localhost:8087").is_ok());
        assert!(matches!(
            parse_bind_addr("not an address"),
            Err(ConfigError::InvalidBindAddress { .. })
        ));
        assert!(parse_bind_addr(":99999").is_err());
    }

    #[test]
    fn test_watch_config_selects_backend() {
        let native = WatchConfig::from_flag(None).unwrap();
        assert_eq!(native.backend(), Backend::Native);

        let polling = WatchConfig::from_flag(Some("200ms")).unwrap();
        assert_eq!(polling.backend(), Backend::Poll(Duration::from_millis(200)));

        assert!(WatchConfig::from_flag(Some("soon")).is_err());
    }

    #[test]
    fn test_watch_config_rejects_zero_interval() {
        for value in ["0", "0s", "0ms", "0.0h"] {
            let err = WatchConfig::from_flag(Some(value)).unwrap_err();
            assert!(err.to_string().contains("greater than zero"), "{value}: {err}");
        }
        assert!(WatchConfig::from_flag(Some("1ns")).is_ok());
    }
}
