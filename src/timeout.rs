/// `--timeout` grammar: `<n>s` seconds, `<n>m` minutes, bare `<n>` minutes.
use std::time::Duration;

/// The timeout used when neither the CLI nor the config file sets one.
pub const DEFAULT_TIMEOUT: &str = "20m";

/// A timeout specification that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutError {
    InvalidTimeout { input: String, reason: String },
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutError::InvalidTimeout { input, reason } => {
                write!(f, "invalid timeout {:?}: {}", input, reason)
            }
        }
    }
}

impl std::error::Error for TimeoutError {}

/// Parse a timeout specification into a duration.
///
/// A trailing `s`/`S` means seconds and a trailing `m`/`M` means minutes.
/// Without a suffix the whole string is a count of minutes.
pub fn parse_timeout(input: &str) -> Result<Duration, TimeoutError> {
    let invalid = |reason: String| TimeoutError::InvalidTimeout {
        input: input.to_string(),
        reason,
    };

    let (count, secs_per_unit) = match input.chars().last() {
        None => return Err(invalid("timeout is empty".to_string())),
        Some('s' | 'S') => (&input[..input.len() - 1], 1u64),
        Some('m' | 'M') => (&input[..input.len() - 1], 60u64),
        Some(_) => (input, 60u64),
    };

    if count.is_empty() {
        return Err(invalid("missing count before unit".to_string()));
    }

    let count: u64 = count
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;

    let secs = count
        .checked_mul(secs_per_unit)
        .ok_or_else(|| invalid("timeout is too large".to_string()))?;

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_suffix() {
        assert_eq!(parse_timeout("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_timeout("90S").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_minutes_suffix() {
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_timeout("20M").unwrap(), Duration::from_secs(1200));
    }

    #[test]
    fn test_bare_number_is_minutes() {
        assert_eq!(parse_timeout("1").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_timeout("20").unwrap(), Duration::from_secs(1200));
    }

    #[test]
    fn test_zero_is_valid() {
        assert_eq!(parse_timeout("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_timeout("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_timeout("0m").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_default_parses() {
        assert_eq!(
            parse_timeout(DEFAULT_TIMEOUT).unwrap(),
            Duration::from_secs(20 * 60)
        );
    }

    #[test]
    fn test_empty_string_rejected() {
        let err = parse_timeout("").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_unit_without_count_rejected() {
        assert!(parse_timeout("s").is_err());
        assert!(parse_timeout("m").is_err());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = parse_timeout("yourmom").unwrap_err();
        assert!(matches!(err, TimeoutError::InvalidTimeout { ref input, .. } if input == "yourmom"));
        assert!(parse_timeout("1.5m").is_err());
        assert!(parse_timeout("10h").is_err());
        assert!(parse_timeout(" 5m").is_err());
    }

    #[test]
    fn test_negative_rejected() {
        assert!(parse_timeout("-5").is_err());
        assert!(parse_timeout("-5s").is_err());
    }

    #[test]
    fn test_overflow_rejected() {
        let max = u64::MAX.to_string();
        assert_eq!(
            parse_timeout(&format!("{max}s")).unwrap(),
            Duration::from_secs(u64::MAX)
        );
        let err = parse_timeout(&format!("{max}m")).unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert!(parse_timeout("99999999999999999999999s").is_err());
    }

    #[test]
    fn test_multibyte_suffix_does_not_panic() {
        assert!(parse_timeout("5é").is_err());
    }
}
