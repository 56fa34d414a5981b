//! Run parameters and their validation.

use thiserror::Error;

/// Smallest accepted attempt count.
pub const MIN_ATTEMPTS: u32 = 1;

/// Largest accepted attempt count.
pub const MAX_ATTEMPTS: u32 = 20;

/// Rejected run parameters. No run is started when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("attempt count '{0}' is not a whole number")]
    NotNumeric(String),

    #[error("attempt count {0} must be between 1 and 20")]
    OutOfRange(i64),
}

/// Validated, immutable parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParameters {
    host: String,
    attempt_count: u32,
}

impl RunParameters {
    /// Validate an already-numeric attempt count.
    pub fn new(host: &str, attempt_count: i64) -> Result<Self, ValidationError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        let attempt_count = u32::try_from(attempt_count)
            .ok()
            .filter(|n| (MIN_ATTEMPTS..=MAX_ATTEMPTS).contains(n))
            .ok_or(ValidationError::OutOfRange(attempt_count))?;

        Ok(Self {
            host: host.to_string(),
            attempt_count,
        })
    }

    /// Parse both values from raw user input.
    pub fn parse(host: &str, attempts: &str) -> Result<Self, ValidationError> {
        let raw = attempts.trim();
        let attempt_count = raw
            .parse::<i64>()
            .map_err(|_| ValidationError::NotNumeric(raw.to_string()))?;
        Self::new(host, attempt_count)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let params = RunParameters::parse("  localhost ", " 5 ").unwrap();
        assert_eq!(params.host(), "localhost");
        assert_eq!(params.attempt_count(), 5);
    }

    #[test]
    fn test_bounds_inclusive() {
        assert_eq!(RunParameters::new("h", 1).unwrap().attempt_count(), 1);
        assert_eq!(RunParameters::new("h", 20).unwrap().attempt_count(), 20);
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            RunParameters::new("h", 0).unwrap_err(),
            ValidationError::OutOfRange(0)
        );
        assert_eq!(
            RunParameters::new("h", 21).unwrap_err(),
            ValidationError::OutOfRange(21)
        );
        assert_eq!(
            RunParameters::parse("h", "-3").unwrap_err(),
            ValidationError::OutOfRange(-3)
        );
    }

    #[test]
    fn test_not_numeric() {
        for raw in ["abc", "", "3.5", "99999999999999999999999"] {
            assert!(
                matches!(
                    RunParameters::parse("h", raw),
                    Err(ValidationError::NotNumeric(_))
                ),
                "expected NotNumeric for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_empty_host() {
        assert_eq!(
            RunParameters::parse("   ", "3").unwrap_err(),
            ValidationError::EmptyHost
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::OutOfRange(21).to_string(),
            "attempt count 21 must be between 1 and 20"
        );
        assert!(ValidationError::NotNumeric("x".into())
            .to_string()
            .contains("'x'"));
    }
}
