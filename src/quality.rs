//! Data quality tags attached to measured values

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MeasError, Result};

/// Quality of a measured value: `good`, `bad` or `bad/<reason>`
///
/// The value is an immutable tagged string. The reason part is free-form but
/// must not contain whitespace, because qualities travel in
/// whitespace-delimited vectors on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataQuality(String);

const GOOD: &str = "good";
const BAD: &str = "bad";

impl DataQuality {
    /// A good quality tag
    pub fn good() -> Self {
        Self(GOOD.to_string())
    }

    /// A bad quality tag with no reason
    pub fn bad() -> Self {
        Self(BAD.to_string())
    }

    /// A bad quality tag with a reason, e.g. `bad/sensor_fault`
    ///
    /// The reason must be non-empty and free of whitespace.
    pub fn bad_with_reason<S: Into<String>>(reason: S) -> Result<Self> {
        let reason = reason.into();
        if reason.is_empty() || reason.chars().any(char::is_whitespace) {
            return Err(MeasError::InvalidQuality {
                value: format!("{BAD}/{reason}"),
            });
        }
        Ok(Self(format!("{BAD}/{reason}")))
    }

    /// Parse a quality tag from its wire form
    pub fn parse<S: Into<String>>(value: S) -> Result<Self> {
        let value = value.into();
        let valid = match value.as_str() {
            GOOD | BAD => true,
            other => {
                other
                    .strip_prefix("bad/")
                    .is_some_and(|r| !r.is_empty() && !r.chars().any(char::is_whitespace))
            }
        };
        if !valid {
            return Err(MeasError::InvalidQuality { value });
        }
        Ok(Self(value))
    }

    /// Whether this tag marks the value as usable
    pub fn is_good(&self) -> bool {
        self.0.starts_with(GOOD)
    }

    /// The raw tag string
    pub fn value(&self) -> &str {
        &self.0
    }

    /// The reason part of a `bad/<reason>` tag, if any
    pub fn reason(&self) -> Option<&str> {
        self.0.strip_prefix("bad/")
    }
}

impl Default for DataQuality {
    fn default() -> Self {
        Self::good()
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories() {
        assert!(DataQuality::good().is_good());
        assert!(!DataQuality::bad().is_good());
        assert_eq!(DataQuality::good().value(), "good");
        assert_eq!(DataQuality::bad().value(), "bad");
    }

    #[test]
    fn test_bad_with_reason() {
        let q = DataQuality::bad_with_reason("sensor_fault").unwrap();
        assert!(!q.is_good());
        assert_eq!(q.value(), "bad/sensor_fault");
        assert_eq!(q.reason(), Some("sensor_fault"));
    }

    #[test]
    fn test_reason_whitespace_rejected() {
        assert!(DataQuality::bad_with_reason("sensor fault").is_err());
        assert!(DataQuality::bad_with_reason("").is_err());
    }

    #[test]
    fn test_parse() {
        assert!(DataQuality::parse("good").unwrap().is_good());
        assert!(!DataQuality::parse("bad/drift").unwrap().is_good());
        assert!(DataQuality::parse("fine").is_err());
        assert!(DataQuality::parse("bad/").is_err());
        assert!(DataQuality::parse("bad/a b").is_err());
    }

    #[test]
    fn test_default_is_good() {
        assert!(DataQuality::default().is_good());
    }
}
