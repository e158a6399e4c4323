//! Millisecond conversions between the wire format and [`Duration`].
//!
//! Timing endpoints speak integer milliseconds; everything in memory uses
//! [`Duration`]. Conversions saturate instead of truncating.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Extension trait for saturating Duration conversions.
pub trait DurationExt {
    /// Convert to whole milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;

    /// Convert a float second count (as reported by media elements) into a
    /// duration, treating negative and non-finite values as zero.
    fn from_secs_lossy(secs: f64) -> Duration;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn from_secs_lossy(secs: f64) -> Duration {
        if secs.is_finite() && secs > 0.0 {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

/// Serde adapter for `Duration` fields encoded as integer milliseconds.
///
/// Fractional values are accepted and rounded down; negative values clamp to zero.
pub mod millis {
    use super::{Deserialize, Deserializer, Duration, DurationExt, Serializer};

    /// Serialize a duration as integer milliseconds.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if writing fails.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis_u64())
    }

    /// Deserialize integer or float milliseconds into a duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a number.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Millis {
            Int(u64),
            Float(f64),
        }

        Ok(match Millis::deserialize(deserializer)? {
            Millis::Int(ms) => Duration::from_millis(ms),
            Millis::Float(ms) if ms.is_finite() && ms > 0.0 => {
                // `as` saturates; the value is already floored and positive
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let ms = ms.floor() as u64;
                Duration::from_millis(ms)
            }
            Millis::Float(_) => Duration::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Window {
        #[serde(with = "millis")]
        start_time: Duration,
    }

    #[test]
    fn test_as_millis_u64() {
        assert_eq!(Duration::from_millis(1234).as_millis_u64(), 1234);
        assert_eq!(Duration::ZERO.as_millis_u64(), 0);
    }

    #[test]
    fn test_from_secs_lossy_clamps_bad_input() {
        assert_eq!(Duration::from_secs_lossy(-1.0), Duration::ZERO);
        assert_eq!(Duration::from_secs_lossy(f64::NAN), Duration::ZERO);
        assert_eq!(Duration::from_secs_lossy(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn test_millis_deserialize_integer_and_float() {
        let w: Window = serde_json::from_str(r#"{"start_time": 2500}"#).unwrap();
        assert_eq!(w.start_time, Duration::from_millis(2500));

        let w: Window = serde_json::from_str(r#"{"start_time": 120.9}"#).unwrap();
        assert_eq!(w.start_time, Duration::from_millis(120));
    }

    #[test]
    fn test_millis_negative_clamps_to_zero() {
        let w: Window = serde_json::from_str(r#"{"start_time": -40}"#).unwrap();
        assert_eq!(w.start_time, Duration::ZERO);
    }

    #[test]
    fn test_millis_serialize() {
        let w = Window {
            start_time: Duration::from_millis(42),
        };
        assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"start_time":42}"#);
    }
}
