//! Shared serde helpers for configuration durations
//!
//! Poll intervals are written in milliseconds, longer waits in seconds,
//! which keeps the TOML readable.

/// Serialize a Duration as milliseconds (u64)
pub mod duration_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Serialize a Duration as seconds (u64)
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serialize an optional Duration as seconds; absent means unbounded.
///
/// Use together with `#[serde(default)]` so a missing key reads as `None`.
pub mod option_duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timings {
        #[serde(with = "duration_millis")]
        poll: Duration,
        #[serde(with = "duration_secs")]
        request: Duration,
        #[serde(default, with = "option_duration_secs")]
        ready: Option<Duration>,
    }

    #[test]
    fn test_millis_and_secs() {
        let timings: Timings = serde_json::from_str(r#"{"poll":100,"request":30}"#).unwrap();
        assert_eq!(timings.poll, Duration::from_millis(100));
        assert_eq!(timings.request, Duration::from_secs(30));
        assert_eq!(timings.ready, None);
    }

    #[test]
    fn test_optional_secs_present() {
        let timings: Timings =
            serde_json::from_str(r#"{"poll":250,"request":5,"ready":45}"#).unwrap();
        assert_eq!(timings.ready, Some(Duration::from_secs(45)));
        let json = serde_json::to_string(&timings).unwrap();
        assert_eq!(json, r#"{"poll":250,"request":5,"ready":45}"#);
    }
}
