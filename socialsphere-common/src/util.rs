use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn new_unchecked(duration: Duration) -> Self {
        Self::new(duration).expect("Duration was not positive.")
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Serde representation of a store timestamp as a `{seconds, nanos}` map,
/// the resolution the document store reports.
pub mod ts_seconds_nanos {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};
    use time::UtcDateTime;

    const NANOS_PER_SECOND: i128 = 1_000_000_000;

    #[derive(Serialize, Deserialize)]
    struct TimestampRepr {
        seconds: i64,
        nanos: i32,
    }

    pub fn serialize<S>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let total = value.unix_timestamp_nanos();
        #[allow(clippy::cast_possible_truncation)]
        let repr = TimestampRepr {
            seconds: total.div_euclid(NANOS_PER_SECOND) as i64,
            nanos: total.rem_euclid(NANOS_PER_SECOND) as i32,
        };
        repr.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UtcDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = TimestampRepr::deserialize(deserializer)?;
        let total = i128::from(repr.seconds) * NANOS_PER_SECOND + i128::from(repr.nanos);
        UtcDateTime::from_unix_timestamp_nanos(total).map_err(Error::custom)
    }
}

/// Serde representation of a client-clock timestamp as unix milliseconds,
/// the format comments and replies are stored with.
pub mod ts_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};
    use time::UtcDateTime;

    const NANOS_PER_MILLISECOND: i128 = 1_000_000;

    pub fn serialize<S>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[allow(clippy::cast_possible_truncation)]
        let millis = (value.unix_timestamp_nanos() / NANOS_PER_MILLISECOND) as i64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UtcDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        UtcDateTime::from_unix_timestamp_nanos(i128::from(millis) * NANOS_PER_MILLISECOND)
            .map_err(Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::util::PositiveDuration;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    #[derive(Serialize, Deserialize, Eq, PartialEq, Debug)]
    struct StoreStamped {
        #[serde(with = "crate::util::ts_seconds_nanos")]
        at: UtcDateTime,
    }

    #[derive(Serialize, Deserialize, Eq, PartialEq, Debug)]
    struct ClientStamped {
        #[serde(with = "crate::util::ts_millis")]
        at: UtcDateTime,
    }

    #[test]
    fn positive_duration() {
        assert!(PositiveDuration::new(Duration::seconds(1)).is_some());
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::new(Duration::seconds(-1)).is_none());
        assert!(PositiveDuration::try_from(Duration::seconds(-1)).is_err());
    }

    #[test]
    fn seconds_nanos_round_trip() {
        let at = utc_datetime!(2025-06-01 12:34:56.123456789);
        let value = serde_json::to_value(StoreStamped { at }).unwrap();
        assert_eq!(
            value,
            json!({"at": {"seconds": 1_748_781_296_i64, "nanos": 123_456_789}})
        );

        let back: StoreStamped = serde_json::from_value(value).unwrap();
        assert_eq!(back.at, at);
    }

    #[test]
    fn millis_round_trip() {
        let at = utc_datetime!(2025-06-01 12:34:56.123);
        let value = serde_json::to_value(ClientStamped { at }).unwrap();
        assert_eq!(value, json!({"at": 1_748_781_296_123_i64}));

        let back: ClientStamped = serde_json::from_value(value).unwrap();
        assert_eq!(back.at, at);
    }
}
