//! Serde helpers shared by configuration types

/// Serialize `std::time::Duration` as whole seconds
///
/// Config files say `idle_timeout = 3600` rather than a nested
/// `{ secs, nanos }` table. Sub-second precision is dropped on write.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
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
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Slot {
        #[serde(with = "duration_secs")]
        length: Duration,
    }

    #[test]
    fn test_writes_whole_seconds() {
        let slot = Slot {
            length: Duration::from_millis(60_900),
        };
        assert_eq!(toml::to_string(&slot).unwrap().trim(), "length = 60");
    }

    #[test]
    fn test_reads_whole_seconds() {
        let slot: Slot = toml::from_str("length = 3600").unwrap();
        assert_eq!(slot.length, Duration::from_secs(3600));
    }

    #[test]
    fn test_rejects_negative() {
        assert!(toml::from_str::<Slot>("length = -1").is_err());
    }
}
