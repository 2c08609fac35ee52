use super::user::UserProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open "inside the mall" record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(with = "timestamp")]
    pub entry_time: DateTime<Utc>,
    /// Profile snapshot taken at entry.
    pub data: UserProfile,
}

impl Session {
    pub fn new(entry_time: DateTime<Utc>, data: UserProfile) -> Self {
        Self { entry_time, data }
    }
}

/// ISO-8601 entry timestamps.
///
/// Written as RFC 3339. On read, timestamps without an offset (as produced by
/// older tooling writing local wall-clock time) are taken as local time.
pub mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid entry_time '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
            return Some(with_offset.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }
}
