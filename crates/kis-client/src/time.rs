//! KIS date encoding
//!
//! The API speaks `YYYY-MM-DDTHH:MM:SS` with no timezone suffix (UTC by
//! convention) at second precision. Unset dates are never sent: `encode`
//! returns `None` and the caller leaves the parameter out. On the way in,
//! `null` and empty strings decode to `None`.

use chrono::NaiveDateTime;
use kis_auth::{Error, Result};

/// Wire format for query parameters and record timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Encode a date for a query string, or `None` if unset.
pub fn encode(date: Option<NaiveDateTime>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

/// Decode a timestamp from the API.
///
/// Tolerates fractional seconds and a trailing `Z`, which some endpoints emit.
pub fn decode(value: &str) -> Result<Option<NaiveDateTime>> {
    let value = value.trim();
    if value.is_empty() || value == "null" {
        return Ok(None);
    }
    let value = value.strip_suffix('Z').unwrap_or(value);
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(Some)
        .map_err(|e| Error::Decode(format!("invalid timestamp {value:?}: {e}")))
}

/// Serde adapter for optional KIS timestamps.
///
/// `#[serde(with = "crate::time::option", default)]`
pub mod option {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match super::encode(*date) {
            Some(s) => serializer.serialize_str(&s),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => super::decode(&s).map_err(serde::de::Error::custom),
        }
    }
}
