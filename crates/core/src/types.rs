/// Document identifiers are opaque strings assigned by the caller or generated here.
pub type DocId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh document id (32 lowercase hex characters, no hyphens).
pub fn new_doc_id() -> DocId {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Fixed-width RFC 3339 (de)serialization for [`Timestamp`] fields.
///
/// Always writes six fractional digits so that the string form sorts in the
/// same order as the instant it encodes. Index keys built from timestamps
/// depend on this.
pub mod timestamp_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    /// Render a timestamp in the fixed-width form.
    pub fn to_key(ts: &Timestamp) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_key(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn doc_ids_are_unique_hex() {
        let a = new_doc_id();
        let b = new_doc_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn timestamp_keys_are_fixed_width() {
        let whole = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let fractional = whole + chrono::Duration::microseconds(500_000);
        let a = timestamp_format::to_key(&whole);
        let b = timestamp_format::to_key(&fractional);
        assert_eq!(a, "2024-03-01T12:00:00.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
