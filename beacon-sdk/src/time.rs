//! Wall-clock timestamps: a millisecond-resolution epoch value and a
//! hand-written RFC 3339 encoder/decoder. No calendar or locale library is
//! used; the civil-from-days conversion is Howard Hinnant's well-known
//! algorithm, valid for every date from 1970-01-01 onward (and before it).

use std::time::{SystemTime, UNIX_EPOCH};

/// A wall-clock instant, stored as whole milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Seconds as a float, the unit most of the wire payloads use.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp((secs * 1000.0).round() as i64)
    }

    pub fn now() -> Self {
        let dur = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(dur.as_millis() as i64)
    }

    pub fn saturating_sub(self, other: Timestamp) -> std::time::Duration {
        if self.0 >= other.0 {
            std::time::Duration::from_millis((self.0 - other.0) as u64)
        } else {
            std::time::Duration::ZERO
        }
    }

    /// Render as exactly `YYYY-MM-DDTHH:MM:SS.mmmZ` (24 bytes).
    pub fn to_rfc3339(self) -> String {
        let total_ms = self.0;
        let (days, ms_of_day) = {
            let d = total_ms.div_euclid(86_400_000);
            let m = total_ms.rem_euclid(86_400_000);
            (d, m)
        };
        let (year, month, day) = civil_from_days(days);
        let millis = ms_of_day % 1000;
        let secs_of_day = ms_of_day / 1000;
        let hour = secs_of_day / 3600;
        let minute = (secs_of_day % 3600) / 60;
        let second = secs_of_day % 60;

        format!(
            "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{millis:03}Z"
        )
    }

    /// Parse the canonical `YYYY-MM-DDTHH:MM:SS.mmmZ` form produced by
    /// [`Self::to_rfc3339`]. Does not attempt to accept every RFC 3339
    /// variant; this SDK only ever needs to round-trip its own output.
    pub fn parse_rfc3339(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 24 || bytes[4] != b'-' || bytes[7] != b'-' || bytes[10] != b'T'
            || bytes[13] != b':' || bytes[16] != b':' || bytes[19] != b'.' || bytes[23] != b'Z'
        {
            return None;
        }
        let year: i64 = s.get(0..4)?.parse().ok()?;
        let month: i64 = s.get(5..7)?.parse().ok()?;
        let day: i64 = s.get(8..10)?.parse().ok()?;
        let hour: i64 = s.get(11..13)?.parse().ok()?;
        let minute: i64 = s.get(14..16)?.parse().ok()?;
        let second: i64 = s.get(17..19)?.parse().ok()?;
        let millis: i64 = s.get(20..23)?.parse().ok()?;

        let days = days_from_civil(year, month, day);
        let ms_of_day = hour * 3_600_000 + minute * 60_000 + second * 1000 + millis;
        Some(Timestamp(days * 86_400_000 + ms_of_day))
    }
}

/// Days-since-epoch to (year, month, day). Howard Hinnant's `civil_from_days`.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32; // [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32; // [1, 12]
    let year = if m <= 2 { y + 1 } else { y };
    (year, m, d)
}

/// Inverse of [`civil_from_days`]: (year, month, day) to days-since-epoch.
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64; // [0, 399]
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + d - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy as u64; // [0, 146096]
    era * 146_097 + doe as i64 - 719_468
}

/// `serde(with = "crate::time::serde_timestamp")`: encodes a [`Timestamp`]
/// as the fractional-seconds float the wire payloads use, e.g. `1740484800.0`.
pub mod serde_timestamp {
    use super::Timestamp;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
        ts.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Timestamp::from_secs_f64(secs))
    }
}
