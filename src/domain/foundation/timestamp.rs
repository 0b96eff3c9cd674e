//! UTC instants used for order, payment and subscription times.
//!
//! Subscription expiry is compared with strict `is_after`, so an expiry equal
//! to "now" already counts as lapsed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self < other
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        self > other
    }

    /// `self - other`; negative when `other` is later.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        self.plus(Duration::seconds(secs))
    }

    pub fn minus_secs(&self, secs: i64) -> Self {
        self.plus(Duration::seconds(-secs))
    }

    /// `YYYYMMDDhhmmss`, as embedded in order numbers.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d%H%M%S").to_string()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap())
    }

    #[test]
    fn now_is_between_surrounding_clock_reads() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn ordering_helpers_agree_with_ord() {
        let early = at(2024, 1, 15, 10, 0, 0);
        let late = early.plus_secs(1);

        assert!(early.is_before(&late));
        assert!(late.is_after(&early));
        assert!(early < late);
        assert_eq!(late.duration_since(&early), Duration::seconds(1));
        assert_eq!(early.duration_since(&late), Duration::seconds(-1));
    }

    #[test]
    fn plus_and_minus_are_inverse() {
        let ts = at(2024, 2, 29, 23, 59, 59);
        assert_eq!(ts.plus_secs(90).minus_secs(90), ts);
        assert_eq!(ts.plus(Duration::days(1)).as_datetime().month(), 3);
    }

    #[test]
    fn compact_renders_fourteen_digits() {
        let ts = at(2024, 3, 7, 9, 5, 1);
        assert_eq!(ts.compact(), "20240307090501");
    }

    #[test]
    fn serializes_as_rfc3339() {
        let ts = at(2024, 1, 15, 10, 30, 0);
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-15"));

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
