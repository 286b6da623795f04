//! UTC instants as Unix milliseconds (no chrono dependency).
//!
//! Uses Howard Hinnant's civil_from_days / days_from_civil algorithms for
//! date conversion in both directions.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::constants::MS_PER_DAY;
use crate::error::{Result, ScoreError};

/// Largest representable distance from the Unix epoch (±100,000,000 days).
pub const MAX_ABS_MILLIS: i64 = 100_000_000 * MS_PER_DAY;

/// A UTC instant with millisecond precision.
///
/// Always within `±MAX_ABS_MILLIS`, so differences between two timestamps
/// never overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimestampRepr", into = "String")]
pub struct Timestamp(i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Millis(i64),
    Iso(String),
}

impl TryFrom<TimestampRepr> for Timestamp {
    type Error = ScoreError;

    fn try_from(repr: TimestampRepr) -> Result<Self> {
        match repr {
            TimestampRepr::Millis(ms) => Timestamp::from_millis(ms),
            TimestampRepr::Iso(s) => s.parse(),
        }
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

/// An instant exactly as it arrived on the wire, checked only when resolved.
///
/// Lets a feed snapshot load even when one petition carries a bad instant,
/// so the failure stays with that petition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawTimestamp {
    pub fn resolve(&self) -> Result<Timestamp> {
        match self {
            RawTimestamp::Millis(ms) => Timestamp::from_millis(*ms),
            RawTimestamp::FractionalMillis(ms) => Timestamp::from_millis_f64(*ms),
            RawTimestamp::Text(s) => s.parse(),
            RawTimestamp::Other(v) => Err(ScoreError::InvalidTimestamp(format!(
                "{v} is neither a string nor a number"
            ))),
        }
    }
}

impl From<Timestamp> for RawTimestamp {
    fn from(ts: Timestamp) -> Self {
        RawTimestamp::Text(ts.to_string())
    }
}

impl Timestamp {
    /// Unix epoch (1970-01-01T00:00:00Z).
    pub const UNIX_EPOCH: Timestamp = Timestamp(0);

    pub(crate) const fn from_millis_unchecked(ms: i64) -> Self {
        Self(ms)
    }

    pub fn from_millis(ms: i64) -> Result<Self> {
        if !(-MAX_ABS_MILLIS..=MAX_ABS_MILLIS).contains(&ms) {
            return Err(ScoreError::InvalidTimestamp(format!(
                "{ms}ms is outside the supported range"
            )));
        }
        Ok(Self(ms))
    }

    /// Build from a floating-point millisecond count, flooring any fraction.
    /// NaN and infinities are rejected.
    pub fn from_millis_f64(ms: f64) -> Result<Self> {
        if !ms.is_finite() {
            return Err(ScoreError::InvalidTimestamp(format!("{ms} is not finite")));
        }
        let floored = ms.floor();
        if floored.abs() > MAX_ABS_MILLIS as f64 {
            return Err(ScoreError::InvalidTimestamp(format!(
                "{ms}ms is outside the supported range"
            )));
        }
        Ok(Self(floored as i64))
    }

    /// Current UTC time.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(i64::try_from(ms).unwrap_or(MAX_ABS_MILLIS).min(MAX_ABS_MILLIS))
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Shift by a signed number of milliseconds, staying in range.
    pub fn offset_millis(self, delta: i64) -> Result<Self> {
        let ms = self.0.checked_add(delta).ok_or_else(|| {
            ScoreError::InvalidTimestamp(format!("{} + {delta}ms overflows", self.0))
        })?;
        Self::from_millis(ms)
    }

    /// Shift by a signed number of whole days.
    pub fn offset_days(self, days: i64) -> Result<Self> {
        let delta = days.checked_mul(MS_PER_DAY).ok_or_else(|| {
            ScoreError::InvalidTimestamp(format!("{days} days overflows"))
        })?;
        self.offset_millis(delta)
    }
}

/// Whole days from `earlier` to `later`, floor-divided. Negative when
/// `later` precedes `earlier`.
pub fn day_difference(later: Timestamp, earlier: Timestamp) -> i64 {
    (later.0 - earlier.0).div_euclid(MS_PER_DAY)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0.div_euclid(MS_PER_DAY);
        let ms_of_day = self.0.rem_euclid(MS_PER_DAY);
        let secs = ms_of_day / 1000;
        let millis = ms_of_day % 1000;
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        let (y, m, d) = civil_from_days(days);
        write!(f, "{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}")?;
        if millis != 0 {
            write!(f, ".{millis:03}")?;
        }
        write!(f, "Z")
    }
}

impl FromStr for Timestamp {
    type Err = ScoreError;

    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.fff]]` with an optional
    /// `Z` or `±HH:MM` suffix. A missing zone means UTC.
    fn from_str(s: &str) -> Result<Self> {
        parse_iso8601(s.trim()).ok_or_else(|| ScoreError::InvalidTimestamp(format!("{s:?}")))
    }
}

fn parse_iso8601(s: &str) -> Option<Timestamp> {
    let (date, rest) = match s.find(['T', 't', ' ']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };

    let mut parts = date.splitn(3, '-');
    let y: i64 = parse_digits(parts.next()?, 4)?;
    let m: u64 = parse_digits(parts.next()?, 2)?;
    let d: u64 = parse_digits(parts.next()?, 2)?;
    if !(1..=12).contains(&m) || d == 0 || d > days_in_month(y, m) {
        return None;
    }

    let mut ms = days_from_civil(y, m, d) * MS_PER_DAY;

    if let Some(rest) = rest {
        let (clock, offset_ms) = split_zone(rest)?;
        ms += parse_clock(clock)? - offset_ms;
    }

    Timestamp::from_millis(ms).ok()
}

/// Split `HH:MM...` from its zone suffix; returns the offset east of UTC in ms.
fn split_zone(s: &str) -> Option<(&str, i64)> {
    if let Some(clock) = s.strip_suffix(['Z', 'z']) {
        return Some((clock, 0));
    }
    if let Some(i) = s.rfind(['+', '-']) {
        let (clock, zone) = s.split_at(i);
        let sign = if zone.starts_with('-') { -1 } else { 1 };
        let (h, mm) = zone[1..].split_once(':')?;
        let h: i64 = parse_digits(h, 2)?;
        let mm: i64 = parse_digits(mm, 2)?;
        if h > 23 || mm > 59 {
            return None;
        }
        return Some((clock, sign * (h * 3600 + mm * 60) * 1000));
    }
    Some((s, 0))
}

fn parse_clock(s: &str) -> Option<i64> {
    let (hms, frac) = match s.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (s, None),
    };
    let mut fields = hms.split(':');
    let h: i64 = parse_digits(fields.next()?, 2)?;
    let mm: i64 = parse_digits(fields.next()?, 2)?;
    let sec: i64 = match fields.next() {
        Some(f) => parse_digits(f, 2)?,
        None => 0,
    };
    if fields.next().is_some() || h > 23 || mm > 59 || sec > 59 {
        return None;
    }
    // sub-millisecond digits are truncated
    let millis = match frac {
        Some(f) if !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) => {
            let mut digits: String = f.chars().take(3).collect();
            while digits.len() < 3 {
                digits.push('0');
            }
            digits.parse::<i64>().ok()?
        }
        Some(_) => return None,
        None => 0,
    };
    Some(((h * 60 + mm) * 60 + sec) * 1000 + millis)
}

fn parse_digits<T: FromStr>(s: &str, len: usize) -> Option<T> {
    if s.len() != len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

fn days_in_month(y: i64, m: u64) -> u64 {
    match m {
        2 if is_leap(y) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Howard Hinnant's days_from_civil: (year, month, day) → Unix epoch days.
fn days_from_civil(y: i64, m: u64, d: u64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EPOCH_MILLIS;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_unix_epoch() {
        assert_eq!(Timestamp::UNIX_EPOCH.to_string(), "1970-01-01T00:00:00Z");
        assert_eq!(ts("1970-01-01T00:00:00Z"), Timestamp::UNIX_EPOCH);
    }

    #[test]
    fn test_known_date() {
        // 2026-02-21T00:00:00Z = 1771632000s
        assert_eq!(ts("2026-02-21T00:00:00Z").as_millis(), 1_771_632_000_000);
        let t = Timestamp::from_millis(1_771_632_000_000).unwrap();
        assert_eq!(t.to_string(), "2026-02-21T00:00:00Z");
    }

    #[test]
    fn test_epoch_constant_is_2074() {
        assert_eq!(ts("2074-01-01").as_millis(), EPOCH_MILLIS);
    }

    #[test]
    fn test_millis_and_offsets() {
        let t = ts("2024-03-10T12:30:15.250+02:00");
        assert_eq!(t.to_string(), "2024-03-10T10:30:15.250Z");
        assert_eq!(ts("2024-03-10T05:30:15.250-05:00"), t);
    }

    #[test]
    fn test_missing_zone_is_utc() {
        assert_eq!(ts("2024-03-10T10:30"), ts("2024-03-10T10:30:00Z"));
    }

    #[test]
    fn test_pre_1970_roundtrip() {
        let t = ts("1969-12-31T23:59:59.999Z");
        assert_eq!(t.as_millis(), -1);
        assert_eq!(t.to_string(), "1969-12-31T23:59:59.999Z");
    }

    #[test]
    fn test_leap_day() {
        assert!("2024-02-29".parse::<Timestamp>().is_ok());
        assert!("2023-02-29".parse::<Timestamp>().is_err());
        assert!("2000-02-29".parse::<Timestamp>().is_ok());
        assert!("1900-02-29".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        for bad in [
            "",
            "yesterday",
            "2024-13-01",
            "2024-00-10",
            "2024-01-32",
            "2024-01-01T24:00:00Z",
            "2024-01-01T10:60Z",
            "2024-01-01T10:00:00.Z",
            "24-01-01",
            "2024-01-01T10:00:00+5",
        ] {
            let err = bad.parse::<Timestamp>().unwrap_err();
            assert!(
                matches!(err, ScoreError::InvalidTimestamp(_)),
                "{bad:?} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_from_millis_f64_rejects_non_finite() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            assert!(matches!(
                Timestamp::from_millis_f64(bad),
                Err(ScoreError::InvalidTimestamp(_))
            ));
        }
        assert_eq!(Timestamp::from_millis_f64(1500.9).unwrap().as_millis(), 1500);
        assert_eq!(Timestamp::from_millis_f64(-0.5).unwrap().as_millis(), -1);
    }

    #[test]
    fn test_from_millis_range() {
        assert!(Timestamp::from_millis(i64::MAX).is_err());
        assert!(Timestamp::from_millis(i64::MIN).is_err());
        assert!(Timestamp::from_millis(MAX_ABS_MILLIS).is_ok());
    }

    #[test]
    fn test_day_difference_floors() {
        let a = ts("2024-01-01T00:00:00Z");
        assert_eq!(day_difference(a.offset_millis(MS_PER_DAY - 1).unwrap(), a), 0);
        assert_eq!(day_difference(a.offset_days(3).unwrap(), a), 3);
        // floor, not truncation toward zero
        assert_eq!(day_difference(a.offset_millis(-1).unwrap(), a), -1);
        assert_eq!(day_difference(a, a.offset_days(2).unwrap()), -2);
    }

    #[test]
    fn test_serde_accepts_string_and_millis() {
        let a: Timestamp = serde_json::from_str("\"2024-01-01T00:00:00Z\"").unwrap();
        let b: Timestamp = serde_json::from_str("1704067200000").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"2024-01-01T00:00:00Z\"");
        assert!(serde_json::from_str::<Timestamp>("\"not a date\"").is_err());
    }

    #[test]
    fn test_raw_timestamp_defers_validation() {
        let raw: Vec<RawTimestamp> =
            serde_json::from_str(r#"["2024-01-01T00:00:00Z", 1704067200000, 1.5, "soon", null, 1e300]"#)
                .unwrap();
        assert_eq!(raw[0].resolve().unwrap(), ts("2024-01-01T00:00:00Z"));
        assert_eq!(raw[1].resolve().unwrap(), ts("2024-01-01T00:00:00Z"));
        assert_eq!(raw[2].resolve().unwrap().as_millis(), 1);
        for bad in &raw[3..] {
            assert!(
                matches!(bad.resolve(), Err(ScoreError::InvalidTimestamp(_))),
                "{bad:?} should not resolve"
            );
        }
        let back = RawTimestamp::from(ts("2024-01-01T00:00:00.250Z"));
        assert_eq!(back.resolve().unwrap().to_string(), "2024-01-01T00:00:00.250Z");
    }

    #[test]
    fn test_now_is_recent() {
        let now = Timestamp::now().to_string();
        assert!(now.starts_with("20"), "timestamp should be in 2000s: {now}");
    }
}
