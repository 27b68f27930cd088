//! Q temporal newtypes.
//!
//! Each wraps its Q-native wire representation, relative to the Q epoch
//! (2000-01-01T00:00:00Z). The minimum of the signed range is the null
//! sentinel for every integer-backed type; `Datetime` uses NaN. Accessors
//! return `None` for null, so nulls round-trip bit-exactly.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// Q epoch as seconds since the Unix epoch.
const EPOCH_UNIX_SECS: i64 = 946_684_800;
/// Q epoch as days from the common era (chrono's day numbering).
const EPOCH_DAYS_FROM_CE: i32 = 730_120;

const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_DAY: f64 = 86_400.0 * 1e9;

/// Nanoseconds since the Q epoch (type 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const NULL: Self = Self(i64::MIN);
    pub const INF: Self = Self(i64::MAX);

    pub fn from_datetime(t: DateTime<Utc>) -> Self {
        match t.timestamp_nanos_opt() {
            Some(ns) => Self(ns - EPOCH_UNIX_SECS * NANOS_PER_SEC),
            None => Self::NULL,
        }
    }

    pub fn as_datetime(self) -> Option<DateTime<Utc>> {
        if self == Self::NULL {
            return None;
        }
        let ns = self.0.checked_add(EPOCH_UNIX_SECS * NANOS_PER_SEC)?;
        DateTime::from_timestamp(ns.div_euclid(NANOS_PER_SEC), ns.rem_euclid(NANOS_PER_SEC) as u32)
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_datetime() {
            Some(t) => write!(f, "{t}"),
            None => f.write_str("0Np"),
        }
    }
}

/// Months since 2000-01 (type 13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(pub i32);

impl Month {
    pub const NULL: Self = Self(i32::MIN);

    pub fn from_year_month(year: i32, month: u32) -> Self {
        Self((year - 2000) * 12 + month as i32 - 1)
    }

    /// Calendar (year, month) pair, `month` in 1..=12.
    pub fn year_month(self) -> Option<(i32, u32)> {
        if self.is_null() {
            return None;
        }
        Some((2000 + self.0.div_euclid(12), 1 + self.0.rem_euclid(12) as u32))
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year_month() {
            Some((y, m)) => write!(f, "{y}.{m:02}m"),
            None => f.write_str("0Nm"),
        }
    }
}

/// Days since 2000-01-01 (type 14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(pub i32);

impl Date {
    pub const NULL: Self = Self(i32::MIN);

    pub fn from_naive_date(d: NaiveDate) -> Self {
        use chrono::Datelike;
        Self(d.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
    }

    pub fn as_naive_date(self) -> Option<NaiveDate> {
        if self.is_null() {
            return None;
        }
        NaiveDate::from_num_days_from_ce_opt(EPOCH_DAYS_FROM_CE.checked_add(self.0)?)
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_naive_date() {
            Some(d) => write!(f, "{d}"),
            None => f.write_str("0Nd"),
        }
    }
}

/// Fractional days since 2000-01-01 (type 15, the deprecated datetime).
#[derive(Debug, Clone, Copy)]
pub struct Datetime(pub f64);

impl Datetime {
    pub const NULL: Self = Self(f64::NAN);

    pub fn from_datetime(t: DateTime<Utc>) -> Self {
        match t.timestamp_nanos_opt() {
            Some(ns) => Self((ns - EPOCH_UNIX_SECS * NANOS_PER_SEC) as f64 / NANOS_PER_DAY),
            None => Self::NULL,
        }
    }

    pub fn as_datetime(self) -> Option<DateTime<Utc>> {
        if self.is_null() {
            return None;
        }
        let ns = (self.0 * NANOS_PER_DAY) as i64 + EPOCH_UNIX_SECS * NANOS_PER_SEC;
        DateTime::from_timestamp(ns.div_euclid(NANOS_PER_SEC), ns.rem_euclid(NANOS_PER_SEC) as u32)
    }

    pub fn is_null(self) -> bool {
        self.0.is_nan()
    }
}

// NaN nulls must compare equal so decoded trees equal their sources.
impl PartialEq for Datetime {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 || self.0.to_bits() == other.0.to_bits()
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_datetime() {
            Some(t) => write!(f, "{t}"),
            None => f.write_str("0Nz"),
        }
    }
}

/// Signed nanosecond duration (type 16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespan(pub i64);

impl Timespan {
    pub const NULL: Self = Self(i64::MIN);

    pub fn from_duration(d: Duration) -> Self {
        match d.num_nanoseconds() {
            Some(ns) => Self(ns),
            None => Self::NULL,
        }
    }

    pub fn as_duration(self) -> Option<Duration> {
        if self.is_null() {
            return None;
        }
        Some(Duration::nanoseconds(self.0))
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("0Nn")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Minutes (type 17); displays as wall-clock minutes of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Minute(pub i32);

impl Minute {
    pub const NULL: Self = Self(i32::MIN);

    pub fn as_time(self) -> Option<NaiveTime> {
        if self.is_null() {
            return None;
        }
        NaiveTime::from_num_seconds_from_midnight_opt(self.0.rem_euclid(1_440) as u32 * 60, 0)
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Minute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("0Nu");
        }
        let m = self.0.rem_euclid(1_440);
        write!(f, "{:02}:{:02}", m / 60, m % 60)
    }
}

/// Seconds (type 18); displays as wall-clock hh:mm:ss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Second(pub i32);

impl Second {
    pub const NULL: Self = Self(i32::MIN);

    pub fn as_time(self) -> Option<NaiveTime> {
        if self.is_null() {
            return None;
        }
        NaiveTime::from_num_seconds_from_midnight_opt(self.0.rem_euclid(86_400) as u32, 0)
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Second {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("0Nv");
        }
        let s = self.0.rem_euclid(86_400);
        write!(f, "{:02}:{:02}:{:02}", s / 3_600, s / 60 % 60, s % 60)
    }
}

/// Milliseconds of the day (type 19).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub i32);

impl Time {
    pub const NULL: Self = Self(i32::MIN);

    pub fn as_time(self) -> Option<NaiveTime> {
        if self.is_null() {
            return None;
        }
        let ms = self.0.rem_euclid(86_400_000);
        NaiveTime::from_num_seconds_from_midnight_opt(
            (ms / 1_000) as u32,
            (ms % 1_000) as u32 * 1_000_000,
        )
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("0Nt");
        }
        let ms = self.0.rem_euclid(86_400_000);
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            ms / 3_600_000,
            ms / 60_000 % 60,
            ms / 1_000 % 60,
            ms % 1_000
        )
    }
}
