use std::fmt::{self, Display};

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

/// Seconds since "noon minus 12h" of the service day. Values past 86 400
/// denote post-midnight stops of a trip that started the day before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Time(u32);

impl Time {
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    /// Parses `H:MM:SS` or `HH:MM:SS`. Hours may exceed 24.
    pub fn from_hms(time: &str) -> Option<Self> {
        let mut split = time.split(':');
        let hours: u32 = split.next()?.parse().ok()?;
        let minutes: u32 = split.next()?.parse().ok()?;
        let seconds: u32 = split.next()?.parse().ok()?;
        if split.next().is_some() {
            return None;
        }
        Some(Self(hours * 3600 + minutes * 60 + seconds))
    }

    /// Seconds elapsed since `earlier`, or `None` when this time precedes it.
    pub fn seconds_since(&self, earlier: Time) -> Option<u32> {
        self.0.checked_sub(earlier.0)
    }

    pub fn to_hms_string(&self) -> String {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        format!("{:02}:{:02}:{:02}", h, m, s)
    }
}

impl From<u32> for Time {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<NaiveTime> for Time {
    fn from(value: NaiveTime) -> Self {
        Self(value.num_seconds_from_midnight())
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hms_string())
    }
}

/// `date` as a YYYYMMDD integer; the natural integer order matches the
/// calendar order, which is all the calendar windows need.
pub fn date_int(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// An inclusive interval of service-day seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayRange {
    pub from: Time,
    pub to: Time,
}

impl DayRange {
    pub const fn new(from: Time, to: Time) -> Self {
        Self { from, to }
    }

    pub const fn from_seconds(from: u32, to: u32) -> Self {
        Self {
            from: Time::from_seconds(from),
            to: Time::from_seconds(to),
        }
    }

    pub fn intersects(&self, other: &DayRange) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    pub fn contains(&self, other: &DayRange) -> bool {
        self.from <= other.from && self.to >= other.to
    }

    /// Grows this range to cover `other`.
    pub fn extend(&mut self, other: &DayRange) {
        if other.from < self.from {
            self.from = other.from;
        }
        if other.to > self.to {
            self.to = other.to;
        }
    }
}
