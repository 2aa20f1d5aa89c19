//! Time windows and daily shift windows.
//!
//! # Time Model
//! All instants are wall-clock `NaiveDateTime` values of the plant. The
//! engine never converts between time zones.
//!
//! # Intervals
//! Every reservation is a half-open interval `[start, end)`: two windows that
//! merely touch (`a.end == b.start`) do not overlap.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use shop_schedule::models::TimeWindow;
///
/// let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
/// let a = TimeWindow::new(day.and_hms_opt(8, 0, 0).unwrap(), day.and_hms_opt(9, 0, 0).unwrap());
/// let b = TimeWindow::new(day.and_hms_opt(9, 0, 0).unwrap(), day.and_hms_opt(10, 0, 0).unwrap());
/// assert!(!a.overlaps(&b));
/// assert_eq!(a.duration().num_minutes(), 60);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: NaiveDateTime,
    /// Interval end (exclusive).
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Creates a window of `duration` beginning at `start`.
    pub fn starting_at(start: NaiveDateTime, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    /// Length of this window.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether an instant falls within this window.
    #[inline]
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time < self.end
    }

    /// Whether two windows overlap. Empty windows overlap nothing.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < self.end
            && other.start < other.end
            && self.start < other.end
            && other.start < self.end
    }

    /// Same window moved to begin at `start`.
    pub fn shifted_to(&self, start: NaiveDateTime) -> Self {
        Self::starting_at(start, self.duration())
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {})", self.start, self.end)
    }
}

/// A recurring daily window such as a setup window or an operator shift.
///
/// Written as `"HH:MM-HH:MM"` and (de)serialised in that form. Windows do not
/// wrap past midnight: `start` must be earlier than `end`.
///
/// # Example
/// ```
/// use shop_schedule::models::ShiftWindow;
///
/// let window: ShiftWindow = "06:00-22:00".parse().unwrap();
/// assert_eq!(window.to_string(), "06:00-22:00");
/// assert!("22:00-06:00".parse::<ShiftWindow>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShiftWindow {
    /// Daily opening time.
    pub start: NaiveTime,
    /// Daily closing time.
    pub end: NaiveTime,
}

impl ShiftWindow {
    /// Creates a shift window from whole hours.
    ///
    /// Returns an error unless `start_hour < end_hour <= 23`.
    pub fn from_hours(start_hour: u32, end_hour: u32) -> Result<Self> {
        let start = hour_to_time(start_hour)?;
        let end = hour_to_time(end_hour)?;
        Self::new(start, end)
    }

    /// Creates a shift window, rejecting empty or wrapping windows.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(ScheduleError::InvalidConfig(format!(
                "window start {} must be before end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    /// The concrete window on `date`.
    pub fn window_on(&self, date: NaiveDate) -> TimeWindow {
        TimeWindow::new(date.and_time(self.start), date.and_time(self.end))
    }

    /// Whether `window` lies entirely inside this shift on the day it starts.
    pub fn covers(&self, window: &TimeWindow) -> bool {
        let day = self.window_on(window.start.date());
        window.start >= day.start && window.end <= day.end
    }

    /// Moves a setup of length `setup` so it starts and ends inside the window.
    ///
    /// A start before opening moves to opening; a start at or after closing
    /// moves to the next day's opening; a setup that would run past closing
    /// also moves to the next day's opening. A setup longer than the window
    /// itself is placed at the next opening and allowed to overrun.
    pub fn fit_setup(&self, start: NaiveDateTime, setup: Duration) -> NaiveDateTime {
        let today = self.window_on(start.date());
        let next_open = |date: NaiveDate| {
            date.succ_opt()
                .map(|next| next.and_time(self.start))
                .unwrap_or(start)
        };

        let adjusted = if start < today.start {
            today.start
        } else if start >= today.end {
            next_open(start.date())
        } else {
            start
        };

        let close = self.window_on(adjusted.date()).end;
        if adjusted + setup > close {
            next_open(adjusted.date())
        } else {
            adjusted
        }
    }
}

fn hour_to_time(hour: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(hour, 0, 0)
        .ok_or_else(|| ScheduleError::InvalidConfig(format!("invalid hour {hour}")))
}

impl fmt::Display for ShiftWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl FromStr for ShiftWindow {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| ScheduleError::InvalidConfig(format!("expected HH:MM-HH:MM, got {s:?}")))?;
        let parse = |part: &str| {
            NaiveTime::parse_from_str(part.trim(), "%H:%M")
                .map_err(|e| ScheduleError::InvalidConfig(format!("bad time {part:?}: {e}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }
}

impl TryFrom<String> for ShiftWindow {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ShiftWindow> for String {
    fn from(value: ShiftWindow) -> Self {
        value.to_string()
    }
}
