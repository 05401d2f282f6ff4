//! Date windows that summaries are computed over.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::Error;

/// The upper bound of an [AggregationWindow].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowEnd {
    /// No upper bound, the window runs up to the present.
    Now,
    /// The window ends before this date (exclusive).
    Before(Date),
}

/// The date range a summary is computed over.
///
/// A window is a value chosen by the user, it has no lifecycle of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationWindow {
    /// The first date in the window (inclusive).
    pub start: Date,
    /// Where the window ends.
    pub end: WindowEnd,
}

impl AggregationWindow {
    /// A window from `start` up to the present.
    pub fn since(start: Date) -> Self {
        Self {
            start,
            end: WindowEnd::Now,
        }
    }

    /// A window from `start` (inclusive) to `end` (exclusive).
    ///
    /// # Errors
    /// Returns [Error::ValidationError] if `end` is not after `start`.
    pub fn between(start: Date, end: Date) -> Result<Self, Error> {
        if end <= start {
            return Err(Error::ValidationError(format!(
                "window end {end} must be after window start {start}"
            )));
        }

        Ok(Self {
            start,
            end: WindowEnd::Before(end),
        })
    }

    /// Whether `date` falls inside the window.
    pub fn contains(&self, date: Date) -> bool {
        if date < self.start {
            return false;
        }

        match self.end {
            WindowEnd::Now => true,
            WindowEnd::Before(end) => date < end,
        }
    }
}

/// The window choices offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowPreset {
    /// Just today.
    Today,
    /// Today and the seven days before it.
    ThisWeek,
    /// Since the first of the current month.
    ThisMonth,
    /// Since the first of January.
    ThisYear,
}

impl WindowPreset {
    /// The preset used when the user has not picked one.
    pub fn default_preset() -> Self {
        Self::ThisMonth
    }

    /// The kebab-case name of the preset.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::ThisWeek => "this-week",
            Self::ThisMonth => "this-month",
            Self::ThisYear => "this-year",
        }
    }

    /// A human readable label for the preset.
    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::ThisWeek => "This week",
            Self::ThisMonth => "This month",
            Self::ThisYear => "This year",
        }
    }

    /// Resolve the preset to a concrete window relative to `today`.
    pub fn window_for(self, today: Date) -> AggregationWindow {
        let start = match self {
            Self::Today => today,
            Self::ThisWeek => today - Duration::days(7),
            Self::ThisMonth => today.replace_day(1).unwrap_or(today),
            Self::ThisYear => Date::from_calendar_date(today.year(), Month::January, 1)
                .unwrap_or(today),
        };

        AggregationWindow::since(start)
    }
}

impl Display for WindowPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query_value())
    }
}

impl FromStr for WindowPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Self::Today),
            "this-week" => Ok(Self::ThisWeek),
            "this-month" => Ok(Self::ThisMonth),
            "this-year" => Ok(Self::ThisYear),
            other => Err(Error::ValidationError(format!(
                "unknown window preset \"{other}\""
            ))),
        }
    }
}
