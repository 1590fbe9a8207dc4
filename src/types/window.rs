//! Calendar helpers: accounting months and run windows

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// An accounting month, stored as its first calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductionMonth(NaiveDate);

impl ProductionMonth {
    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    /// Parse `YYYY-MM` or any `YYYY-MM-DD` inside the month.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self::of(date));
        }
        NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
            .ok()
            .map(Self)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().0.pred_opt().unwrap_or(self.0)
    }

    #[must_use]
    pub fn next(&self) -> Self {
        self.0
            .checked_add_months(Months::new(1))
            .map_or(*self, Self)
    }

    /// Calendar days in the month (28-31).
    pub fn days(&self) -> u32 {
        let span = (self.last_day() - self.0).num_days() + 1;
        u32::try_from(span).unwrap_or(0)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }
}

impl std::fmt::Display for ProductionMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// The date range a run is asked to (re)produce.
///
/// Computation always covers each well's full history up to `cutoff`;
/// `start` only limits which rows are emitted and replaced downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWindow {
    pub start: Option<NaiveDate>,
    pub cutoff: NaiveDate,
}

impl RunWindow {
    pub fn through(cutoff: NaiveDate) -> Self {
        Self { start: None, cutoff }
    }

    pub fn between(start: NaiveDate, cutoff: NaiveDate) -> Self {
        Self {
            start: Some(start),
            cutoff,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date <= self.cutoff && self.start.map_or(true, |s| date >= s)
    }
}
