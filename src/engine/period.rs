//! Period resolution: `today` / `week` / `month` / `custom` to a concrete range.
//!
//! Ranges are recomputed on every evaluation; nothing here caches across a
//! calendar-day boundary.

use crate::domain::range::{end_of_day, start_of_day};
use crate::domain::DateRange;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    Week,
    Month,
    Custom,
}

impl Period {
    /// The three windows every dashboard row shows regardless of the applied range.
    pub const FIXED: [Period; 3] = [Period::Today, Period::Week, Period::Month];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Week => "week",
            Period::Month => "month",
            Period::Custom => "custom",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "custom" => Ok(Period::Custom),
            other => Err(format!(
                "period must be one of: today, week, month, custom, got {}",
                other
            )),
        }
    }
}

/// Operator-picked calendar days; `to` defaults to `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRange {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl CustomRange {
    pub fn new(from: NaiveDate, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }
}

/// Resolves period tokens in a fixed business timezone; weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodResolver {
    offset: FixedOffset,
}

impl PeriodResolver {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Resolve `period` against `now`.
    ///
    /// # Errors
    /// `InvalidRange` when a custom range ends before it starts, and
    /// `MissingCustomRange` when `custom` is requested without days.
    pub fn resolve(
        &self,
        period: Period,
        custom: Option<CustomRange>,
        now: DateTime<Utc>,
    ) -> Result<DateRange, EngineError> {
        let today = now.with_timezone(&self.offset).date_naive();
        let range = match period {
            Period::Today => DateRange::days(self.offset, today, today),
            Period::Week => DateRange::days(self.offset, start_of_week(today), today),
            Period::Month => DateRange::days(self.offset, start_of_month(today), today),
            Period::Custom => {
                let custom = custom.ok_or(EngineError::MissingCustomRange)?;
                return self.custom(custom);
            }
        };
        Ok(range)
    }

    /// `[startOfDay(from), endOfDay(to ?? from)]`.
    pub fn custom(&self, custom: CustomRange) -> Result<DateRange, EngineError> {
        let to = custom.to.unwrap_or(custom.from);
        if to < custom.from {
            return Err(EngineError::InvalidRange {
                from: custom.from,
                to,
            });
        }
        Ok(DateRange::new(
            start_of_day(self.offset, custom.from),
            end_of_day(self.offset, to),
        ))
    }

    pub fn resolve_now(
        &self,
        period: Period,
        custom: Option<CustomRange>,
    ) -> Result<DateRange, EngineError> {
        self.resolve(period, custom, Utc::now())
    }
}

fn start_of_week(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

fn start_of_month(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.day0()))
}
