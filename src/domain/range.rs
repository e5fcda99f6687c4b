//! Resolved date ranges, inclusive by calendar day in the business timezone.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// `[from, to]` where membership is decided by the calendar day a fact falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
}

impl DateRange {
    pub fn new(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> Self {
        Self { from, to }
    }

    /// Whole calendar days `first..=last` in `offset`.
    pub fn days(offset: FixedOffset, first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            from: start_of_day(offset, first),
            to: start_of_day(offset, last),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        *self.from.offset()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.from.date_naive()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.to.with_timezone(&self.offset()).date_naive()
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.first_day() <= day && day <= self.last_day()
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.contains_day(at.with_timezone(&self.offset()).date_naive())
    }

    /// Equivalent half-open instant range `[start, end)` for store queries.
    pub fn utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let offset = self.offset();
        let start = start_of_day(offset, self.first_day());
        let end = start_of_day(offset, self.last_day()) + Duration::days(1);
        (start.with_timezone(&Utc), end.with_timezone(&Utc))
    }
}

pub fn start_of_day(offset: FixedOffset, day: NaiveDate) -> DateTime<FixedOffset> {
    let local = day.and_time(NaiveTime::default());
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

pub fn end_of_day(offset: FixedOffset, day: NaiveDate) -> DateTime<FixedOffset> {
    start_of_day(offset, day) + Duration::days(1) - Duration::milliseconds(1)
}
