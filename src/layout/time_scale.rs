//! Linear instant-to-pixel mapping with calendar-aware ticks.

use crate::model::TimeRange;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
pub(crate) const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;
const MONTH_MS: i64 = 30 * DAY_MS;
const YEAR_MS: i64 = 365 * DAY_MS;

/// Upper bound on generated ticks, whatever the requested count.
const MAX_TICKS: usize = 1_000;

/// Monotonic, invertible linear mapping from instants to x-coordinates.
///
/// The domain is held in epoch milliseconds. A zero-width domain maps every
/// instant to the midpoint of the range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    domain: TimeRange,
    range: (f64, f64),
}

impl TimeScale {
    /// Scale mapping `domain` linearly onto the pixel interval `range`.
    pub fn new(domain: TimeRange, range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Time interval being mapped.
    pub fn domain(&self) -> TimeRange {
        self.domain
    }

    /// Pixel range `(left, right)`.
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Forward evaluation: instant to x.
    pub fn apply(&self, instant: DateTime<Utc>) -> f64 {
        self.apply_millis(instant.timestamp_millis())
    }

    /// Pixel position of a millisecond timestamp.
    pub fn apply_millis(&self, millis: i64) -> f64 {
        let (r0, r1) = self.range;
        let span = self.domain.span_millis();
        if span == 0 {
            return (r0 + r1) / 2.0;
        }
        let t = (millis - self.domain.start_millis()) as f64 / span as f64;
        r0 + t * (r1 - r0)
    }

    /// Inverse evaluation: x to instant.
    ///
    /// Returns `None` when the result falls outside chrono's representable range.
    pub fn invert(&self, x: f64) -> Option<DateTime<Utc>> {
        let (r0, r1) = self.range;
        if r1 == r0 || !x.is_finite() {
            return Some(self.domain.start());
        }
        let t = (x - r0) / (r1 - r0);
        let millis = self.domain.start_millis() as f64 + t * self.domain.span_millis() as f64;
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return None;
        }
        DateTime::from_timestamp_millis(millis.round() as i64)
    }

    /// Roughly `count` tick instants inside the domain, aligned to calendar
    /// boundaries, ascending and unique.
    ///
    /// A zero-span domain yields the single start instant.
    pub fn ticks(&self, count: usize) -> Vec<DateTime<Utc>> {
        let start = self.domain.start();
        let end = self.domain.end();
        if self.domain.span_millis() <= 0 {
            return vec![start];
        }
        let count = count.max(1);

        let interval = TickInterval::for_span(self.domain.span_millis(), count);
        let ticks = interval.instants(start, end, MAX_TICKS);
        if ticks.len() > 1 {
            return ticks;
        }

        // Coarse fallback: floor the start to a span-dependent unit and step.
        let fallback = TickInterval::fallback_for_span(self.domain.span_millis());
        let mut ticks = fallback.instants_from_floor(start, end, count);
        if ticks.is_empty() {
            ticks = vec![start, end];
        }
        ticks
    }
}

/// Calendar step between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickInterval {
    Fixed(i64),
    Months(u32),
    Years(i32),
}

impl TickInterval {
    const LADDER: [TickInterval; 18] = [
        TickInterval::Fixed(SECOND_MS),
        TickInterval::Fixed(5 * SECOND_MS),
        TickInterval::Fixed(15 * SECOND_MS),
        TickInterval::Fixed(30 * SECOND_MS),
        TickInterval::Fixed(MINUTE_MS),
        TickInterval::Fixed(5 * MINUTE_MS),
        TickInterval::Fixed(15 * MINUTE_MS),
        TickInterval::Fixed(30 * MINUTE_MS),
        TickInterval::Fixed(HOUR_MS),
        TickInterval::Fixed(3 * HOUR_MS),
        TickInterval::Fixed(6 * HOUR_MS),
        TickInterval::Fixed(12 * HOUR_MS),
        TickInterval::Fixed(DAY_MS),
        TickInterval::Fixed(2 * DAY_MS),
        TickInterval::Fixed(WEEK_MS),
        TickInterval::Months(1),
        TickInterval::Months(3),
        TickInterval::Years(1),
    ];

    fn approx_millis(self) -> i64 {
        match self {
            Self::Fixed(ms) => ms,
            Self::Months(n) => i64::from(n) * MONTH_MS,
            Self::Years(n) => i64::from(n) * YEAR_MS,
        }
    }

    /// Ladder entry closest (in ratio) to `span / count`.
    fn for_span(span_ms: i64, count: usize) -> Self {
        let target = span_ms as f64 / count as f64;
        if target > YEAR_MS as f64 {
            return Self::Years(nice_year_step(target / YEAR_MS as f64));
        }
        let index = Self::LADDER
            .iter()
            .position(|i| i.approx_millis() as f64 >= target)
            .unwrap_or(Self::LADDER.len() - 1);
        if index > 0 {
            let lower = Self::LADDER[index - 1].approx_millis() as f64;
            let upper = Self::LADDER[index].approx_millis() as f64;
            if target / lower < upper / target {
                return Self::LADDER[index - 1];
            }
        }
        Self::LADDER[index]
    }

    fn fallback_for_span(span_ms: i64) -> Self {
        match span_ms {
            s if s < MINUTE_MS => Self::Fixed(MINUTE_MS),
            s if s < DAY_MS => Self::Fixed(HOUR_MS),
            s if s < MONTH_MS => Self::Fixed(DAY_MS),
            s if s < YEAR_MS => Self::Months(1),
            s if s < 10 * YEAR_MS => Self::Years(1),
            s if s < 100 * YEAR_MS => Self::Years(10),
            _ => Self::Years(100),
        }
    }

    /// Aligned instants in `[start, end]`.
    fn instants(
        self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<DateTime<Utc>> {
        let mut ticks = Vec::new();
        let mut current = self.ceil(start);
        while let Some(tick) = current {
            if tick > end || ticks.len() >= limit {
                break;
            }
            ticks.push(tick);
            current = self.offset(tick);
        }
        ticks.dedup();
        ticks
    }

    /// Up to `limit` instants stepping from the floor of `start`.
    fn instants_from_floor(
        self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<DateTime<Utc>> {
        let mut ticks = Vec::new();
        let mut current = self.floor(start);
        while let Some(tick) = current {
            if tick > end || ticks.len() >= limit {
                break;
            }
            ticks.push(tick);
            current = self.offset(tick);
        }
        ticks
    }

    fn floor(self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Fixed(step) => {
                let ms = instant.timestamp_millis();
                DateTime::from_timestamp_millis(ms - ms.rem_euclid(step))
            }
            Self::Months(n) => {
                let month0 = instant.month0();
                let aligned = month0 - month0 % n;
                month_start(instant.year(), aligned + 1)
            }
            Self::Years(n) => year_start(instant.year() - instant.year().rem_euclid(n)),
        }
    }

    fn ceil(self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let floored = self.floor(instant)?;
        if floored >= instant {
            Some(floored)
        } else {
            self.offset(floored)
        }
    }

    fn offset(self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Fixed(step) => DateTime::from_timestamp_millis(instant.timestamp_millis() + step),
            Self::Months(n) => instant.checked_add_months(Months::new(n)),
            Self::Years(n) => year_start(instant.year().checked_add(n)?),
        }
    }
}

fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    Some(NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?.and_utc())
}

fn year_start(year: i32) -> Option<DateTime<Utc>> {
    month_start(year, 1)
}

/// 1, 2 or 5 times a power of ten, nearest to `years`.
fn nice_year_step(years: f64) -> i32 {
    let power = 10f64.powf(years.log10().floor());
    let error = years / power;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    ((factor * power) as i32).max(1)
}
