//! Calendar-aware subscription period arithmetic.

use chrono::{Days, Months};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::Timestamp;

/// Unit of a plan's billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodUnit {
    Day,
    Month,
    Year,
}

impl PeriodUnit {
    /// Parses a stored unit, treating anything unrecognised as a month.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" => PeriodUnit::Day,
            "year" => PeriodUnit::Year,
            _ => PeriodUnit::Month,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodUnit::Day => "day",
            PeriodUnit::Month => "month",
            PeriodUnit::Year => "year",
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("adding {count} {unit}(s) overflows the calendar")]
pub struct RenewalOverflow {
    pub unit: PeriodUnit,
    pub count: u32,
}

/// Adds `count` calendar units to `base`.
///
/// Months and years move along the calendar rather than by fixed durations.
/// When the target month is shorter than the base day, the result clamps to
/// that month's last day (Jan 31 + 1 month = Feb 28 or 29).
pub fn extend(base: Timestamp, unit: PeriodUnit, count: u32) -> Result<Timestamp, RenewalOverflow> {
    let overflow = || RenewalOverflow { unit, count };
    let dt = base.into_datetime();

    let next = match unit {
        PeriodUnit::Day => dt.checked_add_days(Days::new(u64::from(count))),
        PeriodUnit::Month => dt.checked_add_months(Months::new(count)),
        PeriodUnit::Year => count
            .checked_mul(12)
            .and_then(|months| dt.checked_add_months(Months::new(months))),
    };

    next.map(Timestamp::from_datetime).ok_or_else(overflow)
}

/// A plan's billing period: `count` units, count at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub unit: PeriodUnit,
    pub count: u32,
}

impl BillingPeriod {
    pub fn new(unit: PeriodUnit, count: u32) -> Self {
        Self {
            unit,
            count: count.max(1),
        }
    }

    pub fn days(count: u32) -> Self {
        Self::new(PeriodUnit::Day, count)
    }

    pub fn months(count: u32) -> Self {
        Self::new(PeriodUnit::Month, count)
    }

    /// End of one period starting at `base`.
    pub fn extend(&self, base: Timestamp) -> Result<Timestamp, RenewalOverflow> {
        extend(base, self.unit, self.count)
    }
}
