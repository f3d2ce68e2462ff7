//! Medicare enrollment data
//!
//! The summary file stores one wide row per beneficiary-year with a column per
//! month and indicator. At ingestion it is reshaped into a map keyed by
//! [`YearMonth`], so nothing downstream depends on column names.

use std::collections::BTreeMap;
use std::fmt;

use arrow::datatypes::{DataType, Field, Schema};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::core::ArrowSchema;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Build a month, rejecting months outside 1..=12
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month that follows this one
    #[must_use]
    pub const fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    #[must_use]
    pub fn last_day(self) -> NaiveDate {
        self.succ()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Raw indicator codes for one beneficiary-month
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyCodes {
    /// HMO indicator
    pub ffs: Option<String>,
    /// State buy-in indicator
    pub part_ab: Option<String>,
    /// Part D contract id
    pub part_d: Option<String>,
}

/// Eligibility of one beneficiary-month after applying qualifying code sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthlyStatus {
    pub ffs: bool,
    pub part_ab: bool,
    pub part_d: bool,
}

impl MonthlyStatus {
    /// Composite indicator: enrolled in Parts A, B and D fee-for-service
    #[must_use]
    pub const fn enrolled(self) -> bool {
        self.ffs && self.part_ab && self.part_d
    }
}

/// All enrollment months of one beneficiary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeneficiaryEnrollment {
    pub bene_id: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub months: BTreeMap<YearMonth, MonthlyCodes>,
}

impl BeneficiaryEnrollment {
    #[must_use]
    pub fn new(bene_id: impl Into<String>) -> Self {
        Self {
            bene_id: bene_id.into(),
            ..Self::default()
        }
    }

    /// Merge another year's row for the same beneficiary
    pub fn merge(&mut self, other: Self) {
        self.birth_date = self.birth_date.or(other.birth_date);
        self.death_date = match (self.death_date, other.death_date) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.months.extend(other.months);
    }
}

/// A continuous run of fully-enrolled months
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentEpisode {
    pub bene_id: String,
    /// Sequential across the whole population in beneficiary-run order
    pub episode_id: u32,
    pub enroll_start: NaiveDate,
    pub enroll_end: NaiveDate,
}

impl EnrollmentEpisode {
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.enroll_start <= date && date <= self.enroll_end
    }

    /// Whether `[start, end]` shares at least one day with this episode
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.enroll_start <= end && start <= self.enroll_end
    }

    /// Whether `[start, end]` lies entirely within this episode
    #[must_use]
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.enroll_start <= start && end <= self.enroll_end
    }
}

impl ArrowSchema for EnrollmentEpisode {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("episode_id", DataType::UInt32, false),
            Field::new("enroll_start", DataType::Date32, false),
            Field::new("enroll_end", DataType::Date32, false),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_bounds() {
        let feb = YearMonth::new(2016, 2).unwrap();
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2016, 2, 1).unwrap());
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2016, 2, 29).unwrap());
        assert_eq!(YearMonth::new(2015, 12).unwrap().succ(), YearMonth::new(2016, 1).unwrap());
        assert!(YearMonth::new(2015, 13).is_none());
    }

    #[test]
    fn test_merge_keeps_earliest_death() {
        let mut a = BeneficiaryEnrollment::new("B1");
        a.death_date = NaiveDate::from_ymd_opt(2016, 5, 1);
        let mut b = BeneficiaryEnrollment::new("B1");
        b.death_date = NaiveDate::from_ymd_opt(2016, 4, 1);
        b.months
            .insert(YearMonth::new(2016, 1).unwrap(), MonthlyCodes::default());
        a.merge(b);
        assert_eq!(a.death_date, NaiveDate::from_ymd_opt(2016, 4, 1));
        assert_eq!(a.months.len(), 1);
    }
}
