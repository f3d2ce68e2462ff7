//! Nursing-home residency episodes
//!
//! An [`EdPair`] is one matched entry/discharge stay at one facility. Pairs are
//! collapsed into [`NhEpisode`]s, once per [`AnchorPolicy`].

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::{DataType, Field, Schema};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::assessment::{DischargeType, ReturnAnticipated};
use crate::models::core::ArrowSchema;

/// How the start of an NH episode is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPolicy {
    /// Bounded by an entry record and the first subsequent discharge
    Entry,
    /// Bounded by a qualifying admission assessment and a final discharge
    Admission,
}

impl AnchorPolicy {
    pub const ALL: [Self; 2] = [Self::Entry, Self::Admission];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Admission => "admission",
        }
    }
}

impl fmt::Display for AnchorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnchorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" => Ok(Self::Entry),
            "admission" => Ok(Self::Admission),
            other => Err(format!("unknown anchoring policy {other:?}")),
        }
    }
}

/// Relation of an NH episode to the beneficiary's enrollment episodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EnrollCategory {
    NoEnrollment,
    FullEnrollment,
    PartialEnrollment,
}

impl EnrollCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoEnrollment => "none",
            Self::FullEnrollment => "full",
            Self::PartialEnrollment => "partial",
        }
    }

    /// Whether the day-level engine has work to do for this category
    #[must_use]
    pub const fn needs_day_level(self) -> bool {
        !matches!(self, Self::NoEnrollment)
    }
}

impl From<EnrollCategory> for String {
    fn from(value: EnrollCategory) -> Self {
        value.as_str().to_string()
    }
}

impl TryFrom<String> for EnrollCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "none" => Ok(Self::NoEnrollment),
            "full" => Ok(Self::FullEnrollment),
            "partial" => Ok(Self::PartialEnrollment),
            other => Err(format!("unknown enrollment category {other:?}")),
        }
    }
}

/// A matched entry/discharge stay at one facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdPair {
    pub bene_id: String,
    pub facility_id: String,
    pub entry_date: NaiveDate,
    pub discharge_date: NaiveDate,
    pub discharge_type: Option<DischargeType>,
    pub return_anticipated: ReturnAnticipated,
    pub no_discharge: bool,
    /// Earliest qualifying admission assessment of this stay
    pub admission_date: Option<NaiveDate>,
}

/// One continuous span of nursing-home residency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NhEpisode {
    pub bene_id: String,
    /// Sequential per beneficiary, starting at 1
    pub episode_id: u32,
    pub entry_date: NaiveDate,
    pub discharge_date: NaiveDate,
    pub discharge_type: Option<DischargeType>,
    pub return_anticipated: ReturnAnticipated,
    pub no_discharge: bool,
    pub death_error: bool,
    pub death_date: Option<NaiveDate>,
    /// Earliest admission assessment among the episode's stays
    pub admission_date: Option<NaiveDate>,
    /// Entry date of the stay carrying `admission_date`
    pub admission_entry_date: Option<NaiveDate>,
    pub enroll_category: Option<EnrollCategory>,
}

impl NhEpisode {
    /// Number of calendar days covered, both ends included
    #[must_use]
    pub fn day_count(&self) -> i64 {
        (self.discharge_date - self.entry_date).num_days() + 1
    }

    #[must_use]
    pub fn is_zero_length(&self) -> bool {
        self.entry_date == self.discharge_date
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.entry_date <= date && date <= self.discharge_date
    }

    /// Whether the episode ended by death on the recorded date of death
    #[must_use]
    pub fn death_match(&self) -> bool {
        self.death_date.is_some_and(|death| {
            death == self.discharge_date
                && (self.death_error || self.discharge_type == Some(DischargeType::Death))
        })
    }
}

impl ArrowSchema for NhEpisode {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("episode_id", DataType::UInt32, false),
            Field::new("entry_date", DataType::Date32, false),
            Field::new("discharge_date", DataType::Date32, false),
            Field::new("discharge_type", DataType::Utf8, true),
            Field::new("return_anticipated", DataType::UInt8, false),
            Field::new("no_discharge", DataType::Boolean, false),
            Field::new("death_error", DataType::Boolean, false),
            Field::new("death_date", DataType::Date32, true),
            Field::new("admission_date", DataType::Date32, true),
            Field::new("admission_entry_date", DataType::Date32, true),
            Field::new("enroll_category", DataType::Utf8, true),
        ])
    }
}

/// Published NH episode row; the internal episode id is dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedNhEpisode {
    pub bene_id: String,
    pub entry_date: NaiveDate,
    pub discharge_date: NaiveDate,
    pub discharge_type: Option<DischargeType>,
    pub return_anticipated: ReturnAnticipated,
    pub no_discharge: bool,
    pub death_error: bool,
    pub death_date: Option<NaiveDate>,
    pub death_match: bool,
    pub enroll_category: Option<EnrollCategory>,
}

impl From<&NhEpisode> for PublishedNhEpisode {
    fn from(episode: &NhEpisode) -> Self {
        Self {
            bene_id: episode.bene_id.clone(),
            entry_date: episode.entry_date,
            discharge_date: episode.discharge_date,
            discharge_type: episode.discharge_type,
            return_anticipated: episode.return_anticipated,
            no_discharge: episode.no_discharge,
            death_error: episode.death_error,
            death_date: episode.death_date,
            death_match: episode.death_match(),
            enroll_category: episode.enroll_category,
        }
    }
}

impl ArrowSchema for PublishedNhEpisode {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("entry_date", DataType::Date32, false),
            Field::new("discharge_date", DataType::Date32, false),
            Field::new("discharge_type", DataType::Utf8, true),
            Field::new("return_anticipated", DataType::UInt8, false),
            Field::new("no_discharge", DataType::Boolean, false),
            Field::new("death_error", DataType::Boolean, false),
            Field::new("death_date", DataType::Date32, true),
            Field::new("death_match", DataType::Boolean, false),
            Field::new("enroll_category", DataType::Utf8, true),
        ])
    }
}
