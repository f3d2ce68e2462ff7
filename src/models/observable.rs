//! Drug-observable time
//!
//! A day is drug-observable when the beneficiary is in a nursing home,
//! enrolled in Parts A, B and D fee-for-service, and in neither a hospital
//! nor a SNF stay.

use arrow::datatypes::{DataType, Field, Schema};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::assessment::{DischargeType, ReturnAnticipated};
use crate::models::core::ArrowSchema;
use crate::models::episode::{EnrollCategory, NhEpisode};

/// One NH day joined against the enrollment, hospital and SNF timelines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRecord<'a> {
    pub bene_id: &'a str,
    pub nh_episode_id: u32,
    pub day: NaiveDate,
    pub enroll_day: bool,
    pub hosp_day: bool,
    pub snf_day: bool,
}

impl DayRecord<'_> {
    #[must_use]
    pub const fn is_observable(&self) -> bool {
        self.enroll_day && !self.hosp_day && !self.snf_day
    }
}

/// A contiguous run of drug-observable days within one NH episode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrugObservableEpisode {
    pub bene_id: String,
    pub nh_episode_id: u32,
    pub nh_entry_date: NaiveDate,
    pub nh_discharge_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub enroll_start: Option<NaiveDate>,
    pub enroll_end: Option<NaiveDate>,
    pub enroll_category: EnrollCategory,
    pub discharge_type: Option<DischargeType>,
    pub return_anticipated: ReturnAnticipated,
    pub no_discharge: bool,
    pub death_error: bool,
}

impl DrugObservableEpisode {
    /// Start a row for `episode` covering `[start_date, end_date]`
    #[must_use]
    pub fn for_episode(
        episode: &NhEpisode,
        category: EnrollCategory,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            bene_id: episode.bene_id.clone(),
            nh_episode_id: episode.episode_id,
            nh_entry_date: episode.entry_date,
            nh_discharge_date: episode.discharge_date,
            start_date,
            end_date,
            enroll_start: None,
            enroll_end: None,
            enroll_category: category,
            discharge_type: episode.discharge_type,
            return_anticipated: episode.return_anticipated,
            no_discharge: episode.no_discharge,
            death_error: episode.death_error,
        }
    }

    #[must_use]
    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Sort key of the aggregated table
    #[must_use]
    pub fn sort_key(&self) -> (&str, u32, NaiveDate) {
        (&self.bene_id, self.nh_episode_id, self.start_date)
    }
}

impl ArrowSchema for DrugObservableEpisode {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("nh_episode_id", DataType::UInt32, false),
            Field::new("nh_entry_date", DataType::Date32, false),
            Field::new("nh_discharge_date", DataType::Date32, false),
            Field::new("start_date", DataType::Date32, false),
            Field::new("end_date", DataType::Date32, false),
            Field::new("enroll_start", DataType::Date32, true),
            Field::new("enroll_end", DataType::Date32, true),
            Field::new("enroll_category", DataType::Utf8, false),
            Field::new("discharge_type", DataType::Utf8, true),
            Field::new("return_anticipated", DataType::UInt8, false),
            Field::new("no_discharge", DataType::Boolean, false),
            Field::new("death_error", DataType::Boolean, false),
        ])
    }
}

/// Published drug-observable row, keyed by the NH entry date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedObservableEpisode {
    pub bene_id: String,
    pub nh_entry_date: NaiveDate,
    pub nh_discharge_date: NaiveDate,
    pub observable_start: NaiveDate,
    pub observable_end: NaiveDate,
    pub enroll_start: Option<NaiveDate>,
    pub enroll_end: Option<NaiveDate>,
    pub enroll_category: EnrollCategory,
    pub discharge_type: Option<DischargeType>,
    pub return_anticipated: ReturnAnticipated,
    pub no_discharge: bool,
    pub death_error: bool,
}

impl From<&DrugObservableEpisode> for PublishedObservableEpisode {
    fn from(row: &DrugObservableEpisode) -> Self {
        Self {
            bene_id: row.bene_id.clone(),
            nh_entry_date: row.nh_entry_date,
            nh_discharge_date: row.nh_discharge_date,
            observable_start: row.start_date,
            observable_end: row.end_date,
            enroll_start: row.enroll_start,
            enroll_end: row.enroll_end,
            enroll_category: row.enroll_category,
            discharge_type: row.discharge_type,
            return_anticipated: row.return_anticipated,
            no_discharge: row.no_discharge,
            death_error: row.death_error,
        }
    }
}

impl ArrowSchema for PublishedObservableEpisode {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("nh_entry_date", DataType::Date32, false),
            Field::new("nh_discharge_date", DataType::Date32, false),
            Field::new("observable_start", DataType::Date32, false),
            Field::new("observable_end", DataType::Date32, false),
            Field::new("enroll_start", DataType::Date32, true),
            Field::new("enroll_end", DataType::Date32, true),
            Field::new("enroll_category", DataType::Utf8, false),
            Field::new("discharge_type", DataType::Utf8, true),
            Field::new("return_anticipated", DataType::UInt8, false),
            Field::new("no_discharge", DataType::Boolean, false),
            Field::new("death_error", DataType::Boolean, false),
        ])
    }
}
