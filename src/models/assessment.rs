//! Nursing-home assessment records
//!
//! Raw observations from the assessment table. Entry, discharge and
//! admission records are split apart by [`RecordType`] before pairing.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of an assessment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    Entry,
    DischargeNoReturn,
    DischargeReturnAnticipated,
    DeathInFacility,
    Admission,
    Other,
}

impl RecordType {
    /// Parse the `record_type` code of the assessment table
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "01" | "1" => Self::Entry,
            "10" => Self::DischargeNoReturn,
            "11" => Self::DischargeReturnAnticipated,
            "12" => Self::DeathInFacility,
            "AD" | "ad" => Self::Admission,
            _ => Self::Other,
        }
    }

    /// Discharge type for discharge records
    #[must_use]
    pub const fn discharge_type(self) -> Option<DischargeType> {
        match self {
            Self::DischargeNoReturn => Some(DischargeType::ReturnNotAnticipated),
            Self::DischargeReturnAnticipated => Some(DischargeType::ReturnAnticipated),
            Self::DeathInFacility => Some(DischargeType::Death),
            _ => None,
        }
    }
}

/// How a stay ended, as reported on the discharge record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DischargeType {
    ReturnNotAnticipated,
    ReturnAnticipated,
    Death,
}

impl DischargeType {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ReturnNotAnticipated => "10",
            Self::ReturnAnticipated => "11",
            Self::Death => "12",
        }
    }

    /// Return-anticipated status implied by this discharge
    #[must_use]
    pub const fn return_anticipated(self) -> ReturnAnticipated {
        match self {
            Self::ReturnAnticipated => ReturnAnticipated::Anticipated,
            Self::ReturnNotAnticipated | Self::Death => ReturnAnticipated::NotAnticipated,
        }
    }
}

impl From<DischargeType> for String {
    fn from(value: DischargeType) -> Self {
        value.code().to_string()
    }
}

impl TryFrom<String> for DischargeType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RecordType::from_code(&value)
            .discharge_type()
            .ok_or_else(|| format!("unknown discharge type code {value:?}"))
    }
}

/// Whether a return to the facility was anticipated at discharge
///
/// The ordering is the tie-break priority: a not-anticipated discharge wins
/// over an anticipated one, and a missing discharge sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ReturnAnticipated {
    /// Return not anticipated, or the resident died in the facility
    NotAnticipated = 0,
    Anticipated = 1,
    /// No discharge record was found for the entry
    NoDischarge = 2,
}

impl From<ReturnAnticipated> for u8 {
    fn from(value: ReturnAnticipated) -> Self {
        value as Self
    }
}

impl TryFrom<u8> for ReturnAnticipated {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotAnticipated),
            1 => Ok(Self::Anticipated),
            2 => Ok(Self::NoDischarge),
            other => Err(format!("unknown return-anticipated code {other}")),
        }
    }
}

impl fmt::Display for ReturnAnticipated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotAnticipated => "not anticipated",
            Self::Anticipated => "anticipated",
            Self::NoDischarge => "no discharge",
        };
        f.write_str(label)
    }
}

/// One row of the assessment table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssessmentRecord {
    pub bene_id: String,
    pub facility_id: Option<String>,
    pub record_type: RecordType,
    /// Entry date of the stay this record belongs to
    pub entry_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
    pub assessment_date: Option<NaiveDate>,
    pub reporting_code: Option<String>,
}

impl AssessmentRecord {
    #[must_use]
    pub fn new(bene_id: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            bene_id: bene_id.into(),
            facility_id: None,
            record_type,
            entry_date: None,
            discharge_date: None,
            assessment_date: None,
            reporting_code: None,
        }
    }

    #[must_use]
    pub fn with_facility(mut self, facility_id: impl Into<String>) -> Self {
        self.facility_id = Some(facility_id.into());
        self
    }

    #[must_use]
    pub const fn with_entry(mut self, date: NaiveDate) -> Self {
        self.entry_date = Some(date);
        self
    }

    #[must_use]
    pub const fn with_discharge(mut self, date: NaiveDate) -> Self {
        self.discharge_date = Some(date);
        self
    }

    #[must_use]
    pub const fn with_assessment(mut self, date: NaiveDate) -> Self {
        self.assessment_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_reporting_code(mut self, code: impl Into<String>) -> Self {
        self.reporting_code = Some(code.into());
        self
    }
}
