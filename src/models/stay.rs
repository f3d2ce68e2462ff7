//! Hospital and skilled-nursing-facility stays
//!
//! Both are paid as bundles, so drug fills during these stays never reach the
//! Part D claims stream and their days are excluded from observable time.

use std::fmt;

use arrow::datatypes::{DataType, Field, Schema};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::core::ArrowSchema;

/// Which claim table a stay came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StayKind {
    Hospital,
    Snf,
}

impl StayKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Snf => "snf",
        }
    }
}

impl fmt::Display for StayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One claim row as read from a hospital or SNF table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawClaim {
    pub bene_id: String,
    pub claim_id: String,
    pub admission_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
    pub length_of_stay: Option<i32>,
}

/// A cleaned stay with a known discharge date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub bene_id: String,
    pub claim_id: String,
    pub entry_date: NaiveDate,
    pub discharge_date: NaiveDate,
    /// Discharge date was imputed from the length of stay
    pub discharge_missing: bool,
}

impl ArrowSchema for Stay {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, false),
            Field::new("claim_id", DataType::Utf8, false),
            Field::new("entry_date", DataType::Date32, false),
            Field::new("discharge_date", DataType::Date32, false),
            Field::new("discharge_missing", DataType::Boolean, false),
        ])
    }
}
