//! Enrollment summary reader
//!
//! The summary file has one wide row per beneficiary-year with a column per
//! month for each indicator. Rows are reshaped here into
//! [`BeneficiaryEnrollment`] month maps and merged across years.

use std::path::Path;

use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::models::{BeneficiaryEnrollment, MonthlyCodes, YearMonth};
use crate::utils::arrow::{extract_dates, extract_i32s, extract_strings};
use crate::utils::io::read_parquet;

/// Column prefix of the monthly HMO indicator
pub const HMO_PREFIX: &str = "hmo_ind";
/// Column prefix of the monthly state buy-in indicator
pub const BUYIN_PREFIX: &str = "buyin_ind";
/// Column prefix of the monthly Part D contract id
pub const PART_D_PREFIX: &str = "ptd_cntrct";

/// Name of the monthly column for `prefix` and `month` (1-based)
#[must_use]
pub fn month_column(prefix: &str, month: u32) -> String {
    format!("{prefix}_{month:02}")
}

/// Columns read from the enrollment summary
#[must_use]
pub fn create_enrollment_schema() -> Schema {
    let mut fields = vec![
        Field::new("bene_id", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
        Field::new("birth_date", DataType::Date32, true),
        Field::new("death_date", DataType::Date32, true),
    ];
    for prefix in [HMO_PREFIX, BUYIN_PREFIX, PART_D_PREFIX] {
        fields.extend((1..=12).map(|m| Field::new(month_column(prefix, m), DataType::Utf8, true)));
    }
    Schema::new(fields)
}

/// Monthly code columns of one batch, indexed `[month - 1][row]`
struct MonthColumns {
    hmo: Vec<Vec<Option<String>>>,
    buyin: Vec<Vec<Option<String>>>,
    part_d: Vec<Vec<Option<String>>>,
}

impl MonthColumns {
    fn extract(batch: &RecordBatch) -> Result<Self> {
        let read = |prefix: &str| -> Result<Vec<Vec<Option<String>>>> {
            (1..=12)
                .map(|m| extract_strings(batch, &month_column(prefix, m), true))
                .collect()
        };
        Ok(Self {
            hmo: read(HMO_PREFIX)?,
            buyin: read(BUYIN_PREFIX)?,
            part_d: read(PART_D_PREFIX)?,
        })
    }

    fn codes(&self, month_index: usize, row: usize) -> MonthlyCodes {
        MonthlyCodes {
            ffs: self.hmo[month_index][row].clone(),
            part_ab: self.buyin[month_index][row].clone(),
            part_d: self.part_d[month_index][row].clone(),
        }
    }
}

/// Deserialize one batch into per-row beneficiary-years
///
/// Rows without a beneficiary id or year are skipped.
pub fn deserialize_batch(batch: &RecordBatch) -> Result<Vec<BeneficiaryEnrollment>> {
    let bene_ids = extract_strings(batch, "bene_id", true)?;
    let years = extract_i32s(batch, "year", true)?;
    let birth_dates = extract_dates(batch, "birth_date", false)?;
    let death_dates = extract_dates(batch, "death_date", false)?;
    let months = MonthColumns::extract(batch)?;

    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let (Some(bene_id), Some(year)) = (&bene_ids[row], years[row]) else {
            continue;
        };
        let mut enrollment = BeneficiaryEnrollment::new(bene_id.clone());
        enrollment.birth_date = birth_dates[row];
        enrollment.death_date = death_dates[row];
        for (index, month) in (1..=12u32).enumerate() {
            if let Some(key) = YearMonth::new(year, month) {
                enrollment.months.insert(key, months.codes(index, row));
            }
        }
        rows.push(enrollment);
    }
    Ok(rows)
}

/// Merge beneficiary-year rows into one record per beneficiary, sorted by id
#[must_use]
pub fn merge_years(rows: Vec<BeneficiaryEnrollment>) -> Vec<BeneficiaryEnrollment> {
    let mut by_bene: FxHashMap<String, BeneficiaryEnrollment> = FxHashMap::default();
    for row in rows {
        match by_bene.get_mut(&row.bene_id) {
            Some(existing) => existing.merge(row),
            None => {
                by_bene.insert(row.bene_id.clone(), row);
            }
        }
    }
    let mut merged: Vec<_> = by_bene.into_values().collect();
    merged.sort_by(|a, b| a.bene_id.cmp(&b.bene_id));
    merged
}

/// Load and reshape the enrollment summary
pub fn load_enrollment(path: &Path) -> Result<Vec<BeneficiaryEnrollment>> {
    let mut rows = Vec::new();
    for batch in read_parquet(path, Some(&create_enrollment_schema()))? {
        rows.extend(deserialize_batch(&batch)?);
    }
    let row_count = rows.len();
    let merged = merge_years(rows);
    debug!(
        "Reshaped {row_count} beneficiary-year rows into {} beneficiaries",
        merged.len()
    );
    Ok(merged)
}
