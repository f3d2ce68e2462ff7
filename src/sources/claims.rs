//! Hospital and SNF claim readers

use std::path::Path;

use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::models::RawClaim;
use crate::utils::arrow::{extract_dates, extract_i32s, extract_strings};
use crate::utils::io::read_parquet;

/// Columns read from a claim table
#[must_use]
pub fn create_claim_schema() -> Schema {
    Schema::new(vec![
        Field::new("bene_id", DataType::Utf8, false),
        Field::new("claim_id", DataType::Utf8, true),
        Field::new("admission_date", DataType::Date32, true),
        Field::new("discharge_date", DataType::Date32, true),
        Field::new("length_of_stay", DataType::Int32, true),
    ])
}

/// Deserialize a claim record batch
///
/// Rows without a beneficiary id are skipped; a missing claim id becomes
/// the empty string.
pub fn deserialize_batch(batch: &RecordBatch) -> Result<Vec<RawClaim>> {
    let bene_ids = extract_strings(batch, "bene_id", true)?;
    let claim_ids = extract_strings(batch, "claim_id", false)?;
    let admission_dates = extract_dates(batch, "admission_date", true)?;
    let discharge_dates = extract_dates(batch, "discharge_date", false)?;
    let lengths = extract_i32s(batch, "length_of_stay", false)?;

    Ok((0..batch.num_rows())
        .filter_map(|row| {
            Some(RawClaim {
                bene_id: bene_ids[row].clone()?,
                claim_id: claim_ids[row].clone().unwrap_or_default(),
                admission_date: admission_dates[row],
                discharge_date: discharge_dates[row],
                length_of_stay: lengths[row],
            })
        })
        .collect())
}

/// Load every claim from a parquet file
pub fn load_claims(path: &Path) -> Result<Vec<RawClaim>> {
    let mut claims = Vec::new();
    for batch in read_parquet(path, Some(&create_claim_schema()))? {
        claims.extend(deserialize_batch(&batch)?);
    }
    Ok(claims)
}
