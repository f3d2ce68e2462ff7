//! Assessment table reader

use std::path::Path;

use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::Result;
use crate::models::{AssessmentRecord, RecordType};
use crate::utils::arrow::{extract_dates, extract_strings};
use crate::utils::io::read_parquet;

/// Columns read from the assessment table
#[must_use]
pub fn create_assessment_schema() -> Schema {
    Schema::new(vec![
        Field::new("bene_id", DataType::Utf8, false),
        Field::new("facility_id", DataType::Utf8, true),
        Field::new("record_type", DataType::Utf8, true),
        Field::new("entry_date", DataType::Date32, true),
        Field::new("discharge_date", DataType::Date32, true),
        Field::new("assessment_date", DataType::Date32, true),
        Field::new("reporting_code", DataType::Utf8, true),
    ])
}

/// Deserialize an assessment record batch
///
/// Rows without a beneficiary id are skipped.
pub fn deserialize_batch(batch: &RecordBatch) -> Result<Vec<AssessmentRecord>> {
    let bene_ids = extract_strings(batch, "bene_id", true)?;
    let facility_ids = extract_strings(batch, "facility_id", false)?;
    let record_types = extract_strings(batch, "record_type", true)?;
    let entry_dates = extract_dates(batch, "entry_date", true)?;
    let discharge_dates = extract_dates(batch, "discharge_date", false)?;
    let assessment_dates = extract_dates(batch, "assessment_date", false)?;
    let reporting_codes = extract_strings(batch, "reporting_code", false)?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let Some(bene_id) = bene_ids[row].clone() else {
            continue;
        };
        let record_type = record_types[row]
            .as_deref()
            .map_or(RecordType::Other, RecordType::from_code);
        records.push(AssessmentRecord {
            bene_id,
            facility_id: facility_ids[row].clone(),
            record_type,
            entry_date: entry_dates[row],
            discharge_date: discharge_dates[row],
            assessment_date: assessment_dates[row],
            reporting_code: reporting_codes[row].clone(),
        });
    }

    let skipped = batch.num_rows() - records.len();
    if skipped > 0 {
        debug!("Skipped {skipped} assessment rows without a beneficiary id");
    }
    Ok(records)
}

/// Load every assessment record from a parquet file
pub fn load_assessments(path: &Path) -> Result<Vec<AssessmentRecord>> {
    let mut records = Vec::new();
    for batch in read_parquet(path, Some(&create_assessment_schema()))? {
        records.extend(deserialize_batch(&batch)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, StringArray};
    use chrono::NaiveDate;
    use std::sync::Arc;

    #[test]
    fn test_deserialize_assessments() {
        let schema = Schema::new(vec![
            Field::new("bene_id", DataType::Utf8, true),
            Field::new("facility_id", DataType::Utf8, true),
            Field::new("record_type", DataType::Utf8, true),
            Field::new("entry_date", DataType::Date32, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec![Some("B1"), None, Some("B2")])),
                Arc::new(StringArray::from(vec![Some("F1"), Some("F1"), None])),
                Arc::new(StringArray::from(vec![Some("01"), Some("01"), Some("11")])),
                Arc::new(Date32Array::from(vec![Some(16436), Some(16436), None])),
            ],
        )
        .unwrap();

        let records = deserialize_batch(&batch).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type, RecordType::Entry);
        assert_eq!(records[0].entry_date, NaiveDate::from_ymd_opt(2015, 1, 1));
        assert_eq!(records[1].record_type, RecordType::DischargeReturnAnticipated);
        assert_eq!(records[1].facility_id, None);
        assert_eq!(records[1].discharge_date, None);
    }
}
