//! Column extraction for Arrow record batches
//!
//! Each extractor returns one value per row, `None` for nulls, empty strings
//! and absent optional columns.

use arrow::array::{Array, Date32Array, Int32Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::Result;
use crate::utils::arrow::array_utils::{downcast_array, get_column};

/// Extract a string column
pub fn extract_strings(
    batch: &RecordBatch,
    column_name: &str,
    required: bool,
) -> Result<Vec<Option<String>>> {
    let Some(array) = get_column(batch, column_name, &DataType::Utf8, required)? else {
        return Ok(vec![None; batch.num_rows()]);
    };
    let strings = downcast_array::<StringArray>(&array, column_name, "String")?;
    Ok((0..strings.len())
        .map(|row| {
            if strings.is_null(row) {
                return None;
            }
            let value = strings.value(row).trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect())
}

/// Extract a date column as `NaiveDate`s
pub fn extract_dates(
    batch: &RecordBatch,
    column_name: &str,
    required: bool,
) -> Result<Vec<Option<NaiveDate>>> {
    let Some(array) = get_column(batch, column_name, &DataType::Date32, required)? else {
        return Ok(vec![None; batch.num_rows()]);
    };
    let dates = downcast_array::<Date32Array>(&array, column_name, "Date32")?;
    Ok((0..dates.len())
        .map(|row| {
            if dates.is_null(row) {
                None
            } else {
                dates.value_as_date(row)
            }
        })
        .collect())
}

/// Extract an integer column
pub fn extract_i32s(
    batch: &RecordBatch,
    column_name: &str,
    required: bool,
) -> Result<Vec<Option<i32>>> {
    let Some(array) = get_column(batch, column_name, &DataType::Int32, required)? else {
        return Ok(vec![None; batch.num_rows()]);
    };
    let ints = downcast_array::<Int32Array>(&array, column_name, "Int32")?;
    Ok((0..ints.len())
        .map(|row| (!ints.is_null(row)).then(|| ints.value(row)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_blank_strings_are_missing() {
        let schema = Schema::new(vec![Field::new("facility_id", DataType::Utf8, true)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec![Some("F1"), Some("  "), None]))],
        )
        .unwrap();
        let values = extract_strings(&batch, "facility_id", true).unwrap();
        assert_eq!(values, vec![Some("F1".to_string()), None, None]);
    }

    #[test]
    fn test_dates_from_epoch_days() {
        let schema = Schema::new(vec![Field::new("entry_date", DataType::Date32, true)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Date32Array::from(vec![Some(16436), None]))],
        )
        .unwrap();
        let values = extract_dates(&batch, "entry_date", true).unwrap();
        assert_eq!(values, vec![NaiveDate::from_ymd_opt(2015, 1, 1), None]);
    }

    #[test]
    fn test_absent_optional_column() {
        let schema = Schema::new(vec![Field::new("bene_id", DataType::Utf8, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec!["B1"]))],
        )
        .unwrap();
        assert_eq!(extract_i32s(&batch, "length_of_stay", false).unwrap(), vec![None]);
    }
}
