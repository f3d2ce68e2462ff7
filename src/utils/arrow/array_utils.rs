//! Utilities for working with Arrow arrays.
//!
//! Columns are looked up by name and cast to the type the caller expects, so
//! input tables may store e.g. dates as `Date64` or years as `Int64`.

use arrow::array::{Array, ArrayRef};
use arrow::compute::kernels::cast::{can_cast_types, cast};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{NhError, Result};

/// Get a column from a record batch, cast to `expected_type`
///
/// # Returns
///
/// * `Ok(Some(ArrayRef))` - The column, converted if necessary
/// * `Ok(None)` - The column is absent and `required` is false
///
/// # Errors
///
/// Returns `ColumnNotFound` for a missing required column and
/// `InvalidDataType` when the column cannot be cast.
pub fn get_column(
    batch: &RecordBatch,
    column_name: &str,
    expected_type: &DataType,
    required: bool,
) -> Result<Option<ArrayRef>> {
    let Ok(idx) = batch.schema().index_of(column_name) else {
        if required {
            return Err(NhError::ColumnNotFound {
                column: column_name.to_string(),
            });
        }
        return Ok(None);
    };

    let column = batch.column(idx);
    let actual_type = column.data_type();
    if actual_type == expected_type {
        return Ok(Some(column.clone()));
    }

    let invalid = || NhError::InvalidDataType {
        column: column_name.to_string(),
        expected: format!("{expected_type:?}"),
    };
    if !can_cast_types(actual_type, expected_type) {
        return Err(invalid());
    }
    debug!("Converting column '{column_name}' from {actual_type:?} to {expected_type:?}");
    cast(column, expected_type).map(Some).map_err(|_| invalid())
}

/// Downcast a column to a specific array type
///
/// # Errors
///
/// Returns `InvalidDataType` if the array is not an `A`.
pub fn downcast_array<'a, A: Array + 'static>(
    array: &'a ArrayRef,
    column_name: &str,
    expected_type_name: &str,
) -> Result<&'a A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| NhError::InvalidDataType {
            column: column_name.to_string(),
            expected: expected_type_name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("year", DataType::Int64, false),
            Field::new("bene_id", DataType::Utf8, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![2015, 2016])),
                Arc::new(StringArray::from(vec!["B1", "B2"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_numeric_column_cast() {
        let column = get_column(&batch(), "year", &DataType::Int32, true).unwrap().unwrap();
        let years = downcast_array::<Int32Array>(&column, "year", "Int32").unwrap();
        assert_eq!(years.value(1), 2016);
    }

    #[test]
    fn test_missing_column() {
        assert!(matches!(
            get_column(&batch(), "death_date", &DataType::Date32, true),
            Err(NhError::ColumnNotFound { .. })
        ));
        assert!(get_column(&batch(), "death_date", &DataType::Date32, false).unwrap().is_none());
    }

    #[test]
    fn test_wrong_downcast() {
        let column = get_column(&batch(), "bene_id", &DataType::Utf8, true).unwrap().unwrap();
        assert!(downcast_array::<Int32Array>(&column, "bene_id", "Int32").is_err());
    }
}
