//! Trait definitions for domain models
//!
//! Every table the pipeline reads back or publishes is a flat row struct
//! with an explicit Arrow schema, so dates always land in `Date32` columns
//! instead of whatever type tracing would guess.

use arrow::datatypes::{FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// A trait for models that can be converted to and from Arrow `RecordBatch`.
pub trait ArrowSchema: Sized + Serialize + DeserializeOwned {
    /// Get the Arrow schema for this model
    fn schema() -> Schema;

    /// Convert a `RecordBatch` to a vector of this model
    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        Ok(serde_arrow::from_record_batch(batch)?)
    }

    /// Convert a slice of this model to a `RecordBatch`
    fn to_record_batch(models: &[Self]) -> Result<RecordBatch> {
        let schema = Self::schema();
        let fields: Vec<FieldRef> = schema.fields().iter().map(std::sync::Arc::clone).collect();
        Ok(serde_arrow::to_record_batch(&fields, &models)?)
    }

    /// Get the schema as Arc<Schema>
    fn schema_ref() -> std::sync::Arc<Schema> {
        std::sync::Arc::new(Self::schema())
    }
}
