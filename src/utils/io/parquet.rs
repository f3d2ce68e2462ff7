//! Parquet file operations
//!
//! Reading input tables into Arrow record batches and writing row structs
//! back out through their [`ArrowSchema`].

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{NhError, Result};
use crate::models::ArrowSchema;
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> usize {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&size| size > 0)
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Projection mask selecting the columns of `schema` present in the file
///
/// Returns `None` when no column matches, in which case all columns are read.
#[must_use]
pub fn create_projection(
    schema: &Schema,
    file_schema: &Schema,
    parquet_schema: &parquet::schema::types::SchemaDescriptor,
) -> Option<ProjectionMask> {
    let projection = schema
        .fields()
        .iter()
        .filter_map(|f| file_schema.index_of(f.name()).ok())
        .collect_vec();

    if projection.is_empty() {
        log_warning("No matching fields found in schema projection, reading all columns", None);
        None
    } else {
        Some(ProjectionMask::roots(parquet_schema, projection))
    }
}

/// Read a parquet file into Arrow record batches
///
/// With `schema`, only the columns it names are read.
pub fn read_parquet(path: &Path, schema: Option<&Schema>) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = File::open(path).map_err(|e| NhError::io(path, e))?;
    let mut builder =
        ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(get_batch_size());

    if let Some(schema) = schema {
        if let Some(mask) = create_projection(schema, builder.schema(), builder.parquet_schema()) {
            builder = builder.with_projection(mask);
        }
    }

    let batches = builder.build()?.collect::<std::result::Result<Vec<_>, _>>()?;

    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    log_operation_complete("read", path, rows, Some(start.elapsed()));
    Ok(batches)
}

/// Write record batches to a parquet file, replacing any existing file
pub fn write_parquet(path: &Path, schema: &Schema, batches: &[RecordBatch]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| NhError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| NhError::io(path, e))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, std::sync::Arc::new(schema.clone()), Some(props))?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

/// Read a table written by [`write_table`]
pub fn read_table<T: ArrowSchema>(path: &Path) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    for batch in read_parquet(path, Some(&T::schema()))? {
        rows.extend(T::from_record_batch(&batch)?);
    }
    Ok(rows)
}

/// Write rows as a single-batch parquet table
pub fn write_table<T: ArrowSchema>(path: &Path, rows: &[T]) -> Result<()> {
    let start = Instant::now();
    let batch = T::to_record_batch(rows)?;
    write_parquet(path, &T::schema(), &[batch])?;
    log_operation_complete("wrote", path, rows.len(), Some(start.elapsed()));
    Ok(())
}
