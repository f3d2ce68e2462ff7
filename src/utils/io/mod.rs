//! IO utilities for file operations

pub mod parquet;

pub use self::parquet::{read_parquet, read_table, write_parquet, write_table};
