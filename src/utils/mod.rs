//! Shared utilities: Arrow column access, Parquet IO and logging helpers

pub mod arrow;
pub mod io;
pub mod logging;
