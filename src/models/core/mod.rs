//! Core traits shared by the table models

pub mod traits;

pub use traits::ArrowSchema;
