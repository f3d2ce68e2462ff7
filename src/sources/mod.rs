//! Readers for the four input tables
//!
//! Each reader projects the columns it needs, casts them to the expected
//! Arrow types and deserializes rows into domain records. Rows lacking a
//! beneficiary id cannot be attributed to anyone and are skipped.

pub mod assessment;
pub mod claims;
pub mod enrollment;

pub use assessment::load_assessments;
pub use claims::load_claims;
pub use enrollment::load_enrollment;
