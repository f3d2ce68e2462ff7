//! Concurrent loading of the input tables
//!
//! Parquet decoding is blocking work, so each table is read on tokio's
//! blocking pool and the four reads are joined.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::InputPaths;
use crate::error::{NhError, Result};
use crate::models::{AssessmentRecord, BeneficiaryEnrollment, RawClaim};
use crate::sources::{load_assessments, load_claims, load_enrollment};
use crate::utils::logging::log_stage_complete;

/// Raw rows of the four input tables
#[derive(Debug, Clone, Default)]
pub struct InputTables {
    pub assessments: Vec<AssessmentRecord>,
    pub enrollment: Vec<BeneficiaryEnrollment>,
    pub hospital: Vec<RawClaim>,
    pub snf: Vec<RawClaim>,
}

async fn load_blocking<T, F>(path: PathBuf, load: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<T> + Send + 'static,
{
    let task_path = path.clone();
    tokio::task::spawn_blocking(move || load(&task_path))
        .await
        .map_err(|e| NhError::io(path, std::io::Error::other(e)))?
}

/// Load all input tables concurrently
pub async fn load_inputs(paths: &InputPaths) -> Result<InputTables> {
    let start = Instant::now();

    let (assessments, enrollment, hospital, snf) = futures::try_join!(
        load_blocking(paths.assessments.clone(), load_assessments),
        load_blocking(paths.enrollment.clone(), load_enrollment),
        load_blocking(paths.hospital.clone(), load_claims),
        load_blocking(paths.snf.clone(), load_claims),
    )?;

    log_stage_complete(
        "Loaded input tables",
        assessments.len() + enrollment.len() + hospital.len() + snf.len(),
        start.elapsed(),
    );
    Ok(InputTables {
        assessments,
        enrollment,
        hospital,
        snf,
    })
}
