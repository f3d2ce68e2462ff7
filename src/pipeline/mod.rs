//! Run orchestration
//!
//! A run has three stages, each callable on its own so that an operator can
//! rerun a single failed partition:
//!
//! 1. [`prepare`] loads the inputs, builds and classifies episodes and
//!    writes staging tables to the run's work directory.
//! 2. Workers run the day-level engine per partition, either all at once on
//!    the in-process pool ([`run`]) or one at a time ([`run_single_worker`]).
//! 3. [`aggregate`] collects worker artifacts and publishes the final tables.

pub mod aggregate;
pub mod loader;
pub mod pool;
pub mod staging;
pub mod worker;

use std::time::Instant;

use crate::config::StudyConfig;
use crate::error::Result;
use crate::models::AnchorPolicy;

pub use aggregate::{PolicyReport, RunReport, aggregate};
pub use loader::{InputTables, load_inputs};
pub use pool::run_pool;
pub use staging::{StagedTables, StagingManifest, clear_worker_outputs, staged_config};
pub use worker::{WorkerStatus, run_worker};

/// Load, build and classify, then write the staging tables
///
/// Worker outputs left by an earlier staging of the same run are removed
/// first, and the partition count is recorded for later stages.
pub async fn prepare(config: &StudyConfig) -> Result<StagedTables> {
    let inputs = load_inputs(&config.inputs).await?;
    let staged = StagedTables::build(inputs, config);
    let work_dir = config.work_dir();
    clear_worker_outputs(&work_dir, &config.run_id)?;
    staged.write(&work_dir)?;
    StagingManifest::new(config).write(&work_dir)?;
    Ok(staged)
}

/// Run one partition of one policy from the staging tables
///
/// The partition count is the one recorded by [`prepare`].
pub fn run_single_worker(
    config: &StudyConfig,
    policy: AnchorPolicy,
    partition_index: usize,
) -> Result<WorkerStatus> {
    let config = staged_config(config)?;
    let staged = StagedTables::read(&config.work_dir())?;
    let work = staged.day_level_work(policy);
    Ok(run_worker(&config.worker(policy, partition_index), &work, &staged))
}

/// Full pipeline: prepare, run every worker of both policies, aggregate
pub async fn run(config: &StudyConfig) -> Result<RunReport> {
    let start = Instant::now();
    log::info!("Starting run {}", config.run_id);

    let staged = prepare(config).await?;
    for policy in AnchorPolicy::ALL {
        run_pool(config, policy, &staged)?;
    }
    let report = aggregate(config)?;

    log::info!("Finished run {} in {:?}", config.run_id, start.elapsed());
    Ok(report)
}
